//! Integration tests for the Greenmarket client.
//!
//! Every test runs the real `ApiClient` and `CartSync` against a `wiremock`
//! mock of the backend, so the full HTTP + JSON path is exercised without a
//! live server.
//!
//! # Test Categories
//!
//! - `api_client` - Wire format, auth header, and error mapping tests
//! - `cart_sync` - Synchronizer state machine and ordering tests
//! - `session_flow` - Login/logout lifecycle across simulated page loads

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use url::Url;
use wiremock::MockServer;

use greenmarket_client::api::ApiClient;
use greenmarket_client::config::ApiConfig;
use greenmarket_client::session::MemoryTokenStore;
use greenmarket_client::sync::CartSync;
use greenmarket_core::SessionToken;

/// Shared fixture: a mock backend plus a client and synchronizer wired to it.
pub struct TestContext {
    pub server: MockServer,
    pub api: ApiClient,
    pub tokens: Arc<MemoryTokenStore>,
    pub sync: CartSync,
}

impl TestContext {
    /// Start a mock backend and a synchronizer pointed at it.
    ///
    /// # Panics
    ///
    /// Panics on setup failure; these are test fixtures.
    pub async fn new() -> Self {
        init_tracing();

        let server = MockServer::start().await;
        let config = ApiConfig::new(Url::parse(&server.uri()).expect("mock server uri is valid"));
        let api = ApiClient::new(&config).expect("client builds");
        let tokens = Arc::new(MemoryTokenStore::new());
        let sync = CartSync::new(api.clone(), tokens.clone());

        Self {
            server,
            api,
            tokens,
            sync,
        }
    }

    /// Put a token in the store, as the login screen would after success.
    ///
    /// # Panics
    ///
    /// Panics if the token is empty or the store write fails.
    pub fn log_in(&self, raw: &str) {
        use greenmarket_client::session::TokenStore as _;
        self.tokens
            .set(&SessionToken::new(raw).expect("non-empty token"))
            .expect("memory store never fails");
    }
}

/// One cart line in the backend's wire format.
#[must_use]
pub fn cart_line_json(
    id: i32,
    product_id: i32,
    quantity: u32,
    price: i64,
) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "product_id": product_id,
        "username": "alice",
        "name": format!("product-{product_id}"),
        "price": price,
        "image": format!("/images/{product_id}.jpg"),
        "quantity": quantity,
    })
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    // Repeated calls from parallel tests are expected to fail; ignore them.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
