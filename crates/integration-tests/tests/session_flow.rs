//! Login/logout lifecycle across simulated page loads, with the token held in
//! a file-backed store so it survives "reloads" (fresh synchronizer
//! instances over the same storage).

use std::path::PathBuf;
use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use greenmarket_client::session::{FileTokenStore, TokenStore};
use greenmarket_client::sync::{CartSync, Phase};
use greenmarket_core::ProductId;
use greenmarket_integration_tests::{TestContext, cart_line_json};

fn temp_token_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "greenmarket-session-{name}-{}.json",
        std::process::id()
    ))
}

#[tokio::test]
async fn login_refresh_reload_logout_lifecycle() {
    let ctx = TestContext::new().await;
    let token_path = temp_token_path("lifecycle");

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "jwt-abc",
        })))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([cart_line_json(1, 7, 2, 100)])),
        )
        .mount(&ctx.server)
        .await;

    // First page load: anonymous.
    let tokens = Arc::new(FileTokenStore::new(&token_path));
    tokens.clear();
    let sync = CartSync::new(ctx.api.clone(), tokens.clone());
    sync.init().await;
    assert_eq!(sync.phase(), Phase::Anonymous);

    // Login screen: authenticate, store the token, then refresh.
    let token = ctx
        .api
        .login("alice@example.com", "hunter2")
        .await
        .expect("login succeeds");
    tokens.set(&token).expect("token persists");
    sync.refresh().await;
    assert_eq!(sync.phase(), Phase::Ready);
    assert_eq!(sync.cart().quantity_of(ProductId::new(7)), 2);

    // Page reload: a fresh synchronizer over the same storage finds the
    // token and recovers the cart.
    let reloaded_tokens = Arc::new(FileTokenStore::new(&token_path));
    let reloaded = CartSync::new(ctx.api.clone(), reloaded_tokens.clone());
    reloaded.init().await;
    assert_eq!(reloaded.phase(), Phase::Ready);
    assert_eq!(reloaded.cart().quantity_of(ProductId::new(7)), 2);

    // Logout: clear the store, then clear the synchronizer.
    reloaded_tokens.clear();
    reloaded.clear();
    assert_eq!(reloaded.phase(), Phase::Anonymous);
    assert!(reloaded.cart().is_empty());

    // Next page load stays anonymous and makes no cart request.
    let requests_before = ctx
        .server
        .received_requests()
        .await
        .unwrap_or_default()
        .len();
    let fresh = CartSync::new(ctx.api.clone(), Arc::new(FileTokenStore::new(&token_path)));
    fresh.init().await;
    assert_eq!(fresh.phase(), Phase::Anonymous);
    assert!(fresh.cart().is_empty());
    let requests_after = ctx
        .server
        .received_requests()
        .await
        .unwrap_or_default()
        .len();
    assert_eq!(requests_before, requests_after);
}

#[tokio::test]
async fn refresh_after_external_token_loss_empties_cart() {
    let ctx = TestContext::new().await;

    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([cart_line_json(1, 7, 2, 100)])),
        )
        .mount(&ctx.server)
        .await;

    ctx.log_in("jwt-abc");
    ctx.sync.refresh().await;
    assert!(!ctx.sync.cart().is_empty());

    // Token gone from storage: the next refresh finds no token and settles
    // anonymous with the empty snapshot, regardless of prior state.
    ctx.tokens.clear();
    ctx.sync.refresh().await;

    assert_eq!(ctx.sync.phase(), Phase::Anonymous);
    assert!(ctx.sync.cart().is_empty());
}
