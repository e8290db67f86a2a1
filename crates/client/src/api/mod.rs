//! Remote HTTP API client.
//!
//! # Architecture
//!
//! - The backend is the source of truth - NO local cart state lives here,
//!   every call returns what the server confirmed
//! - REST + JSON over `reqwest`; the session token is attached as a bearer
//!   credential on every authenticated call
//! - Mutation response bodies are not trusted: callers refetch the cart after
//!   every mutation instead of interpreting them
//! - The product catalog is cached in-memory via `moka` (5-minute TTL); cart
//!   reads are never cached
//!
//! # Example
//!
//! ```rust,ignore
//! use greenmarket_client::api::ApiClient;
//! use greenmarket_client::config::ApiConfig;
//!
//! let client = ApiClient::new(&ApiConfig::from_env()?)?;
//!
//! let token = client.login("user@example.com", "hunter2").await?;
//! client.add_to_cart(&token, product_id).await?;
//! let cart = client.get_cart(&token).await?;
//! ```

mod conversions;
pub mod types;

pub use types::{Product, User};

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument};

use greenmarket_core::{CartSnapshot, ProductId, SessionToken, TokenError};

use crate::config::ApiConfig;
use conversions::{convert_cart, convert_product, convert_user};
use types::{
    CartLineDto, ErrorBody, LoginRequest, ProductDto, RegisterRequest, TokenResponse, UserDto,
};

/// Errors that can occur when calling the backend API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, protocol).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The call requires a valid session token and none was accepted.
    #[error("authentication required")]
    AuthRequired,

    /// The backend rejected the request with a non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The backend returned an unusable session token.
    #[error("invalid session token in response: {0}")]
    Token(#[from] TokenError),
}

/// Client for the Greenmarket backend API.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    catalog: Cache<String, Vec<Product>>,
}

const CATALOG_CACHE_KEY: &str = "products";

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let catalog = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                catalog,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Check the response status and return the body text on success.
    ///
    /// 401/403 map to [`ApiError::AuthRequired`]; other non-success statuses
    /// carry the backend's `detail` message when one is present.
    async fn check_status(response: reqwest::Response) -> Result<String, ApiError> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ApiError::AuthRequired);
        }

        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map_or_else(|_| body.chars().take(200).collect(), |e| e.detail);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Log in with credentials and return the session token.
    ///
    /// The caller owns what happens next: store the token, then refresh the
    /// cart synchronizer.
    ///
    /// # Errors
    ///
    /// Returns an error on bad credentials or if the request fails.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionToken, ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("/login"))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        let body = Self::check_status(response).await?;
        let token: TokenResponse = serde_json::from_str(&body)?;

        Ok(SessionToken::new(token.access_token)?)
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is already taken or the request fails.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("/register"))
            .json(&RegisterRequest {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }

    /// Get the authenticated user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the request fails.
    #[instrument(skip(self, token))]
    pub async fn current_user(&self, token: &SessionToken) -> Result<User, ApiError> {
        let response = self
            .inner
            .client
            .get(self.endpoint("/me"))
            .bearer_auth(token.expose())
            .send()
            .await?;

        let body = Self::check_status(response).await?;
        let user: UserDto = serde_json::from_str(&body)?;

        Ok(convert_user(user))
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List the product catalog. Does not require authentication.
    ///
    /// Results are cached for 5 minutes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(products) = self.inner.catalog.get(CATALOG_CACHE_KEY).await {
            debug!("Cache hit for product catalog");
            return Ok(products);
        }

        let response = self
            .inner
            .client
            .get(self.endpoint("/api/products"))
            .send()
            .await?;

        let body = Self::check_status(response).await?;
        let dtos: Vec<ProductDto> = serde_json::from_str(&body)?;
        let products: Vec<Product> = dtos.into_iter().map(convert_product).collect();

        self.inner
            .catalog
            .insert(CATALOG_CACHE_KEY.to_string(), products.clone())
            .await;

        Ok(products)
    }

    /// Invalidate the cached product catalog.
    pub async fn invalidate_catalog(&self) {
        self.inner.catalog.invalidate(CATALOG_CACHE_KEY).await;
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Fetch the authenticated user's full cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the request fails.
    #[instrument(skip(self, token))]
    pub async fn get_cart(&self, token: &SessionToken) -> Result<CartSnapshot, ApiError> {
        let response = self
            .inner
            .client
            .get(self.endpoint("/api/cart"))
            .bearer_auth(token.expose())
            .send()
            .await?;

        let body = Self::check_status(response).await?;
        let lines: Vec<CartLineDto> = serde_json::from_str(&body)?;

        Ok(convert_cart(lines))
    }

    /// Increment a product's quantity by 1, creating the line if absent.
    ///
    /// The response body is discarded; callers refetch the cart for truth.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the request fails.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        token: &SessionToken,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint(&format!("/api/cart/add/{product_id}")))
            .bearer_auth(token.expose())
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }

    /// Decrement a product's quantity by 1; the server removes the line at 0.
    ///
    /// The response body is discarded; callers refetch the cart for truth.
    ///
    /// # Errors
    ///
    /// Returns an error if the line does not exist, the token is rejected, or
    /// the request fails.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn decrease_cart(
        &self,
        token: &SessionToken,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint(&format!("/api/cart/decrease/{product_id}")))
            .bearer_auth(token.expose())
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }
}
