//! API types: domain-facing results and raw wire formats.
//!
//! Wire structs mirror the backend's JSON exactly and are converted into
//! domain types by the [`conversions`](super::conversions) module before
//! leaving this crate.

use serde::{Deserialize, Serialize};

use greenmarket_core::{Price, ProductId, UserId};

// =============================================================================
// Domain Types
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image_path: String,
}

/// The authenticated user, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

// =============================================================================
// Wire Types
// =============================================================================

/// One cart line as returned by `GET /api/cart`.
#[derive(Debug, Clone, Deserialize)]
pub struct CartLineDto {
    pub id: i32,
    pub product_id: i32,
    pub username: String,
    pub name: String,
    pub price: Price,
    pub image: String,
    pub quantity: u32,
}

/// One product as returned by `GET /api/products`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDto {
    pub id: i32,
    pub name: String,
    pub price: Price,
    pub image: String,
}

/// The user object returned by `GET /me`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
}

/// Request body for `POST /login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response body for `POST /login`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Request body for `POST /register`.
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Error body the backend attaches to non-success responses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
