//! Greenmarket storefront client library.
//!
//! This crate holds the UI-authoritative view of the user's cart and keeps it
//! consistent with the remote backend across login, logout, application start,
//! and item mutation.
//!
//! # Modules
//!
//! - [`config`] - API endpoint configuration from environment variables
//! - [`api`] - Remote HTTP API client (products, auth, cart endpoints)
//! - [`session`] - Session token persistence
//! - [`sync`] - The cart synchronizer and its publish/subscribe surface

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod session;
pub mod sync;
