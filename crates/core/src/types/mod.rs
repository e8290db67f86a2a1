//! Core types for Greenmarket.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod token;

pub use cart::{CartLine, CartSnapshot};
pub use id::*;
pub use price::Price;
pub use token::{SessionToken, TokenError};
