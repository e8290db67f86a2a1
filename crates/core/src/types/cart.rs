//! Cart snapshot types.
//!
//! A [`CartSnapshot`] is the full, server-confirmed representation of a user's
//! cart at a point in time. The client never edits a snapshot in place: every
//! change goes through the remote API and comes back as a complete replacement,
//! so the displayed cart can never diverge from the server for longer than one
//! round trip.

use serde::{Deserialize, Serialize};

use crate::types::id::{CartLineId, ProductId};
use crate::types::price::Price;

/// One product's quantity in the cart, as confirmed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Server-side row ID for this line.
    pub line_id: CartLineId,
    /// Product this line refers to.
    pub product_id: ProductId,
    /// Quantity, always >= 1. A line that would drop to 0 is removed by the
    /// server and never appears here with quantity 0.
    pub quantity: u32,
    /// Unit price snapshotted by the server at fetch time.
    pub unit_price: Price,
    /// Display name, opaque to cart logic.
    pub display_name: String,
    /// Image path, opaque to cart logic.
    pub image_path: String,
}

impl CartLine {
    /// Total for this line (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price * self.quantity
    }
}

/// Full, server-confirmed cart for one user at a point in time.
///
/// Line order is server-defined and preserved for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CartSnapshot {
    /// Username of the owning user; empty for the anonymous empty snapshot.
    pub username: String,
    /// Cart lines in server insertion order.
    pub lines: Vec<CartLine>,
}

impl CartSnapshot {
    /// The empty snapshot, shown whenever no authenticated cart is available.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot from server-confirmed lines.
    #[must_use]
    pub fn new(username: impl Into<String>, lines: Vec<CartLine>) -> Self {
        Self {
            username: username.into(),
            lines,
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total item count across all lines (header badge number).
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.lines
            .iter()
            .fold(Price::ZERO, |acc, line| acc + line.line_total())
    }

    /// Quantity of a given product, 0 if absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.lines
            .iter()
            .find(|line| line.product_id == product_id)
            .map_or(0, |line| line.quantity)
    }
}
