//! Cart synchronization.
//!
//! [`CartSync`] owns the client's view of "what is in the cart" and keeps it
//! consistent with the backend. Every mutation follows the
//! refetch-after-mutation policy: fire the remote change, then reload the full
//! cart, rather than predicting the new state locally. This trades one extra
//! round trip per mutation for the guarantee that the displayed cart always
//! reflects server-computed truth (price snapshots, quantity floors), and it
//! removes the whole class of client/server divergence bugs.
//!
//! # State machine
//!
//! - **Anonymous** - no session token; the cart is the empty snapshot and no
//!   remote calls are made
//! - **Syncing** - a fetch or mutation is in flight
//! - **Ready** - token present and the last fetch settled; the cart is the
//!   last confirmed snapshot, or the empty snapshot if that fetch failed
//!   (fail-safe to empty, never to stale data)
//!
//! The synchronizer does not watch token storage: the auth flow stores the
//! token then calls [`CartSync::refresh`] on login, and clears the store then
//! calls [`CartSync::clear`] on logout.
//!
//! # Ordering
//!
//! Fetches that overlap may complete out of order. Each issued fetch is tagged
//! with a monotonic generation; a completion is applied only while its
//! generation is still the most recently issued one. Logout also advances the
//! generation, so an in-flight fetch that completes after logout is dropped,
//! not published.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use greenmarket_core::{CartSnapshot, ProductId};

use crate::api::{ApiClient, ApiError};
use crate::session::TokenStore;

/// Where the synchronizer currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No session token; the cart is empty and stays local.
    Anonymous,
    /// A fetch or mutation is in flight.
    Syncing,
    /// The last fetch settled; the cart is the last confirmed snapshot.
    Ready,
}

/// The published synchronizer state: lifecycle phase plus the cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartState {
    pub phase: Phase,
    pub cart: CartSnapshot,
}

impl CartState {
    fn anonymous() -> Self {
        Self {
            phase: Phase::Anonymous,
            cart: CartSnapshot::empty(),
        }
    }
}

/// Errors surfaced to callers of [`CartSync::add`] and [`CartSync::remove`].
///
/// Fetch failures never appear here: a failed refresh degrades to the empty
/// snapshot instead of propagating, since "not authenticated" and "transient
/// error" are indistinguishable from this side of the wire and the safe
/// default is to show nothing.
#[derive(Debug, Error)]
pub enum CartError {
    /// No session token is present, or the backend rejected it.
    #[error("authentication required")]
    AuthRequired,

    /// The request did not reach the backend or the response was unusable.
    #[error("network error: {0}")]
    Network(ApiError),

    /// The backend refused the mutation (e.g., unknown item).
    #[error("rejected by server: {status} - {message}")]
    Rejected { status: u16, message: String },
}

impl From<ApiError> for CartError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::AuthRequired => Self::AuthRequired,
            ApiError::Status { status, message } => Self::Rejected { status, message },
            other => Self::Network(other),
        }
    }
}

/// The cart synchronizer.
///
/// Constructed once at application start and shared by cloning; every view
/// that needs cart contents subscribes via [`CartSync::subscribe`]. Views
/// never mutate the snapshot directly - all changes flow through [`add`],
/// [`remove`], [`refresh`], and [`clear`].
///
/// [`add`]: CartSync::add
/// [`remove`]: CartSync::remove
/// [`refresh`]: CartSync::refresh
/// [`clear`]: CartSync::clear
#[derive(Clone)]
pub struct CartSync {
    inner: Arc<CartSyncInner>,
}

struct CartSyncInner {
    api: ApiClient,
    tokens: Arc<dyn TokenStore>,
    /// Generation of the most recently issued fetch. Guarded together with
    /// publication so a check-then-publish cannot interleave with a newer
    /// issue. Never held across an await.
    issued: Mutex<u64>,
    tx: watch::Sender<CartState>,
}

impl CartSync {
    /// Create a synchronizer in the Anonymous state.
    ///
    /// Call [`CartSync::init`] afterwards to perform the application-start
    /// transition.
    #[must_use]
    pub fn new(api: ApiClient, tokens: Arc<dyn TokenStore>) -> Self {
        let (tx, _rx) = watch::channel(CartState::anonymous());

        Self {
            inner: Arc::new(CartSyncInner {
                api,
                tokens,
                issued: Mutex::new(0),
                tx,
            }),
        }
    }

    /// Application-start transition.
    ///
    /// Reads the token store: token present means fetch the cart, absent means
    /// settle in Anonymous with the empty snapshot.
    pub async fn init(&self) {
        if self.inner.tokens.get().is_some() {
            self.refresh().await;
        } else {
            self.clear();
        }
    }

    /// Fetch the authoritative cart and publish it.
    ///
    /// On success the snapshot is replaced wholesale; on failure it is
    /// replaced with the empty snapshot. Old data is never retained after a
    /// failed fetch. Nothing is published if a newer fetch was issued while
    /// this one was in flight.
    #[instrument(skip(self))]
    pub async fn refresh(&self) {
        let Some(token) = self.inner.tokens.get() else {
            // Anonymous: no remote calls permitted, cart must be empty.
            self.clear();
            return;
        };

        let generation = self.begin_fetch();
        let result = self.inner.api.get_cart(&token).await;
        self.finish_fetch(generation, result);
    }

    /// Increment a product's quantity by 1, then refetch the cart.
    ///
    /// The refetch runs even when the increment fails, so the displayed cart
    /// stays truthful either way.
    ///
    /// # Errors
    ///
    /// Returns the increment call's failure; the caller may show a notice.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add(&self, product_id: ProductId) -> Result<(), CartError> {
        let Some(token) = self.inner.tokens.get() else {
            return Err(CartError::AuthRequired);
        };

        self.publish_syncing();
        let mutation = self.inner.api.add_to_cart(&token, product_id).await;
        self.refresh().await;

        mutation.map_err(Into::into)
    }

    /// Decrement a product's quantity by 1, then refetch the cart.
    ///
    /// The server removes the line when the quantity reaches 0. Same refetch
    /// discipline as [`CartSync::add`].
    ///
    /// # Errors
    ///
    /// Returns the decrement call's failure; the caller may show a notice.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: ProductId) -> Result<(), CartError> {
        let Some(token) = self.inner.tokens.get() else {
            return Err(CartError::AuthRequired);
        };

        self.publish_syncing();
        let mutation = self.inner.api.decrease_cart(&token, product_id).await;
        self.refresh().await;

        mutation.map_err(Into::into)
    }

    /// Logout transition: publish the empty snapshot and supersede every
    /// in-flight fetch, so a completion arriving after logout is dropped.
    ///
    /// Does not touch the token store - the auth flow clears that before
    /// calling here.
    pub fn clear(&self) {
        let mut issued = self.lock_issued();
        *issued += 1;
        self.inner.tx.send_replace(CartState::anonymous());
    }

    /// Subscribe to state changes.
    ///
    /// The receiver immediately holds the latest published state, so a view
    /// subscribing after a transition has no missed-update window.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.tx.subscribe()
    }

    /// The last published snapshot.
    #[must_use]
    pub fn cart(&self) -> CartSnapshot {
        self.inner.tx.borrow().cart.clone()
    }

    /// The current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.tx.borrow().phase
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock_issued(&self) -> std::sync::MutexGuard<'_, u64> {
        self.inner.issued.lock().expect("cart sync lock poisoned")
    }

    /// Enter Syncing while keeping the current snapshot on display.
    fn publish_syncing(&self) {
        self.inner
            .tx
            .send_modify(|state| state.phase = Phase::Syncing);
    }

    /// Tag a new fetch with the next generation and enter Syncing.
    fn begin_fetch(&self) -> u64 {
        let mut issued = self.lock_issued();
        *issued += 1;
        self.publish_syncing();
        *issued
    }

    /// Apply a fetch result unless a newer fetch has been issued since.
    fn finish_fetch(&self, generation: u64, result: Result<CartSnapshot, ApiError>) {
        let issued = self.lock_issued();
        if generation != *issued {
            debug!(generation, latest = *issued, "discarding superseded cart fetch");
            return;
        }

        let cart = match result {
            Ok(cart) => cart,
            Err(e) => {
                // "Not authenticated" and "transient failure" look the same
                // here; showing nothing is the safe default for both.
                warn!(error = %e, "cart fetch failed, falling back to empty cart");
                CartSnapshot::empty()
            }
        };

        self.inner.tx.send_replace(CartState {
            phase: Phase::Ready,
            cart,
        });
    }
}
