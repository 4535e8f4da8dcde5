//! Synchronization of the local quote store against the remote posts API.
//!
//! A sync pass runs in three phases:
//!
//! - Fetch: ask the `RemoteSource` for the current remote quotes.
//! - Merge: add unknown ids, take newer remote versions, and collect
//!   conflicts where both sides changed the same id since the sync cursor.
//! - Resolve: hand each conflict, in detection order, to a
//!   `ConflictResolver` and apply its answer.
//!
//! `SyncScheduler` runs passes on a background thread, once at startup and then
//! on a fixed interval.
pub mod reconciler;
pub mod resolver;
pub mod scheduler;

use quote_common::{NewQuote, Quote, Result};

pub use reconciler::SyncReconciler;
pub use resolver::ChannelResolver;
pub use scheduler::{SyncHandle, SyncScheduler};

/// Remote side of the sync.
pub trait RemoteSource: Send {
    /// Current remote quotes.
    fn fetch_quotes(&self) -> Result<Vec<Quote>>;
    /// Publishes a quote the user just added.
    fn post_quote(&self, quote: &NewQuote) -> Result<()>;
}
