//! Quote manager domain types.
//!
//! - `store`: the quote store and its durable mirror.
//! - `conflict`: sync conflicts, resolution choices and the pending-conflict handle.
pub mod conflict;
pub mod store;
