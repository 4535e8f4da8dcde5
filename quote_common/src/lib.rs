//!
//! Common types and utilities shared by the mock quote server and the quote manager.
//!
//! This crate aggregates:
//! - `error`: unified error type `QuoteError` used across the workspace.
//! - `result`: handy `Result<T, QuoteError>` alias.
//! - `model`: quote records, drafts and the upstream post shape.
//! - `command`: request/reply payloads exchanged between client and server.
//! - `net`: networking constants and small helpers.
#![warn(missing_docs)]
pub mod error;
pub mod result;
pub mod model;
pub mod command;
pub mod net;

pub use error::QuoteError;
pub use result::Result;
pub use command::{Command, Reply};
pub use model::{NewQuote, Post, PostDraft, Quote};
