//! Domain models for the mock posts API.
//!
//! - `post_board`: in-memory posts with seed data, creation and revision.
//! - `post_editor`: background thread that revises random posts over time.

pub mod post_board;
pub mod post_editor;
