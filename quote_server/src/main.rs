//! Mock posts API for the quote manager.
//!
//! This binary stands in for the public placeholder API the quote manager syncs
//! against. It wires together two building blocks:
//!
//! - `PostBoard`: in-memory posts, seeded at startup, extended by `CREATE_POST`
//!   requests.
//! - `PostEditor`: a background thread that periodically revises a random post
//!   so that clients observe remote updates and conflicts.
//!
//! Requests arrive over TCP as one JSON `Command` line per connection and are
//! answered with one JSON `Reply` line (see `quote_common::command`). Each
//! connection is served on its own thread; a malformed request is answered with
//! an `ERROR` reply and never stops the accept loop.
#![warn(missing_docs)]
use crate::model::post_board::PostBoard;
use crate::model::post_editor::PostEditor;
use crate::receiver::RequestServer;
use clap::Parser;
use log::info;
use quote_common::QuoteError;
use quote_common::Result;
use quote_common::model::now_millis;
use quote_common::net::{API_PORT, addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub mod model;
mod receiver;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Address to bind the posts API to.
    #[clap(long, default_value = "0.0.0.0")]
    bind: String,

    /// TCP port of the posts API.
    #[clap(long, default_value_t = API_PORT)]
    port: u16,

    /// Seconds between random post revisions.
    #[clap(long, default_value_t = 45)]
    edit_interval_secs: u64,

    /// Serve the seed posts without revising them.
    #[clap(long)]
    no_edits: bool,
}

fn main() -> Result<(), QuoteError> {
    init_logger();
    let args = Args::parse();

    let board = Arc::new(Mutex::new(PostBoard::seeded(now_millis())));
    info!("Loaded {} seed posts", board.lock()?.len());
    let _editor_stop = if args.no_edits {
        None
    } else {
        Some(PostEditor::start(
            Arc::clone(&board),
            Duration::from_secs(args.edit_interval_secs.max(1)),
        ))
    };

    let server = RequestServer::new(&addr(&args.bind, args.port), board)?;
    info!("Serving posts on {}", server.local_addr()?);
    server.serve()
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
