//! Command-line arguments for the quote manager.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::Parser;
use quote_common::net::{API_PORT, DEFAULT_FETCH_LIMIT};
use crate::sync::scheduler::SYNC_INTERVAL;
use std::path::PathBuf;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Host or IP address of the posts API.
    #[clap(long, default_value = "127.0.0.1")]
    pub server_ip: String,

    /// TCP port of the posts API.
    #[clap(long, default_value_t = API_PORT)]
    pub port: u16,

    /// File holding quotes, the category filter and the sync cursor.
    #[clap(long, default_value = "quotes_store.json")]
    pub storage: PathBuf,

    /// Keep everything in memory; nothing survives a restart.
    #[clap(long)]
    pub ephemeral: bool,

    /// Seconds between background sync passes.
    #[clap(long, default_value_t = SYNC_INTERVAL.as_secs())]
    pub sync_interval_secs: u64,

    /// Number of remote posts requested per sync pass.
    #[clap(long, default_value_t = DEFAULT_FETCH_LIMIT)]
    pub fetch_limit: usize,
}
