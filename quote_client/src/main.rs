//! Quote manager: a console quote collection that stays in sync with a posts API.
//!
//! Quotes live in a local store persisted to a JSON file. A background worker
//! fetches remote posts every few seconds, turns them into quotes and merges
//! them in; when the same quote changed on both sides since the last sync, the
//! console asks which version to keep. Adding a quote posts it to the server
//! first and only keeps it locally once the server accepted it.
//!
//! Usage example (CLI):
//! ```bash
//! quote_client --server-ip 127.0.0.1 --port 8080 --storage ./quotes_store.json
//! ```
//!
//! Type `help` at the prompt for the list of commands.
#![warn(missing_docs)]
mod args;
mod console;
mod model;
mod notify;
mod remote;
mod storage;
mod sync;

use crate::args::Args;
use crate::console::{Console, spawn_stdin_reader};
use crate::model::conflict::PendingConflict;
use crate::model::store::QuoteStore;
use crate::notify::{LogNotifier, Notifier};
use crate::remote::TcpRemote;
use crate::storage::{JsonFileStorage, KeyValueStore, MemoryStorage};
use crate::sync::{ChannelResolver, SyncReconciler, SyncScheduler};
use clap::Parser;
use crossbeam_channel::unbounded;
use log::{info, warn};
use quote_common::Result;
use quote_common::net::addr;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    let (shutdown_tx, shutdown_rx) = unbounded::<()>();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Ctrl+C received. Shutting down client...");
        let _ = shutdown_tx.send(());
    }) {
        warn!("Could not install Ctrl+C handler: {}", e);
    }

    let storage: Box<dyn KeyValueStore> = if args.ephemeral {
        info!("Using in-memory storage");
        Box::new(MemoryStorage::new())
    } else {
        let storage = JsonFileStorage::open(&args.storage)?;
        info!("Using storage file {}", storage.path().display());
        Box::new(storage)
    };
    let store = Arc::new(Mutex::new(QuoteStore::open(storage)?));
    info!("Loaded {} quotes", store.lock()?.len());

    let server_addr = addr(args.server_ip.trim(), args.port);
    let remote = TcpRemote::new(server_addr.clone(), args.fetch_limit);
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    let (conflict_tx, conflict_rx) = unbounded::<PendingConflict>();
    let reconciler = SyncReconciler::new(remote.clone(), Arc::clone(&notifier));
    let sync = SyncScheduler::start(
        reconciler,
        Arc::clone(&store),
        ChannelResolver::new(conflict_tx),
        Duration::from_secs(args.sync_interval_secs.max(1)),
    );
    info!("Syncing with {}. Type `help` for commands.", server_addr);

    let mut console = Console::new(store, Box::new(remote), notifier, Some(sync), io::stdout());
    console.run(spawn_stdin_reader(), conflict_rx, shutdown_rx)
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
