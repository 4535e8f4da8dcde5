//! Background sync scheduler.
//!
//! `SyncScheduler::start` spawns one worker thread that owns the reconciler and
//! the conflict resolver. The worker runs a pass right away, then waits on a
//! `crossbeam_channel::tick` for the next interval, an explicit `sync_now`
//! request, or a stop signal. Passes all run on that one thread, one after the
//! other, so they never overlap; ticks that arrive during a long pass (for
//! example one waiting on the user) collapse into a single follow-up pass.
use crate::model::store::QuoteStore;
use crate::notify::Notifier;
use crate::sync::RemoteSource;
use crate::sync::reconciler::SyncReconciler;
use crate::sync::resolver::ConflictResolver;
use crossbeam_channel::{Sender, bounded, select, tick, unbounded};
use log::{debug, error, info};
use quote_common::{QuoteError, Result};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default time between passes.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Control handle for a running scheduler.
pub struct SyncHandle {
    trigger_tx: Sender<()>,
    stop_tx: Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// Asks for a pass as soon as the worker is idle.
    pub fn sync_now(&self) -> Result<()> {
        match self.trigger_tx.try_send(()) {
            Ok(()) => Ok(()),
            // A pass is already queued.
            Err(crossbeam_channel::TrySendError::Full(())) => Ok(()),
            Err(e) => Err(QuoteError::ChannelSend(e.to_string())),
        }
    }

    /// Stops the worker and waits for it to finish its current pass.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Sync worker panicked");
            }
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Periodic sync runner.
pub struct SyncScheduler;

impl SyncScheduler {
    /// Start the worker thread; the first pass runs immediately.
    pub fn start<S, N, R>(
        reconciler: SyncReconciler<S, N>,
        store: Arc<Mutex<QuoteStore>>,
        mut resolver: R,
        interval: Duration,
    ) -> SyncHandle
    where
        S: RemoteSource + 'static,
        N: Notifier + 'static,
        R: ConflictResolver + Send + 'static,
    {
        let (trigger_tx, trigger_rx) = bounded::<()>(1);
        let (stop_tx, stop_rx) = unbounded::<()>();

        let worker = thread::spawn(move || {
            info!("Sync worker started (interval: {:?})", interval);
            let ticker = tick(interval);
            let mut run = || {
                if let Err(e) = reconciler.run_pass(&store, &mut resolver) {
                    debug!("Sync pass ended early: {}", e);
                }
            };

            run();
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(trigger_rx) -> _ => run(),
                    recv(ticker) -> _ => run(),
                }
            }
            info!("Sync worker stopping...");
        });

        SyncHandle {
            trigger_tx,
            stop_tx,
            worker: Some(worker),
        }
    }
}
