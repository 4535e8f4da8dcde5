use crate::model::conflict::{Conflict, PendingConflict, Resolution};
use crossbeam_channel::{Sender, bounded};
use log::{debug, warn};

/// Decides the outcome of a conflict.
///
/// Called once per conflict, in detection order; the sync pass does not move on
/// until `resolve` returns.
pub trait ConflictResolver {
    fn resolve(&mut self, conflict: &Conflict) -> Resolution;
}

/// Resolver that forwards conflicts to another thread.
///
/// Each conflict is sent as a `PendingConflict` and the calling thread blocks on
/// a one-shot reply channel until it is answered. There is no timeout: an
/// unanswered conflict stalls the pass. If the receiving side has gone away, or
/// the pending conflict is dropped unanswered, the conflict is skipped.
#[derive(Clone)]
pub struct ChannelResolver {
    pending_tx: Sender<PendingConflict>,
}

impl ChannelResolver {
    pub fn new(pending_tx: Sender<PendingConflict>) -> Self {
        Self { pending_tx }
    }
}

impl ConflictResolver for ChannelResolver {
    fn resolve(&mut self, conflict: &Conflict) -> Resolution {
        let (reply_tx, reply_rx) = bounded::<Resolution>(1);
        let pending = PendingConflict::new(conflict.clone(), reply_tx);
        if self.pending_tx.send(pending).is_err() {
            warn!("No one is listening for conflicts, skipping quote {}", conflict.id);
            return Resolution::Cancel;
        }
        match reply_rx.recv() {
            Ok(choice) => choice,
            Err(_) => {
                debug!("Conflict {} dropped without an answer", conflict.id);
                Resolution::Cancel
            }
        }
    }
}
