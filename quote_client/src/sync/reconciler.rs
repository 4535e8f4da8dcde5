//! Fetch, merge and resolve: one sync pass.
//!
//! The merge rule, for every remote quote in fetch order:
//!
//! - unknown id: append the remote quote;
//! - both sides changed since the cursor and the texts differ: conflict, the
//!   local record stays as is until the conflict is resolved;
//! - otherwise the newer timestamp wins, ties keep the local record.
//!
//! The sync cursor only moves on a pass whose fetch returned quotes. A failed or
//! empty fetch leaves the store and the cursor untouched, so the window used to
//! detect concurrent edits never widens silently.
//!
//! The store lock is held while merging and while applying each answer, never
//! while a conflict waits for the user.
use crate::model::conflict::{Conflict, Resolution};
use crate::model::store::QuoteStore;
use crate::notify::Notifier;
use crate::sync::RemoteSource;
use crate::sync::resolver::ConflictResolver;
use log::{debug, info};
use quote_common::model::now_millis;
use quote_common::{Quote, QuoteError, Result};
use std::sync::Mutex;

const PREVIEW_CHARS: usize = 30;

/// What the merge phase did to the store.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: Vec<Quote>,
    pub updated: Vec<Quote>,
    /// In detection order.
    pub conflicts: Vec<Conflict>,
}

/// Summary of a completed pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub conflicts: usize,
    pub resolutions: Vec<(i64, Resolution)>,
}

enum Step {
    Add,
    Update,
    Conflict(Quote),
    Keep,
}

fn is_conflict(local: &Quote, remote: &Quote, cursor: i64) -> bool {
    local.timestamp > cursor && remote.timestamp > cursor && local.text != remote.text
}

/// Merges `remote` into `store` in memory. Nothing is persisted.
pub fn merge_remote(store: &mut QuoteStore, remote: Vec<Quote>, cursor: i64) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for remote_quote in remote {
        let step = match store.get(remote_quote.id) {
            None => Step::Add,
            Some(local) if is_conflict(local, &remote_quote, cursor) => {
                Step::Conflict(local.clone())
            }
            Some(local) if remote_quote.timestamp > local.timestamp => Step::Update,
            Some(_) => Step::Keep,
        };

        match step {
            Step::Add => {
                store.push_remote(remote_quote.clone());
                outcome.added.push(remote_quote);
            }
            Step::Update => {
                store.replace(remote_quote.clone());
                outcome.updated.push(remote_quote);
            }
            Step::Conflict(local) => outcome.conflicts.push(Conflict {
                id: remote_quote.id,
                local,
                remote: remote_quote,
            }),
            Step::Keep => debug!("Local quote {} is up to date", remote_quote.id),
        }
    }
    outcome
}

/// Applies one answer to the store in memory. Returns whether the store changed.
pub fn apply_resolution(store: &mut QuoteStore, conflict: &Conflict, choice: Resolution) -> bool {
    match choice {
        Resolution::KeepLocal | Resolution::Cancel => false,
        Resolution::KeepServer => store.replace(conflict.remote.clone()),
        Resolution::KeepBoth => {
            let id = store.fresh_id();
            store.push_remote(Quote {
                id,
                ..conflict.remote.clone()
            });
            true
        }
    }
}

/// Runs sync passes against one remote.
pub struct SyncReconciler<S, N> {
    remote: S,
    notifier: N,
}

impl<S: RemoteSource, N: Notifier> SyncReconciler<S, N> {
    pub fn new(remote: S, notifier: N) -> Self {
        Self { remote, notifier }
    }

    /// One full pass. Every failure is also reported through the notifier.
    pub fn run_pass(
        &self,
        store: &Mutex<QuoteStore>,
        resolver: &mut dyn ConflictResolver,
    ) -> Result<SyncReport> {
        match self.try_pass(store, resolver) {
            Ok(report) => {
                info!(
                    "Sync pass done: {} added, {} updated, {} conflicts",
                    report.added, report.updated, report.conflicts
                );
                Ok(report)
            }
            Err(e) => {
                self.notifier.error(&format!("Sync error: {}", e));
                Err(e)
            }
        }
    }

    fn try_pass(
        &self,
        store: &Mutex<QuoteStore>,
        resolver: &mut dyn ConflictResolver,
    ) -> Result<SyncReport> {
        let remote = self.remote.fetch_quotes()?;
        if remote.is_empty() {
            return Err(QuoteError::Network("server returned no quotes".to_string()));
        }

        let outcome = {
            let mut store = store.lock()?;
            let cursor = store.sync_cursor();
            merge_remote(&mut store, remote, cursor)
        };

        for quote in &outcome.added {
            self.notifier
                .success(&format!("New quote added: \"{}\"", quote.preview(PREVIEW_CHARS)));
        }
        for quote in &outcome.updated {
            self.notifier
                .info(&format!("Updated quote: \"{}\"", quote.preview(PREVIEW_CHARS)));
        }

        let mut report = SyncReport {
            added: outcome.added.len(),
            updated: outcome.updated.len(),
            conflicts: outcome.conflicts.len(),
            resolutions: Vec::with_capacity(outcome.conflicts.len()),
        };

        if outcome.conflicts.is_empty() {
            store.lock()?.persist()?;
            self.notifier.success("Synchronization completed successfully");
        } else {
            for conflict in &outcome.conflicts {
                self.notifier.conflict(&format!(
                    "Quote {} changed on both sides: local \"{}\" vs server \"{}\"",
                    conflict.id,
                    conflict.local.preview(PREVIEW_CHARS),
                    conflict.remote.preview(PREVIEW_CHARS)
                ));
                let choice = resolver.resolve(conflict);
                apply_resolution(&mut *store.lock()?, conflict, choice);
                self.notifier.info(choice.outcome_message());
                report.resolutions.push((conflict.id, choice));
            }
            store.lock()?.persist()?;
            self.notifier.success("All conflicts resolved");
        }

        store.lock()?.set_sync_cursor(now_millis())?;
        Ok(report)
    }
}
