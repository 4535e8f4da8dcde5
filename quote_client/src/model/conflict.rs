//! Sync conflicts and their resolution.
//!
//! A `Conflict` is raised when both sides modified the same quote since the
//! last sync and the texts differ. The reconciler suspends on each conflict by
//! handing out a `PendingConflict`; whoever owns it answers exactly once with a
//! `Resolution`, which resumes the sync pass.
use crossbeam_channel::Sender;
use log::debug;
use quote_common::Quote;
use strum_macros::{Display, EnumString};

/// Same-id pair modified on both sides since the sync cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub id: i64,
    pub local: Quote,
    pub remote: Quote,
}

/// User's answer to a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Resolution {
    /// Leave the local record untouched.
    #[strum(to_string = "keep-local", serialize = "local", serialize = "l")]
    KeepLocal,
    /// Overwrite the local record with the remote one.
    #[strum(to_string = "keep-server", serialize = "server", serialize = "s")]
    KeepServer,
    /// Keep the local record and append the remote one under a new id.
    #[strum(to_string = "keep-both", serialize = "both", serialize = "b")]
    KeepBoth,
    /// Skip this conflict.
    #[strum(to_string = "cancel", serialize = "skip", serialize = "c")]
    Cancel,
}

impl Resolution {
    /// Message shown once the choice has been applied.
    pub fn outcome_message(self) -> &'static str {
        match self {
            Resolution::KeepLocal => "Kept local version",
            Resolution::KeepServer => "Updated to server version",
            Resolution::KeepBoth => "Kept both versions",
            Resolution::Cancel => "Conflict resolution skipped",
        }
    }
}

/// A conflict waiting for an answer.
///
/// Dropping it without calling `resolve` is treated as `Cancel` by the waiting
/// reconciler.
#[derive(Debug)]
pub struct PendingConflict {
    pub conflict: Conflict,
    reply: Sender<Resolution>,
}

impl PendingConflict {
    pub fn new(conflict: Conflict, reply: Sender<Resolution>) -> Self {
        Self { conflict, reply }
    }

    /// Answers the conflict and resumes the sync pass.
    pub fn resolve(self, choice: Resolution) {
        if self.reply.send(choice).is_err() {
            debug!("Sync pass gave up on conflict {} before it was answered", self.conflict.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn resolution_parses_short_and_long_forms() {
        assert_eq!("keep-local".parse::<Resolution>().unwrap(), Resolution::KeepLocal);
        assert_eq!("SERVER".parse::<Resolution>().unwrap(), Resolution::KeepServer);
        assert_eq!("b".parse::<Resolution>().unwrap(), Resolution::KeepBoth);
        assert_eq!("skip".parse::<Resolution>().unwrap(), Resolution::Cancel);
        assert!("maybe".parse::<Resolution>().is_err());
    }

    #[test]
    fn resolution_displays_long_form() {
        assert_eq!(Resolution::KeepBoth.to_string(), "keep-both");
    }

    #[test]
    fn pending_conflict_delivers_choice() {
        let quote = Quote {
            id: 1,
            text: "A".to_string(),
            category: "Life".to_string(),
            timestamp: 1,
            origin_flag: false,
        };
        let conflict = Conflict {
            id: 1,
            local: quote.clone(),
            remote: quote,
        };
        let (tx, rx) = bounded(1);
        PendingConflict::new(conflict, tx).resolve(Resolution::KeepServer);
        assert_eq!(rx.recv().unwrap(), Resolution::KeepServer);
    }
}
