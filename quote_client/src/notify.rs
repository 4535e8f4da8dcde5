//! User-facing notifications.
//!
//! Every notification has a `Severity`. `LogNotifier` renders them through the
//! `log` facade, so they show up on the console with the client's logger.
use log::{error, info, warn};
use std::sync::Arc;
use strum_macros::Display;

/// Notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
    /// Stays relevant until the user answers the pending conflict.
    Conflict,
}

/// Sink for user-facing messages.
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);

    fn info(&self, message: &str) {
        self.notify(Severity::Info, message);
    }

    fn success(&self, message: &str) {
        self.notify(Severity::Success, message);
    }

    fn error(&self, message: &str) {
        self.notify(Severity::Error, message);
    }

    fn conflict(&self, message: &str) {
        self.notify(Severity::Conflict, message);
    }
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, severity: Severity, message: &str) {
        (**self).notify(severity, message);
    }
}

/// Renders notifications as log records.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info | Severity::Success => info!("[{}] {}", severity, message),
            Severity::Error => error!("[{}] {}", severity, message),
            Severity::Conflict => warn!("[{}] {}", severity, message),
        }
    }
}
