use jiff::Zoned;
use thiserror::Error;

use crate::storage::StorageError;

#[cfg(test)]
pub mod recording;
pub mod terminal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to display notification: {source}")]
    DisplayFailed {
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to record scheduled reminder: {0}")]
    Ledger(#[from] StorageError),
}

/// Delivery mechanism for operator reminders.
pub trait Notifier {
    /// Shows a notification right away.
    fn display(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Arranges for a notification to be shown at or after `at`.
    fn schedule(&self, at: &Zoned, notification: &Notification) -> Result<(), NotifyError>;
}
