use std::{io::Write, path::PathBuf};

use colored::*;
use jiff::{Timestamp, Zoned};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    notifications::{Notification, Notifier, NotifyError},
    storage::json::{read_json_or_default, write_json_atomically},
};

/// A notification waiting for its instant, as kept in the reminders ledger.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScheduledReminder {
    pub id: Uuid,
    pub fire_at: Timestamp,
    pub title: String,
    pub body: String,
}

impl ScheduledReminder {
    pub fn notification(&self) -> Notification {
        Notification::new(self.title.clone(), self.body.clone())
    }
}

/// Prints notifications to the terminal and keeps scheduled ones in a JSON
/// ledger until a later run picks them up with [`TerminalNotifier::take_due`].
pub struct TerminalNotifier {
    ledger_path: PathBuf,
}

impl TerminalNotifier {
    pub fn new(ledger_path: PathBuf) -> Self {
        Self { ledger_path }
    }

    pub fn pending(&self) -> Result<Vec<ScheduledReminder>, NotifyError> {
        Ok(read_json_or_default(&self.ledger_path)?)
    }

    /// Removes and returns every reminder whose instant is not after `now`.
    pub fn take_due(&self, now: &Zoned) -> Result<Vec<ScheduledReminder>, NotifyError> {
        let (due, pending): (Vec<_>, Vec<_>) = self
            .pending()?
            .into_iter()
            .partition(|reminder| reminder.fire_at <= now.timestamp());

        if !due.is_empty() {
            write_json_atomically(&self.ledger_path, &pending)?;
            debug!(due = due.len(), pending = pending.len(), "reminders taken from ledger");
        }

        Ok(due)
    }

    /// Shows every due reminder and drops it from the ledger.
    pub fn fire_due(&self, now: &Zoned) -> Result<usize, NotifyError> {
        let due = self.take_due(now)?;
        for reminder in &due {
            self.display(&reminder.notification())?;
        }
        Ok(due.len())
    }
}

impl Notifier for TerminalNotifier {
    fn display(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(
            stdout,
            "\n  {} {}\n    {}\n",
            "!".yellow().bold(),
            notification.title.yellow().bold(),
            notification.body
        )
        .map_err(|e| NotifyError::DisplayFailed { source: e })
    }

    fn schedule(&self, at: &Zoned, notification: &Notification) -> Result<(), NotifyError> {
        let mut reminders = self.pending()?;
        let fire_at = at.timestamp();

        if reminders
            .iter()
            .any(|reminder| reminder.fire_at == fire_at && reminder.title == notification.title)
        {
            debug!(%fire_at, title = %notification.title, "reminder already scheduled");
            return Ok(());
        }

        reminders.push(ScheduledReminder {
            id: Uuid::new_v4(),
            fire_at,
            title: notification.title.clone(),
            body: notification.body.clone(),
        });
        write_json_atomically(&self.ledger_path, &reminders)?;
        info!(%fire_at, title = %notification.title, "reminder scheduled");

        Ok(())
    }
}
