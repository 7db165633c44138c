use std::cell::{Cell, RefCell};

use jiff::Zoned;

use crate::notifications::{Notification, Notifier, NotifyError};

/// Keeps every delivered and scheduled notification for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    pub displayed: RefCell<Vec<Notification>>,
    pub scheduled: RefCell<Vec<(Zoned, Notification)>>,
    failing: Cell<bool>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.failing.set(true);
        notifier
    }

    fn check(&self) -> Result<(), NotifyError> {
        if self.failing.get() {
            return Err(NotifyError::DisplayFailed {
                source: std::io::Error::other("delivery refused"),
            });
        }
        Ok(())
    }
}

impl Notifier for RecordingNotifier {
    fn display(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.check()?;
        self.displayed.borrow_mut().push(notification.clone());
        Ok(())
    }

    fn schedule(&self, at: &Zoned, notification: &Notification) -> Result<(), NotifyError> {
        self.check()?;
        self.scheduled
            .borrow_mut()
            .push((at.clone(), notification.clone()));
        Ok(())
    }
}
