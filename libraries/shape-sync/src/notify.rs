//! User-facing notifications. These are transient: nothing is stored.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    Saved,
    SaveFailed,
    UpdateFailed,
    Deleted,
    DeleteFailed,
    LoadFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub notification_type: NotificationType,
}

impl NotificationType {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            NotificationType::SaveFailed
                | NotificationType::UpdateFailed
                | NotificationType::DeleteFailed
                | NotificationType::LoadFailed
        )
    }

    pub(crate) fn show(self, detail: impl fmt::Display) -> Notification {
        let (title, body) = match self {
            NotificationType::Saved => ("Shape saved", format!("Saved as {detail}")),
            NotificationType::SaveFailed => (
                "Could not save shape",
                format!("{detail}. The shape is still on the map; draw it again to retry."),
            ),
            NotificationType::UpdateFailed => ("Could not save edits", detail.to_string()),
            NotificationType::Deleted => ("Shape deleted", format!("Deleted {detail}")),
            NotificationType::DeleteFailed => (
                "Could not delete shape",
                format!("{detail}. The shape was kept."),
            ),
            NotificationType::LoadFailed => ("Could not load shapes", detail.to_string()),
        };
        Notification {
            title: title.to_string(),
            body,
            notification_type: self,
        }
    }
}

pub trait Notifier {
    fn notify(&self, notification: Notification);
}

impl<F: Fn(Notification)> Notifier for F {
    fn notify(&self, notification: Notification) {
        self(notification)
    }
}

/// Sends notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        if notification.notification_type.is_failure() {
            log::error!("{}: {}", notification.title, notification.body);
        } else {
            log::info!("{}: {}", notification.title, notification.body);
        }
    }
}
