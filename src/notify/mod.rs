// Outbound notifications about widget changes
//
// Notifications are a secondary effect: senders never wait on delivery and
// failures are only logged.

use serde::Serialize;

// Public API
pub use apprise::{AppriseClient, AppriseNotifier, AppriseSettings, NotifyError};
pub use policy::{parse_switch, switch_for_widget, uses_generic_notifications, NotificationPolicy};

// Internal modules
mod apprise;
mod policy;

/// Severity attached to a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyKind {
    Info,
    Success,
    Warning,
    Failure,
}

/// Fire-and-forget notification sink
pub trait Notifier: Send + Sync {
    /// Queue a notification about a widget; must not block the caller
    fn notify(&self, widget_type: &str, title: &str, body: &str, kind: NotifyKind);
}

/// Notifier used when no delivery backend is configured
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _widget_type: &str, _title: &str, _body: &str, _kind: NotifyKind) {}
}
