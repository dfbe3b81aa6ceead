use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::notify::{uses_generic_notifications, NotificationPolicy, Notifier, NotifyKind};

/// What the watcher needs to know about a rendered widget
#[derive(Debug, Clone, Default)]
pub struct WidgetInfo {
    pub id: u64,
    pub widget_type: String,
    pub title: String,
    pub title_url: String,
    /// Per-widget opt-in from the dashboard config
    pub notifications: bool,
}

impl WidgetInfo {
    fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.widget_type
        } else {
            &self.title
        }
    }
}

/// Sends a generic "content changed" notification when a widget's rendered output changes
///
/// The first render of a widget only records a baseline.
pub struct ContentWatcher {
    notifier: Arc<dyn Notifier>,
    policy: NotificationPolicy,
    last_rendered: Mutex<HashMap<u64, String>>,
}

impl ContentWatcher {
    pub fn new(notifier: Arc<dyn Notifier>, policy: NotificationPolicy) -> Self {
        Self {
            notifier,
            policy,
            last_rendered: Mutex::new(HashMap::new()),
        }
    }

    /// Records `rendered` for the widget, returning whether a notification went out
    pub fn observe(&self, widget: &WidgetInfo, rendered: &str) -> bool {
        if !widget.notifications
            || !self.policy.enabled_for_widget(&widget.widget_type)
            || !uses_generic_notifications(&widget.widget_type)
        {
            return false;
        }

        let previous = self
            .last_rendered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(widget.id, rendered.to_string());

        let changed = matches!(
            previous,
            Some(previous) if !previous.is_empty() && previous != rendered
        );
        if !changed {
            return false;
        }

        debug!(widget_id = widget.id, widget_type = %widget.widget_type, "Widget content changed");

        let mut body = "Widget content changed.".to_string();
        if !widget.title_url.trim().is_empty() {
            body.push_str("\nURL: ");
            body.push_str(&widget.title_url);
        }
        self.notifier.notify(
            &widget.widget_type,
            &format!("Widget: {}", widget.display_title()),
            &body,
            NotifyKind::Info,
        );
        true
    }
}

/// Whether two sets of item keys differ
pub fn string_set_changed(previous: &HashSet<String>, current: &HashSet<String>) -> bool {
    previous != current
}
