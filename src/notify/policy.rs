use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Lookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Widget types that send their own tailored notifications
const DEDICATED_NOTIFICATION_TYPES: [&str; 5] =
    ["monitor", "rss", "reddit", "videos", "custom-api"];

/// Decides whether notifications are enabled for a widget type
///
/// Each type has its own switch (`NOTIFY_MONITOR`, `NOTIFY_RSS`, ...) with
/// `NOTIFY_ALL` as the fallback when the specific switch is unset.
#[derive(Clone)]
pub struct NotificationPolicy {
    lookup: Arc<Lookup>,
}

impl NotificationPolicy {
    /// Reads switches from the process environment on every check
    pub fn from_env() -> Self {
        Self {
            lookup: Arc::new(|key| std::env::var(key).ok()),
        }
    }

    /// Uses a fixed set of switches
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            lookup: Arc::new(move |key| vars.get(key).cloned()),
        }
    }

    pub fn enabled_for_widget(&self, widget_type: &str) -> bool {
        let specific =
            switch_for_widget(widget_type).and_then(|key| (self.lookup)(key.as_str()));
        specific
            .or_else(|| (self.lookup)("NOTIFY_ALL"))
            .map(|value| parse_switch(&value))
            .unwrap_or(false)
    }
}

impl fmt::Debug for NotificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationPolicy").finish_non_exhaustive()
    }
}

/// Name of the environment switch for a widget type, `None` for an empty type
pub fn switch_for_widget(widget_type: &str) -> Option<String> {
    let key = match widget_type {
        "" => return None,
        "videos" => "NOTIFY_YOUTUBE".to_string(),
        "monitor" => "NOTIFY_MONITOR".to_string(),
        "rss" => "NOTIFY_RSS".to_string(),
        "reddit" => "NOTIFY_REDDIT".to_string(),
        "custom-api" => "NOTIFY_CUSTOM_API".to_string(),
        other => format!("NOTIFY_{}", other.replace('-', "_").to_uppercase()),
    };
    Some(key)
}

/// Parses a boolean switch; unrecognized values count as off
pub fn parse_switch(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Whether a widget type relies on generic "content changed" notifications
pub fn uses_generic_notifications(widget_type: &str) -> bool {
    !DEDICATED_NOTIFICATION_TYPES.contains(&widget_type)
}
