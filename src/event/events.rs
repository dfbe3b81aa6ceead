use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Serialized event as cached and written to subscribers.
///
/// Immutable once built, so fan-out only bumps a reference count.
pub type SerializedEvent = Arc<str>;

/// Event categories known to the hub
///
/// Topics carry the policy that decides whether an event is debounced and
/// whether it has a "latest state" worth replaying to late subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A monitored site changed status (flaps, so it is debounced per widget)
    MonitorSiteChanged,
    /// A custom API widget fetched new data
    CustomApiDataChanged,
    /// A page was re-rendered
    PageUpdate,
    /// Any other tag, forwarded as-is and never cached
    Other(String),
}

impl Topic {
    pub fn as_str(&self) -> &str {
        match self {
            Topic::MonitorSiteChanged => "monitor:site_changed",
            Topic::CustomApiDataChanged => "custom-api:data_changed",
            Topic::PageUpdate => "page:update",
            Topic::Other(tag) => tag.as_str(),
        }
    }

    /// Whether repeated events for the same entity are suppressed within the cooldown
    pub fn is_debounced(&self) -> bool {
        matches!(self, Topic::MonitorSiteChanged)
    }

    /// Derives the recent-event cache key for a payload, if this topic is cacheable
    pub fn cache_key(&self, data: &Value) -> Option<String> {
        match self {
            Topic::MonitorSiteChanged | Topic::CustomApiDataChanged => {
                EntityId::from_payload(data).map(|id| format!("{}|{}", self.as_str(), id))
            }
            Topic::PageUpdate => data
                .get("slug")
                .and_then(Value::as_str)
                .map(|slug| format!("{}|{}", self.as_str(), slug)),
            Topic::Other(_) => None,
        }
    }
}

impl From<&str> for Topic {
    fn from(tag: &str) -> Self {
        match tag {
            "monitor:site_changed" => Topic::MonitorSiteChanged,
            "custom-api:data_changed" => Topic::CustomApiDataChanged,
            "page:update" => Topic::PageUpdate,
            other => Topic::Other(other.to_string()),
        }
    }
}

impl From<String> for Topic {
    fn from(tag: String) -> Self {
        Topic::from(tag.as_str())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical identifier of the widget an event is about
///
/// Producers hand over loosely-typed payloads, so the same widget may show up
/// as `7`, `7.0` or `"7"`. All of these normalize to `EntityId(7)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Field of the payload that holds the widget identifier
    pub const FIELD: &'static str = "widget_id";

    /// Extracts the entity id from the `widget_id` field of an object payload
    pub fn from_payload(data: &Value) -> Option<Self> {
        data.get(Self::FIELD).and_then(Self::from_value)
    }

    /// Normalizes a single JSON value into an entity id.
    ///
    /// Accepted shapes:
    /// - non-negative integers
    /// - finite, non-negative floats without a fractional part
    /// - strings holding either of the above, surrounding whitespace ignored
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => {
                if let Some(id) = number.as_u64() {
                    return Some(EntityId(id));
                }
                if number.is_i64() {
                    return None;
                }
                number.as_f64().and_then(Self::from_f64)
            }
            Value::String(text) => Self::from_text(text),
            _ => None,
        }
    }

    fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(id) = text.parse::<u64>() {
            return Some(EntityId(id));
        }
        text.parse::<f64>().ok().and_then(Self::from_f64)
    }

    fn from_f64(value: f64) -> Option<Self> {
        // u64::MAX as f64 rounds up to 2^64, so the bound is exclusive
        if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value < u64::MAX as f64 {
            Some(EntityId(value as u64))
        } else {
            None
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Envelope written to subscribers for every published event
#[derive(Debug, Clone, Serialize)]
pub struct Event<'a> {
    #[serde(rename = "type")]
    pub event_type: &'a str,
    /// Unix timestamp in seconds
    pub time: i64,
    pub data: &'a Value,
}

impl<'a> Event<'a> {
    pub fn now(topic: &'a Topic, data: &'a Value) -> Self {
        Self {
            event_type: topic.as_str(),
            time: Utc::now().timestamp(),
            data,
        }
    }

    pub fn to_serialized(&self) -> Result<SerializedEvent, serde_json::Error> {
        serde_json::to_string(self).map(SerializedEvent::from)
    }
}
