//! Login/access events: the untyped inbound mapping and its sanitized, canonical form.

mod sanitizer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use sanitizer::{sanitize, sanitize_at, FORBIDDEN_KEYS};

/// Unvalidated inbound event. Any shape is accepted; may carry secrets.
pub type RawEvent = serde_json::Map<String, serde_json::Value>;

/// Placeholder for unresolved identity fields. The only placeholder allowed to persist.
pub const UNKNOWN: &str = "Unknown";
pub const DEFAULT_ACTION: &str = "login";
pub const DEFAULT_DEVICE: &str = "Windows Laptop";
pub const DEFAULT_LOCATION: &str = "Kisumu Office";

/// Normalized, privacy-safe event used for scoring and audit.
/// Fixed field set: forbidden keys cannot be represented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanitizedEvent {
    pub username: String,
    pub ip_address: String,
    pub session_id: String,
    pub device_name: String,
    pub location_name: String,
    pub role_name: String,
    pub action: String,
    /// 0..=23
    pub login_hour: u32,
    /// 0 or 1
    pub device_known: u32,
    /// 0 or 1
    pub location_known: u32,
    pub access_count: u32,
    pub role_level: u32,
    pub timestamp: DateTime<Utc>,
}

impl SanitizedEvent {
    /// Back to an open mapping, e.g. for re-sanitizing or audit serialization.
    pub fn to_raw(&self) -> RawEvent {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => RawEvent::new(),
        }
    }
}
