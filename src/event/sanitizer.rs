//! RawEvent -> SanitizedEvent. Never fails: every defect resolves to a default.

use super::{
    RawEvent, SanitizedEvent, DEFAULT_ACTION, DEFAULT_DEVICE, DEFAULT_LOCATION, UNKNOWN,
};
use chrono::{DateTime, Local, Timelike, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Keys that must never propagate past sanitization.
pub const FORBIDDEN_KEYS: &[&str] = &["password", "content"];

const USERNAME: &[&str] = &["username", "user", "email"];
const IP_ADDRESS: &[&str] = &["ip_address", "ip", "source_ip"];
const SESSION_ID: &[&str] = &["session_id", "session", "sid"];
const DEVICE_NAME: &[&str] = &["device_name", "device"];
const LOCATION_NAME: &[&str] = &["location_name", "location"];
const ROLE_NAME: &[&str] = &["role_name", "role"];
const ACTION: &[&str] = &["action", "event_type"];

fn is_forbidden(key: &str) -> bool {
    FORBIDDEN_KEYS.iter().any(|f| f.eq_ignore_ascii_case(key))
}

/// First alias whose value is present, non-empty, and not the `Unknown` placeholder.
fn text_field(raw: &RawEvent, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| {
        let text = match raw.get(*alias)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if text.is_empty() || text.eq_ignore_ascii_case(UNKNOWN) {
            None
        } else {
            Some(text)
        }
    })
}

fn int_field(raw: &RawEvent, key: &str) -> Option<i64> {
    match raw.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn flag_field(raw: &RawEvent, key: &str) -> u32 {
    match int_field(raw, key) {
        Some(0) => 0,
        _ => 1,
    }
}

fn count_field(raw: &RawEvent, key: &str) -> u32 {
    int_field(raw, key)
        .filter(|v| *v >= 0)
        .map(|v| v.min(i64::from(u32::MAX)) as u32)
        .unwrap_or(1)
}

/// Sanitize with the current instant as the ingestion timestamp.
pub fn sanitize(raw: &RawEvent) -> SanitizedEvent {
    sanitize_at(raw, Utc::now())
}

/// Sanitize against an explicit ingestion instant; absent `login_hour` becomes its local hour.
pub fn sanitize_at(raw: &RawEvent, now: DateTime<Utc>) -> SanitizedEvent {
    let raw: RawEvent = raw
        .iter()
        .filter(|(k, _)| !is_forbidden(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let current_hour = now.with_timezone(&Local).hour();
    let login_hour = int_field(&raw, "login_hour")
        .filter(|h| (0..=23).contains(h))
        .map(|h| h as u32)
        .unwrap_or(current_hour);

    SanitizedEvent {
        username: text_field(&raw, USERNAME).unwrap_or_else(|| UNKNOWN.to_string()),
        ip_address: text_field(&raw, IP_ADDRESS).unwrap_or_else(|| UNKNOWN.to_string()),
        session_id: text_field(&raw, SESSION_ID)
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
        device_name: text_field(&raw, DEVICE_NAME).unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
        location_name: text_field(&raw, LOCATION_NAME)
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        role_name: text_field(&raw, ROLE_NAME).unwrap_or_else(|| UNKNOWN.to_string()),
        action: text_field(&raw, ACTION).unwrap_or_else(|| DEFAULT_ACTION.to_string()),
        login_hour,
        device_known: flag_field(&raw, "device_known"),
        location_known: flag_field(&raw, "location_known"),
        access_count: count_field(&raw, "access_count"),
        role_level: count_field(&raw, "role_level"),
        timestamp: now,
    }
}
