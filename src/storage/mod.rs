//! Append-only audit trail of processed events.

mod encrypted;

pub use encrypted::{SqliteAuditStore, StoredAudit};

use crate::error::AuditError;
use crate::event::SanitizedEvent;
use crate::response::ActionOutcome;
use crate::risk::RiskAssessment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable summary of one processed event. Created once, never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event: SanitizedEvent,
    pub assessment: RiskAssessment,
    pub reasons: Vec<String>,
    pub outcome: ActionOutcome,
    pub recorded_at: DateTime<Utc>,
}

/// Durable write contract. One successful `persist` is one atomic append.
pub trait AuditSink: Send + Sync {
    fn persist(&self, record: &AuditRecord) -> Result<(), AuditError>;
}
