//! TrustLens agent: risk scoring for login and access events.
//!
//! Modular structure:
//! - [`event`] — Raw event normalization into a privacy-safe canonical form
//! - [`features`] — Model feature vector
//! - [`model`] — ONNX outlier-detection scoring
//! - [`rules`] — Deterministic heuristics
//! - [`risk`] — Banded risk percentage and explanations
//! - [`response`] — Verify / block / rotate-credentials decision
//! - [`storage`] — Append-only audit trail
//! - [`pipeline`] — End-to-end orchestration
//! - [`logging`] — Structured logging

pub mod chaos;
pub mod config;
pub mod error;
pub mod event;
pub mod features;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod response;
pub mod risk;
pub mod rules;
pub mod storage;

pub use config::AppConfig;
pub use event::{sanitize, RawEvent, SanitizedEvent};
pub use features::FeatureVector;
pub use logging::StructuredLogger;
pub use model::{AnomalyModel, AnomalyScorer, OnnxDetector};
pub use pipeline::{EventVerdict, Pipeline, PipelineSettings};
pub use response::{ActionExecutor, ActionOutcome};
pub use risk::{ExplanationGenerator, RiskAssessment, RiskBand, RiskCalculator};
pub use rules::RuleEvaluator;
pub use storage::{AuditRecord, AuditSink, SqliteAuditStore};
