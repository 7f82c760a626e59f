//! Event processing: sanitize -> score + rules -> risk -> reasons -> action -> audit.
//!
//! The pipeline holds only read-only state (model, rules, policy) plus the audit sink,
//! so one instance is shared across concurrent invocations behind an `Arc`.

use crate::chaos::ChaosSource;
use crate::config::{AppConfig, AuditConfig, ChaosConfig, RiskPolicy, RuleConfig};
use crate::error::ConfigError;
use crate::event::{sanitize, RawEvent};
use crate::features::FeatureVector;
use crate::model::{AnomalyModel, AnomalyScorer};
use crate::response::ActionExecutor;
use crate::risk::{ExplanationGenerator, RiskAssessment, RiskBand, RiskCalculator};
use crate::rules::RuleEvaluator;
use crate::storage::{AuditRecord, AuditSink};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Reason attached when the model cannot score an event.
pub const FAIL_CLOSED_NOTE: &str = "Anomaly scoring unavailable; event treated as high risk";

/// Result returned to the caller for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventVerdict {
    pub session_id: String,
    pub risk: u8,
    pub band: RiskBand,
    pub verified: bool,
    pub blocked: bool,
    pub credentials_rotated: bool,
    pub reasons: Vec<String>,
    pub recommended_action: String,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub rules: RuleConfig,
    pub policy: RiskPolicy,
    pub chaos: ChaosConfig,
    pub audit: AuditConfig,
}

impl PipelineSettings {
    /// Settings from the app config, with the rule set already resolved.
    pub fn from_config(config: &AppConfig, rules: RuleConfig) -> Self {
        Self {
            rules,
            policy: config.policy.clone(),
            chaos: config.chaos.clone(),
            audit: config.audit.clone(),
        }
    }

    /// Rejects settings that would make scoring panic or misclassify.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rules.validate()?;
        self.policy.validate()?;
        self.chaos.validate()?;
        if self.audit.max_attempts == 0 {
            return Err(ConfigError::Invalid("audit.max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

pub struct Pipeline {
    scorer: AnomalyScorer,
    rules: RuleEvaluator,
    calculator: RiskCalculator,
    explainer: ExplanationGenerator,
    executor: ActionExecutor,
    sink: Arc<dyn AuditSink>,
    audit: AuditConfig,
    audit_failures: AtomicU64,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        model: Arc<dyn AnomalyModel>,
        sink: Arc<dyn AuditSink>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let chaos = Arc::new(ChaosSource::new(settings.chaos));
        if chaos.is_enabled() {
            warn!("chaos scoring enabled; results are not reproducible");
        }
        Ok(Self {
            scorer: AnomalyScorer::new(model, chaos.clone()),
            rules: RuleEvaluator::new(settings.rules, chaos),
            calculator: RiskCalculator::new(settings.policy.clone()),
            explainer: ExplanationGenerator::new(settings.policy.anomaly_note_threshold),
            executor: ActionExecutor::new(settings.policy),
            sink,
            audit: settings.audit,
            audit_failures: AtomicU64::new(0),
        })
    }

    /// Audit records lost after exhausting retries since startup.
    pub fn audit_failures(&self) -> u64 {
        self.audit_failures.load(Ordering::Relaxed)
    }

    /// Score one event. Never fails: input defects become defaults, model defects fail
    /// closed, audit defects are logged and counted.
    pub fn process_event(&self, raw: &RawEvent) -> EventVerdict {
        let event = sanitize(raw);
        let flags = self.rules.evaluate(&event);
        let features = FeatureVector::from_event(&event);

        let (assessment, reasons) = match self.scorer.score(&features) {
            Ok(score) => (
                self.calculator.assess(score, flags.len()),
                self.explainer.explain(score, &flags),
            ),
            Err(e) => {
                error!(session_id = %event.session_id, error = %e, "anomaly scoring failed; failing closed");
                let mut reasons = flags.clone();
                reasons.push(FAIL_CLOSED_NOTE.to_string());
                (RiskAssessment::new(100, self.calculator.policy()), reasons)
            }
        };
        let outcome = self.executor.decide(assessment.risk);

        if outcome.verified {
            debug!(session_id = %event.session_id, risk = assessment.risk, "event verified");
        } else {
            info!(
                session_id = %event.session_id,
                risk = assessment.risk,
                band = assessment.band.as_str(),
                blocked = outcome.blocked,
                credentials_rotated = outcome.credentials_rotated,
                "risk result"
            );
        }

        let verdict = EventVerdict {
            session_id: event.session_id.clone(),
            risk: assessment.risk,
            band: assessment.band,
            verified: outcome.verified,
            blocked: outcome.blocked,
            credentials_rotated: outcome.credentials_rotated,
            reasons: reasons.clone(),
            recommended_action: outcome.recommended_action().to_string(),
        };

        self.record(&AuditRecord {
            event,
            assessment,
            reasons,
            outcome,
            recorded_at: Utc::now(),
        });
        verdict
    }

    fn record(&self, record: &AuditRecord) {
        let attempts = self.audit.max_attempts;
        for attempt in 1..=attempts {
            match self.sink.persist(record) {
                Ok(()) => return,
                Err(e) if attempt < attempts => {
                    warn!(attempt, error = %e, "audit write failed; retrying");
                    std::thread::sleep(Duration::from_millis(self.audit.retry_backoff_ms));
                }
                Err(e) => {
                    self.audit_failures.fetch_add(1, Ordering::Relaxed);
                    error!(
                        session_id = %record.event.session_id,
                        attempts,
                        error = %e,
                        "audit record lost"
                    );
                }
            }
        }
    }
}
