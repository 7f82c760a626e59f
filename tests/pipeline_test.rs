//! End-to-end pipeline scenarios with substituted model and audit sink.

use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use trustlens::{
    config::{AuditConfig, ChaosConfig},
    config::RiskPolicy,
    error::{AuditError, ConfigError, ModelError},
    pipeline::{Pipeline, PipelineSettings, FAIL_CLOSED_NOTE},
    risk::{RiskBand, ANOMALY_NOTE, NORMAL_ACTIVITY},
    storage::{AuditRecord, AuditSink, SqliteAuditStore},
    AnomalyModel, FeatureVector, RawEvent,
};

struct FixedModel(f64);

impl AnomalyModel for FixedModel {
    fn decision_value(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
        Ok(self.0)
    }
}

struct FailingModel;

impl AnomalyModel for FailingModel {
    fn decision_value(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
        Err(ModelError::Inference("session crashed".into()))
    }
}

/// Records the feature vector it was asked to score.
struct CapturingModel(Mutex<Vec<FeatureVector>>);

impl AnomalyModel for CapturingModel {
    fn decision_value(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        self.0.lock().unwrap().push(*features);
        Ok(0.1)
    }
}

#[derive(Default)]
struct RecordingSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl AuditSink for RecordingSink {
    fn persist(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Fails the first `failures` writes, then succeeds.
struct FlakySink {
    failures: u32,
    calls: AtomicU32,
    inner: RecordingSink,
}

impl FlakySink {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
            inner: RecordingSink::default(),
        }
    }
}

impl AuditSink for FlakySink {
    fn persist(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(AuditError::Poisoned);
        }
        self.inner.persist(record)
    }
}

fn raw(value: serde_json::Value) -> RawEvent {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("test event must be an object"),
    }
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        audit: AuditConfig {
            retry_backoff_ms: 0,
            ..AuditConfig::default()
        },
        ..PipelineSettings::default()
    }
}

fn pipeline(score: f64, sink: Arc<dyn AuditSink>) -> Pipeline {
    Pipeline::new(settings(), Arc::new(FixedModel(score)), sink).unwrap()
}

#[test]
fn normal_login_is_verified() {
    let sink = Arc::new(RecordingSink::default());
    let p = pipeline(0.1, sink.clone());
    let v = p.process_event(&raw(json!({
        "login_hour": 10,
        "device_known": 1,
        "location_known": 1,
        "access_count": 3,
        "role_level": 1,
    })));
    assert!(v.risk <= 40);
    assert_eq!(v.band, RiskBand::Low);
    assert!(v.verified && !v.blocked && !v.credentials_rotated);
    assert_eq!(v.reasons, vec![NORMAL_ACTIVITY]);
    assert_eq!(v.recommended_action, "No action required");
    assert_eq!(sink.records.lock().unwrap().len(), 1);
}

#[test]
fn privileged_off_hours_login_is_blocked_and_rotated() {
    let p = pipeline(0.0, Arc::new(RecordingSink::default()));
    let v = p.process_event(&raw(json!({
        "login_hour": 2,
        "device_known": 0,
        "location_known": 0,
        "access_count": 25,
        "role_level": 3,
    })));
    assert_eq!(v.reasons.len(), 4);
    assert!(v.risk >= 70);
    assert_eq!(v.band, RiskBand::High);
    assert!(v.blocked && v.credentials_rotated && !v.verified);
    assert_eq!(v.recommended_action, "Rotate credentials and verify user");
}

#[test]
fn risk_at_block_threshold_is_blocked() {
    // one off-hours rule (20) plus a -1/3 score (20) lands exactly on 40
    let sink = Arc::new(RecordingSink::default());
    let p = pipeline(-1.0 / 3.0, sink.clone());
    let v = p.process_event(&raw(json!({ "login_hour": 23 })));
    assert_eq!(v.risk, 40);
    assert_eq!(v.band, RiskBand::Low);
    assert!(v.blocked && !v.verified && !v.credentials_rotated);
    assert_eq!(v.recommended_action, "Monitor activity closely");
    assert!(sink.records.lock().unwrap()[0].outcome.blocked);
}

#[test]
fn invalid_chaos_probability_is_rejected() {
    let settings = PipelineSettings {
        chaos: ChaosConfig {
            enabled: true,
            soft_threat_probability: 1.5,
            ..ChaosConfig::default()
        },
        ..settings()
    };
    let result = Pipeline::new(settings, Arc::new(FixedModel(0.1)), Arc::new(RecordingSink::default()));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn empty_medium_band_is_rejected() {
    let settings = PipelineSettings {
        policy: RiskPolicy {
            low_max: 69,
            high_min: 70,
            block_min: 40,
            ..RiskPolicy::default()
        },
        ..settings()
    };
    let result = Pipeline::new(settings, Arc::new(FixedModel(0.1)), Arc::new(RecordingSink::default()));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn excessive_access_with_mild_anomaly_is_blocked_only() {
    let p = pipeline(-0.375, Arc::new(RecordingSink::default()));
    let v = p.process_event(&raw(json!({
        "login_hour": 10,
        "device_known": 1,
        "location_known": 1,
        "access_count": 60,
        "role_level": 1,
    })));
    assert_eq!(
        v.reasons,
        vec!["Excessive access attempts detected", ANOMALY_NOTE]
    );
    assert!((41..=69).contains(&v.risk), "risk {}", v.risk);
    assert!(v.blocked && !v.credentials_rotated && !v.verified);
}

#[test]
fn secrets_never_reach_audit_sink() {
    let sink = Arc::new(RecordingSink::default());
    let p = pipeline(0.1, sink.clone());
    p.process_event(&raw(json!({
        "username": "edward.l",
        "password": "secret-pass-123",
        "content": "mail body",
        "login_hour": 11,
    })));
    let records = sink.records.lock().unwrap();
    let json = serde_json::to_value(&records[0]).unwrap();
    let event = json["event"].as_object().unwrap();
    assert!(!event.contains_key("password"));
    assert!(!event.contains_key("content"));
    let text = json.to_string();
    assert!(!text.contains("secret-pass-123"));
    assert!(!text.contains("mail body"));
    assert_eq!(records[0].event.username, "edward.l");
}

#[test]
fn empty_event_completes_with_reasons() {
    let sink = Arc::new(RecordingSink::default());
    let p = pipeline(0.1, sink.clone());
    let v = p.process_event(&RawEvent::new());
    assert!(!v.reasons.is_empty());
    assert!(v.reasons.iter().all(|r| !r.trim().is_empty()));
    assert!(!v.session_id.is_empty());
    let records = sink.records.lock().unwrap();
    assert_eq!(records[0].event.session_id, v.session_id);
    assert_eq!(records[0].event.device_name, "Windows Laptop");
}

#[test]
fn model_receives_features_in_training_order() {
    let model = Arc::new(CapturingModel(Mutex::new(Vec::new())));
    let p = Pipeline::new(settings(), model.clone(), Arc::new(RecordingSink::default())).unwrap();
    p.process_event(&raw(json!({
        "login_hour": 14,
        "device_known": 0,
        "location_known": 1,
        "access_count": 7,
        "role_level": 2,
    })));
    let seen = model.0.lock().unwrap();
    assert_eq!(seen[0].values, [14.0, 0.0, 1.0, 7.0, 2.0]);
}

#[test]
fn model_failure_fails_closed() {
    let sink = Arc::new(RecordingSink::default());
    let p = Pipeline::new(settings(), Arc::new(FailingModel), sink.clone()).unwrap();
    let v = p.process_event(&raw(json!({ "login_hour": 10 })));
    assert_eq!(v.risk, 100);
    assert_eq!(v.band, RiskBand::High);
    assert!(v.blocked && v.credentials_rotated);
    assert_eq!(v.reasons, vec![FAIL_CLOSED_NOTE]);
    assert_eq!(sink.records.lock().unwrap()[0].assessment.risk, 100);
}

#[test]
fn non_finite_score_fails_closed() {
    let p = pipeline(f64::NAN, Arc::new(RecordingSink::default()));
    let v = p.process_event(&raw(json!({ "login_hour": 3 })));
    assert_eq!(v.risk, 100);
    assert_eq!(v.reasons.last().map(String::as_str), Some(FAIL_CLOSED_NOTE));
    assert_eq!(v.reasons.len(), 2);
}

#[test]
fn audit_failure_is_retried() {
    let sink = Arc::new(FlakySink::new(1));
    let p = pipeline(0.1, sink.clone());
    let v = p.process_event(&raw(json!({ "login_hour": 10 })));
    assert!(v.verified);
    assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    assert_eq!(sink.inner.records.lock().unwrap().len(), 1);
    assert_eq!(p.audit_failures(), 0);
}

#[test]
fn audit_loss_still_returns_verdict_and_is_counted() {
    let sink = Arc::new(FlakySink::new(u32::MAX));
    let p = pipeline(0.1, sink.clone());
    let v = p.process_event(&raw(json!({ "login_hour": 10 })));
    assert!(v.verified);
    assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    assert_eq!(p.audit_failures(), 1);
}

#[test]
fn default_scoring_is_deterministic() {
    let p = pipeline(-0.5, Arc::new(RecordingSink::default()));
    let event = raw(json!({
        "session_id": "fixed",
        "login_hour": 21,
        "access_count": 9,
    }));
    let first = p.process_event(&event);
    for _ in 0..20 {
        assert_eq!(p.process_event(&event), first);
    }
}

#[test]
fn chaos_soft_threat_is_appended_after_rules() {
    let settings = PipelineSettings {
        chaos: ChaosConfig {
            enabled: true,
            score_jitter: 0.0,
            soft_threat_probability: 1.0,
            seed: Some(7),
        },
        ..settings()
    };
    let p = Pipeline::new(settings, Arc::new(FixedModel(0.1)), Arc::new(RecordingSink::default()))
        .unwrap();
    let v = p.process_event(&raw(json!({ "login_hour": 23 })));
    assert_eq!(v.reasons.len(), 2);
    assert!(v.reasons[0].starts_with("Login outside working hours"));
    assert!(trustlens::chaos::SOFT_THREATS.contains(&v.reasons[1].as_str()));
    assert_eq!(v.band, RiskBand::Medium);
}

#[test]
fn concurrent_events_each_append_one_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        SqliteAuditStore::open(&dir.path().join("audit.db"), Some(b"k".as_slice())).unwrap(),
    );
    let p = Arc::new(pipeline(0.1, store.clone()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let p = p.clone();
            std::thread::spawn(move || {
                for j in 0..5 {
                    p.process_event(&raw(json!({
                        "session_id": format!("s-{i}-{j}"),
                        "login_hour": 9,
                    })));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let records = store.recent(100).unwrap();
    assert_eq!(records.len(), 40);
    assert!(records.iter().all(|r| r.record.outcome.verified));
    assert_eq!(p.audit_failures(), 0);
}
