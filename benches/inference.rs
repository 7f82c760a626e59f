//! Scoring benchmark: feature extraction, rule evaluation, and risk banding for one event.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use std::sync::Arc;
use trustlens::chaos::ChaosSource;
use trustlens::config::{RiskPolicy, RuleConfig};
use trustlens::error::ModelError;
use trustlens::{sanitize, AnomalyModel, AnomalyScorer, FeatureVector, RiskCalculator, RuleEvaluator};

struct ConstantModel;

impl AnomalyModel for ConstantModel {
    fn decision_value(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        Ok(0.1 - f64::from(features.values[3]) / 100.0)
    }
}

fn bench_score_and_rules(c: &mut Criterion) {
    let raw = json!({
        "username": "bench",
        "login_hour": 2,
        "device_known": 0,
        "location_known": 1,
        "access_count": 25,
        "role_level": 3,
    });
    let raw = raw.as_object().cloned().unwrap_or_default();
    let event = sanitize(&raw);
    let chaos = Arc::new(ChaosSource::disabled());
    let scorer = AnomalyScorer::new(Arc::new(ConstantModel), chaos.clone());
    let rules = RuleEvaluator::new(RuleConfig::default(), chaos);
    let calc = RiskCalculator::new(RiskPolicy::default());

    c.bench_function("sanitize_event", |b| b.iter(|| sanitize(black_box(&raw))));

    c.bench_function("score_rules_and_band", |b| {
        b.iter(|| {
            let fv = FeatureVector::from_event(black_box(&event));
            let score = scorer.score(&fv).unwrap_or(0.0);
            let flags = rules.evaluate(&event);
            black_box(calc.assess(score, flags.len()))
        })
    });
}

criterion_group!(benches, bench_score_and_rules);
criterion_main!(benches);
