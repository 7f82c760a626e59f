//! Anomaly scoring over a pretrained outlier-detection model.

mod onnx;

pub use onnx::OnnxDetector;

use crate::chaos::ChaosSource;
use crate::error::ModelError;
use crate::features::FeatureVector;
use std::sync::Arc;

/// Opaque pretrained model. Read-only after load and shared across concurrent calls.
pub trait AnomalyModel: Send + Sync {
    /// Decision value for one feature vector; more negative means more anomalous.
    fn decision_value(&self, features: &FeatureVector) -> Result<f64, ModelError>;
}

/// Thin adapter: model decision value plus optional chaos jitter.
pub struct AnomalyScorer {
    model: Arc<dyn AnomalyModel>,
    chaos: Arc<ChaosSource>,
}

impl AnomalyScorer {
    pub fn new(model: Arc<dyn AnomalyModel>, chaos: Arc<ChaosSource>) -> Self {
        Self { model, chaos }
    }

    pub fn score(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let value = self.model.decision_value(features)?;
        if !value.is_finite() {
            return Err(ModelError::NonFinite);
        }
        Ok(value + self.chaos.jitter())
    }
}
