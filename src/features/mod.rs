//! Model input features extracted from a sanitized event.

use crate::event::SanitizedEvent;
use serde::{Deserialize, Serialize};

/// Number of features the outlier model was trained on.
pub const FEATURE_DIM: usize = 5;

/// Fixed-order feature vector:
/// `[login_hour, device_known, location_known, access_count, role_level]`.
/// The order must match the training data of the model artifact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub values: [f32; FEATURE_DIM],
}

impl FeatureVector {
    pub fn new(values: [f32; FEATURE_DIM]) -> Self {
        Self { values }
    }

    pub fn from_event(event: &SanitizedEvent) -> Self {
        Self::new([
            event.login_hour as f32,
            event.device_known as f32,
            event.location_known as f32,
            event.access_count as f32,
            event.role_level as f32,
        ])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}
