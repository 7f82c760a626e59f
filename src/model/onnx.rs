//! ONNX Runtime inference. Input: `[1, 5]` f32, output: Isolation Forest decision value.
//! A missing or unloadable artifact is a startup error; there is no no-op mode.

use super::AnomalyModel;
use crate::error::ModelError;
use crate::features::{FeatureVector, FEATURE_DIM};
use ndarray::Array2;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Output name for `decision_function` in converted scikit-learn Isolation Forests.
const SCORES_OUTPUT: &str = "scores";

pub struct OnnxDetector {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxDetector {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| ModelError::Load(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| ModelError::Load(e.to_string()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| ModelError::Load("model declares no inputs".into()))?;
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name == SCORES_OUTPUT)
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| ModelError::Load("model declares no outputs".into()))?;

        info!(path = %path.display(), input = %input_name, output = %output_name, "anomaly model loaded");

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }
}

impl AnomalyModel for OnnxDetector {
    fn decision_value(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let arr = Array2::from_shape_vec((1, FEATURE_DIM), features.as_slice().to_vec())
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        let input = Tensor::from_array(arr).map_err(|e| ModelError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::Inference("session lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| ModelError::Inference(e.to_string()))?;

        let value = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| ModelError::Inference(format!("missing output {}", self.output_name)))?;
        let (_, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        let score = data
            .first()
            .copied()
            .ok_or_else(|| ModelError::Inference("empty output tensor".into()))?;
        Ok(f64::from(score))
    }
}
