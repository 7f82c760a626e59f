//! Risk scoring: calibrated percentage, band, and explanation.

mod engine;
mod explain;

pub use engine::{RiskAssessment, RiskBand, RiskCalculator};
pub use explain::{ExplanationGenerator, ANOMALY_NOTE, NORMAL_ACTIVITY};
