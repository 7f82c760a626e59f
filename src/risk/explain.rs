//! Human-readable reasons for a risk decision. Never empty: consumers display them unconditionally.

pub const ANOMALY_NOTE: &str = "Behavior deviates from normal usage pattern";
pub const NORMAL_ACTIVITY: &str = "Normal login activity detected";

pub struct ExplanationGenerator {
    note_threshold: f64,
}

impl ExplanationGenerator {
    pub fn new(note_threshold: f64) -> Self {
        Self { note_threshold }
    }

    /// Rule flags in evaluation order, then the anomaly note, else the fallback.
    pub fn explain(&self, score: f64, rule_flags: &[String]) -> Vec<String> {
        let mut reasons: Vec<String> = rule_flags
            .iter()
            .filter(|f| !f.trim().is_empty())
            .cloned()
            .collect();

        if score < self.note_threshold {
            reasons.push(ANOMALY_NOTE.to_string());
        }
        if reasons.is_empty() {
            reasons.push(NORMAL_ACTIVITY.to_string());
        }
        reasons
    }
}
