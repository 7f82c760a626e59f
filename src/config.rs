//! Agent configuration. Loaded once at startup and read-only afterwards.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Data directory (audit database)
    pub data_dir: PathBuf,
    /// Path to the ONNX outlier-detection model
    pub model_path: PathBuf,
    /// Optional standalone rules file; overrides `rules` when set
    pub rules_path: Option<PathBuf>,
    /// Inline rule configuration
    pub rules: RuleConfig,
    /// Risk banding and response policy
    pub policy: RiskPolicy,
    /// Randomized scoring for demos and chaos testing (off by default)
    pub chaos: ChaosConfig,
    /// Audit persistence
    pub audit: AuditConfig,
    pub runtime: RuntimeConfig,
    /// Logging
    pub log: LogConfig,
}

/// How `role_level` is compared against `privileged_role_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivilegedMatch {
    AtLeast,
    Exact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Inclusive working-hours window `[start, end]`
    pub allowed_hours: [u32; 2],
    /// Access count above this is excessive
    pub max_access: u32,
    /// Role level considered privileged
    pub privileged_role_level: u32,
    pub privileged_match: PrivilegedMatch,
}

/// Named constants for the risk formula and the shared band boundaries.
/// Both the risk calculator and the action executor read the same boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    /// Risk points per unit of negative anomaly score
    pub ai_weight: f64,
    /// Risk points per triggered rule
    pub rule_weight: f64,
    /// Rule count that forces the High band
    pub high_rule_count: usize,
    /// Rule count that forces the Medium band
    pub medium_rule_count: usize,
    /// AI risk above this forces High
    pub ai_high_risk: f64,
    /// AI risk above this (and up to `ai_high_risk`) forces Medium
    pub ai_medium_risk: f64,
    /// Highest risk in the Low band
    pub low_max: u8,
    /// Lowest risk in the High band
    pub high_min: u8,
    /// Lowest risk that blocks the session
    pub block_min: u8,
    /// Scores below this add the deviation note to the explanation
    pub anomaly_note_threshold: f64,
    /// Also rotate credentials for Medium-band events
    pub rotate_on_medium: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    pub enabled: bool,
    /// Uniform jitter amplitude added to the anomaly score
    pub score_jitter: f64,
    /// Probability of appending a synthetic soft-threat flag
    pub soft_threat_probability: f64,
    /// Fixed seed for reproducible chaos runs
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Total write attempts per record (first try included)
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    /// Encrypt the sanitized event snapshot at rest
    pub encrypt_events: bool,
    /// Environment variable holding the audit encryption secret
    pub secret_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Events processed concurrently by the binary
    pub max_in_flight: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .map(|d| d.join("trustlens"))
                .unwrap_or_else(|| PathBuf::from(".trustlens")),
            model_path: PathBuf::from("models/isolation_forest.onnx"),
            rules_path: None,
            rules: RuleConfig::default(),
            policy: RiskPolicy::default(),
            chaos: ChaosConfig::default(),
            audit: AuditConfig::default(),
            runtime: RuntimeConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            allowed_hours: [6, 20],
            max_access: 50,
            privileged_role_level: 3,
            privileged_match: PrivilegedMatch::AtLeast,
        }
    }
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            ai_weight: 60.0,
            rule_weight: 20.0,
            high_rule_count: 3,
            medium_rule_count: 2,
            ai_high_risk: 50.0,
            ai_medium_risk: 20.0,
            low_max: 40,
            high_min: 70,
            block_min: 40,
            anomaly_note_threshold: -0.25,
            rotate_on_medium: false,
        }
    }
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            score_jitter: 0.1,
            soft_threat_probability: 0.05,
            seed: None,
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_backoff_ms: 50,
            encrypt_events: true,
            secret_env: "TRUSTLENS_AUDIT_SECRET".to_string(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { max_in_flight: 64 }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl AppConfig {
    /// Load from JSON file if present; otherwise defaults. A file that exists but
    /// does not parse or validate is an error, never silently replaced.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            read_json::<AppConfig>(path)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Rule configuration in effect: the rules file when configured, else the inline section.
    pub fn resolve_rules(&self) -> Result<RuleConfig, ConfigError> {
        let rules = match &self.rules_path {
            Some(path) if !path.exists() => return Err(ConfigError::RulesMissing(path.clone())),
            Some(path) => read_json::<RuleConfig>(path)?,
            None => self.rules.clone(),
        };
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rules.validate()?;
        self.policy.validate()?;
        self.chaos.validate()?;
        if self.audit.max_attempts == 0 {
            return Err(ConfigError::Invalid("audit.max_attempts must be at least 1".into()));
        }
        if self.runtime.max_in_flight == 0 {
            return Err(ConfigError::Invalid("runtime.max_in_flight must be at least 1".into()));
        }
        Ok(())
    }
}

impl RuleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [start, end] = self.allowed_hours;
        if start > end || end > 23 {
            return Err(ConfigError::Invalid(format!(
                "allowed_hours [{start}, {end}] must satisfy start <= end <= 23"
            )));
        }
        Ok(())
    }
}

impl RiskPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Medium needs at least one value between the two boundaries.
        if u16::from(self.low_max) + 2 > u16::from(self.high_min) || self.high_min > 100 {
            return Err(ConfigError::Invalid(format!(
                "band boundaries low_max={} high_min={} must satisfy low_max + 1 < high_min <= 100",
                self.low_max, self.high_min
            )));
        }
        // Every Medium risk must block.
        if u16::from(self.block_min) > u16::from(self.low_max) + 1 {
            return Err(ConfigError::Invalid(format!(
                "block_min={} must not exceed low_max + 1 ({})",
                self.block_min,
                u16::from(self.low_max) + 1
            )));
        }
        if self.ai_medium_risk > self.ai_high_risk {
            return Err(ConfigError::Invalid("ai_medium_risk must not exceed ai_high_risk".into()));
        }
        if self.medium_rule_count > self.high_rule_count {
            return Err(ConfigError::Invalid(
                "medium_rule_count must not exceed high_rule_count".into(),
            ));
        }
        Ok(())
    }
}

impl ChaosConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.soft_threat_probability) {
            return Err(ConfigError::Invalid(
                "chaos.soft_threat_probability must be within [0, 1]".into(),
            ));
        }
        if !self.score_jitter.is_finite() || self.score_jitter < 0.0 {
            return Err(ConfigError::Invalid("chaos.score_jitter must be non-negative".into()));
        }
        Ok(())
    }
}
