//! Deterministic heuristics over a sanitized event.
//!
//! Rules run in a fixed order and each appends at most one flag:
//! off-hours, unknown device, unknown location, excessive access, privileged misuse.
//! A chaos soft-threat flag, when enabled, is appended after all of them.

use crate::chaos::ChaosSource;
use crate::config::{PrivilegedMatch, RuleConfig};
use crate::event::SanitizedEvent;
use std::sync::Arc;

pub struct RuleEvaluator {
    config: RuleConfig,
    chaos: Arc<ChaosSource>,
}

impl RuleEvaluator {
    pub fn new(config: RuleConfig, chaos: Arc<ChaosSource>) -> Self {
        Self { config, chaos }
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    pub fn evaluate(&self, event: &SanitizedEvent) -> Vec<String> {
        let mut flags = Vec::new();
        let [start, end] = self.config.allowed_hours;

        if !(start..=end).contains(&event.login_hour) {
            flags.push(format!(
                "Login outside working hours (allowed {start:02}:00-{end:02}:59)"
            ));
        }
        if event.device_known == 0 {
            flags.push(format!("Unknown device used ({})", event.device_name));
        }
        if event.location_known == 0 {
            flags.push(format!("Unrecognized location ({})", event.location_name));
        }
        if event.access_count > self.config.max_access {
            flags.push("Excessive access attempts detected".to_string());
        }
        if self.is_privileged(event.role_level)
            && (event.device_known == 0 || event.location_known == 0)
        {
            flags.push(format!("Privileged role misuse ({})", event.role_name));
        }

        if let Some(threat) = self.chaos.soft_threat() {
            flags.push(threat.to_string());
        }
        flags
    }

    fn is_privileged(&self, role_level: u32) -> bool {
        match self.config.privileged_match {
            PrivilegedMatch::AtLeast => role_level >= self.config.privileged_role_level,
            PrivilegedMatch::Exact => role_level == self.config.privileged_role_level,
        }
    }
}
