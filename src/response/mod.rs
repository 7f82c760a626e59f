//! Automated response: verify, block, or block and rotate credentials.

use crate::config::RiskPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub verified: bool,
    pub blocked: bool,
    pub credentials_rotated: bool,
}

impl ActionOutcome {
    pub const VERIFY: Self = Self {
        verified: true,
        blocked: false,
        credentials_rotated: false,
    };
    pub const BLOCK: Self = Self {
        verified: false,
        blocked: true,
        credentials_rotated: false,
    };
    pub const BLOCK_AND_ROTATE: Self = Self {
        verified: false,
        blocked: true,
        credentials_rotated: true,
    };

    /// Operator-facing follow-up for this outcome.
    pub fn recommended_action(&self) -> &'static str {
        if self.credentials_rotated {
            "Rotate credentials and verify user"
        } else if self.blocked {
            "Monitor activity closely"
        } else {
            "No action required"
        }
    }
}

/// Maps a final risk percentage to its response. Rotation starts at the High band
/// boundary; blocking starts at `block_min`, which never lies above the Medium band.
pub struct ActionExecutor {
    policy: RiskPolicy,
}

impl ActionExecutor {
    pub fn new(policy: RiskPolicy) -> Self {
        Self { policy }
    }

    pub fn decide(&self, risk: u8) -> ActionOutcome {
        let p = &self.policy;
        if risk >= p.high_min || (p.rotate_on_medium && risk > p.low_max) {
            ActionOutcome::BLOCK_AND_ROTATE
        } else if risk >= p.block_min {
            ActionOutcome::BLOCK
        } else {
            ActionOutcome::VERIFY
        }
    }
}
