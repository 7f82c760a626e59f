//! Injectable randomness for demos and chaos testing. Disabled by default, in which
//! case every call is a no-op and scoring stays fully deterministic.

use crate::config::ChaosConfig;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

pub const SOFT_THREATS: &[&str] = &[
    "Suspicious rapid login attempts",
    "Unusual access pattern detected",
    "Abnormal role behavior observed",
];

pub struct ChaosSource {
    config: ChaosConfig,
    rng: Option<Mutex<StdRng>>,
}

impl ChaosSource {
    pub fn new(config: ChaosConfig) -> Self {
        let rng = config.enabled.then(|| {
            let rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            Mutex::new(rng)
        });
        Self { config, rng }
    }

    pub fn disabled() -> Self {
        Self::new(ChaosConfig::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.rng.is_some()
    }

    /// Uniform offset in `[-score_jitter, score_jitter]`; 0.0 when disabled.
    pub fn jitter(&self) -> f64 {
        let amplitude = self.config.score_jitter;
        if amplitude <= 0.0 {
            return 0.0;
        }
        match self.rng.as_ref().and_then(|m| m.lock().ok()) {
            Some(mut rng) => rng.gen_range(-amplitude..=amplitude),
            None => 0.0,
        }
    }

    /// Occasionally yields a synthetic soft-threat flag; never when disabled.
    pub fn soft_threat(&self) -> Option<&'static str> {
        let mut rng = self.rng.as_ref()?.lock().ok()?;
        if rng.gen_bool(self.config.soft_threat_probability) {
            SOFT_THREATS.choose(&mut *rng).copied()
        } else {
            None
        }
    }
}

impl Default for ChaosSource {
    fn default() -> Self {
        Self::disabled()
    }
}
