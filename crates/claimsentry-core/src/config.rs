//! Detection thresholds and the run window.
//!
//! `DetectionConfig` is passed into [`Engine::new`](crate::Engine::new) once per
//! run. Every field has a default, so a partial JSON document (or none at all)
//! is enough to build one.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::EngineError;

pub const DEFAULT_WINDOW_DAYS: u32 = 90;
pub const DEFAULT_T2_TOLERANCE_PCT: f64 = 0.0;
pub const DEFAULT_T3_MIN_ACTS_7D: usize = 4;
pub const DEFAULT_T3_MIN_POSITIVE_VARIANCE_7D: usize = 2;
pub const DEFAULT_T4_MIN_STRUCTURES_PER_DAY: usize = 2;

/// Length of the trailing collusion window anchored at each act.
pub const COLLUSION_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// How far back the raw snapshot reaches, in days.
    pub window_days: u32,
    /// T2 tolerance as a fraction of the tariff (0.10 = 10%).
    pub t2_tolerance_pct: f64,
    /// T3: minimum acts inside one 7-day window.
    pub t3_min_acts_7d: usize,
    /// T3: minimum acts with a strictly positive variance inside that window.
    pub t3_min_positive_variance_7d: usize,
    /// T4: minimum distinct structures visited by one beneficiary on one day.
    pub t4_min_structures_per_day: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            t2_tolerance_pct: DEFAULT_T2_TOLERANCE_PCT,
            t3_min_acts_7d: DEFAULT_T3_MIN_ACTS_7D,
            t3_min_positive_variance_7d: DEFAULT_T3_MIN_POSITIVE_VARIANCE_7D,
            t4_min_structures_per_day: DEFAULT_T4_MIN_STRUCTURES_PER_DAY,
        }
    }
}

impl DetectionConfig {
    /// Parse a JSON document; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.window_days == 0 {
            return Err(EngineError::InvalidConfig(
                "window_days must be at least 1".into(),
            ));
        }
        if !self.t2_tolerance_pct.is_finite() || self.t2_tolerance_pct <= -1.0 {
            return Err(EngineError::InvalidConfig(format!(
                "t2_tolerance_pct must be a finite number above -1, got {}",
                self.t2_tolerance_pct
            )));
        }
        for (name, value) in [
            ("t3_min_acts_7d", self.t3_min_acts_7d),
            ("t3_min_positive_variance_7d", self.t3_min_positive_variance_7d),
            ("t4_min_structures_per_day", self.t4_min_structures_per_day),
        ] {
            if value == 0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be at least 1"
                )));
            }
        }
        Ok(())
    }

    /// Lower bound on care dates for a run executed on `today`.
    pub fn window_start(&self, today: NaiveDate) -> NaiveDate {
        today - Duration::days(i64::from(self.window_days))
    }
}
