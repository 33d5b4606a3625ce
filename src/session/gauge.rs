//! Morale gauge: a bounded score that drops on every rejected draft and
//! partially recovers when the last reviewer signs off.

use serde::{Deserialize, Serialize};

pub const GAUGE_MAX: u32 = 100;
/// Points lost on every non-advancing review.
pub const FAILURE_PENALTY: u32 = 10;
/// Points regained when QA approves.
pub const COMPLETION_BONUS: u32 = 20;
/// Below this value the UI shows a low-morale warning.
pub const LOW_MORALE_THRESHOLD: u32 = 30;

/// Integer gauge clamped to `[0, 100]`.
///
/// Deserializing an out-of-range value clamps it rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct MoraleGauge(u32);

impl Default for MoraleGauge {
    fn default() -> Self {
        Self(GAUGE_MAX)
    }
}

impl From<u32> for MoraleGauge {
    fn from(value: u32) -> Self {
        Self(value.min(GAUGE_MAX))
    }
}

impl From<MoraleGauge> for u32 {
    fn from(gauge: MoraleGauge) -> Self {
        gauge.0
    }
}

impl MoraleGauge {
    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn reduce(&mut self, amount: u32) {
        self.0 = self.0.saturating_sub(amount);
    }

    pub fn restore(&mut self) {
        self.0 = (self.0 + COMPLETION_BONUS).min(GAUGE_MAX);
    }

    pub fn is_low(&self) -> bool {
        self.0 < LOW_MORALE_THRESHOLD
    }
}
