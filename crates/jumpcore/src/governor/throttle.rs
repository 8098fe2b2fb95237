use serde::{Deserialize, Serialize};

/// Sampling cadence shared by the governor and the recorder. Always read and
/// written as a whole value through [`super::GovernorHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThrottleState {
    pub throttled: bool,
    pub update_frequency_hz: f32,
    pub last_measured_overhead_ms: f32,
    /// Fraction of the configured history capacity currently retained.
    pub history_scale: f32,
}

impl ThrottleState {
    pub fn unthrottled(base_update_hz: f32) -> Self {
        Self {
            throttled: false,
            update_frequency_hz: base_update_hz,
            last_measured_overhead_ms: 0.0,
            history_scale: 1.0,
        }
    }

    pub fn update_interval_ms(&self) -> f64 {
        1000.0 / f64::from(self.update_frequency_hz.max(f32::EPSILON))
    }

    /// Effective capacity for a buffer configured at `configured`, never
    /// below `floor`.
    pub fn scaled_capacity(&self, configured: usize, floor: usize) -> usize {
        let scaled = (configured as f32 * self.history_scale).round() as usize;
        scaled.max(floor).min(configured.max(floor))
    }
}
