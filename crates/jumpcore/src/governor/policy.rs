use std::collections::HashMap;

use tracing::{info, warn};

use crate::config::GovernorConfig;
use crate::ring::RollingMs;

use super::{EnvironmentKind, ThrottleState};

/// Result of feeding one overhead sample to the governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleTransition {
    Unchanged,
    Throttled,
    Unthrottled,
}

#[derive(Debug)]
struct FeatureOverhead {
    window: RollingMs,
    breach_streak: u32,
    calm_streak: u32,
    denied_streak: u32,
}

impl FeatureOverhead {
    fn new(window_len: usize) -> Self {
        Self {
            window: RollingMs::new(window_len),
            breach_streak: 0,
            calm_streak: 0,
            denied_streak: 0,
        }
    }
}

/// Decides how much diagnostic bookkeeping the pipeline may do. One instance
/// per pipeline, shared through [`super::GovernorHandle`].
#[derive(Debug)]
pub struct PerformanceGovernor {
    config: GovernorConfig,
    environment: EnvironmentKind,
    enabled: bool,
    throttle: ThrottleState,
    features: HashMap<String, FeatureOverhead>,
}

impl PerformanceGovernor {
    pub fn new(config: GovernorConfig, environment: EnvironmentKind) -> Self {
        let enabled = config
            .diagnostics_enabled
            .unwrap_or(environment == EnvironmentKind::Development);
        let throttle = ThrottleState::unthrottled(config.base_update_hz);
        info!(
            environment = %environment,
            enabled,
            base_update_hz = config.base_update_hz,
            overhead_budget_ms = config.overhead_budget_ms,
            "governor_config"
        );
        Self {
            config,
            environment,
            enabled,
            throttle,
            features: HashMap::new(),
        }
    }

    pub fn environment(&self) -> EnvironmentKind {
        self.environment
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            info!(enabled, "diagnostics_enabled_changed");
        }
        self.enabled = enabled;
    }

    pub fn throttle_state(&self) -> ThrottleState {
        self.throttle
    }

    pub fn budget_ms(&self) -> f32 {
        self.config.overhead_budget_ms
    }

    pub fn feature_average_ms(&self, tag: &str) -> Option<f32> {
        self.features
            .get(tag)
            .and_then(|feature| feature.window.average_ms())
    }

    /// A feature over budget is denied, except for one retry pass every
    /// `retry_interval` denials so it can prove it has recovered.
    pub fn should_record(&mut self, tag: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let budget_ms = self.config.overhead_budget_ms;
        let retry_interval = self.config.retry_interval;
        let Some(feature) = self.features.get_mut(tag) else {
            return true;
        };
        match feature.window.average_ms() {
            Some(average_ms) if average_ms > budget_ms => {
                feature.denied_streak = feature.denied_streak.saturating_add(1);
                if feature.denied_streak >= retry_interval {
                    feature.denied_streak = 0;
                    feature.window.clear();
                    return true;
                }
                false
            }
            _ => {
                feature.denied_streak = 0;
                true
            }
        }
    }

    pub fn observe_overhead(&mut self, tag: &str, overhead_ms: f32) -> ThrottleTransition {
        let overhead_ms = if overhead_ms.is_finite() {
            overhead_ms.max(0.0)
        } else {
            0.0
        };
        self.throttle.last_measured_overhead_ms = overhead_ms;
        let budget_ms = self.config.overhead_budget_ms;
        let window_len = self.config.feature_window;
        let feature = self
            .features
            .entry(tag.to_string())
            .or_insert_with(|| FeatureOverhead::new(window_len));
        feature.window.push_ms(overhead_ms);

        if overhead_ms > budget_ms {
            feature.calm_streak = 0;
            feature.breach_streak = feature.breach_streak.saturating_add(1);
            if feature.breach_streak < self.config.sustained_breaches {
                return ThrottleTransition::Unchanged;
            }
            feature.breach_streak = 0;
            warn!(
                feature = tag,
                overhead_ms,
                budget_ms,
                sustained_breaches = self.config.sustained_breaches,
                "diagnostic_overhead_over_budget"
            );
            return if self.throttle() {
                ThrottleTransition::Throttled
            } else {
                ThrottleTransition::Unchanged
            };
        }

        feature.breach_streak = 0;
        feature.calm_streak = feature.calm_streak.saturating_add(1);
        let recovered = feature.calm_streak >= self.config.recovery_samples;
        if recovered {
            feature.calm_streak = 0;
        }
        let any_over_budget = self.features.values().any(|feature| {
            feature.breach_streak > 0
                || feature
                    .window
                    .average_ms()
                    .is_some_and(|average_ms| average_ms > budget_ms)
        });
        if self.throttle.throttled && recovered && !any_over_budget && self.unthrottle() {
            return ThrottleTransition::Unthrottled;
        }
        ThrottleTransition::Unchanged
    }

    /// Halves update frequency and retained history, stopping at the
    /// configured floors, and restarts every feature's recovery count.
    /// Returns whether the cadence changed.
    pub fn throttle(&mut self) -> bool {
        let before = self.throttle;
        let next_hz = (self.throttle.update_frequency_hz * 0.5).max(self.config.min_update_hz);
        let next_scale = (self.throttle.history_scale * 0.5).max(self.config.min_history_scale);
        self.throttle.throttled = true;
        self.throttle.update_frequency_hz = next_hz;
        self.throttle.history_scale = next_scale;
        // Recovery is counted from the moment the throttle engages.
        for feature in self.features.values_mut() {
            feature.calm_streak = 0;
        }

        let changed = before != self.throttle;
        if changed {
            info!(
                update_frequency_hz = next_hz,
                history_scale = next_scale,
                "diagnostics_throttled"
            );
        }
        changed
    }

    /// Restores base frequency and full history capacity.
    pub fn unthrottle(&mut self) -> bool {
        if !self.throttle.throttled {
            return false;
        }
        self.throttle.throttled = false;
        self.throttle.update_frequency_hz = self.config.base_update_hz;
        self.throttle.history_scale = 1.0;
        info!(
            update_frequency_hz = self.throttle.update_frequency_hz,
            "diagnostics_unthrottled"
        );
        true
    }
}
