use std::fmt;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::config::RecorderConfig;
use crate::governor::{
    elapsed_ms, GovernorHandle, ThrottleState, FEATURE_DISPLAY, FEATURE_JUMP_ATTEMPTS,
};
use crate::ground::{GroundEstimate, GroundTransition};
use crate::jump::JumpAttempt;
use crate::ring::RingBuffer;

use super::report::{recommendations, ExportReport, SessionSummary};
use super::stats::{compute_statistics, DiagnosticStatistics};

/// Everything an overlay needs for one refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySnapshot {
    pub at_ms: f64,
    pub ground: Option<GroundEstimate>,
    pub statistics: DiagnosticStatistics,
    pub recent_attempts: Vec<JumpAttempt>,
    pub summary: SessionSummary,
    pub throttle: ThrottleState,
}

pub struct DiagnosticRecorder {
    config: RecorderConfig,
    governor: GovernorHandle,
    attempts: RingBuffer<JumpAttempt>,
    summary: SessionSummary,
    last_display_ms: Option<f64>,
}

impl fmt::Debug for DiagnosticRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticRecorder")
            .field("buffered", &self.attempts.len())
            .field("capacity", &self.attempts.capacity())
            .field("summary", &self.summary)
            .finish()
    }
}

impl DiagnosticRecorder {
    pub fn new(config: RecorderConfig, governor: GovernorHandle) -> Self {
        let attempts = RingBuffer::new(config.attempt_capacity);
        Self {
            config,
            governor,
            attempts,
            summary: SessionSummary::default(),
            last_display_ms: None,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    pub fn attempts(&self) -> &RingBuffer<JumpAttempt> {
        &self.attempts
    }

    /// Counters always advance. The attempt itself is buffered only when the
    /// governor allows it, and the buffering is timed and reported back.
    pub fn record(&mut self, attempt: JumpAttempt) {
        self.summary.total_attempts = self.summary.total_attempts.saturating_add(1);
        if attempt.executed() {
            self.summary.successful_jumps = self.summary.successful_jumps.saturating_add(1);
        } else {
            self.summary.failed_jumps = self.summary.failed_jumps.saturating_add(1);
        }
        debug!(
            executed = attempt.executed(),
            reason = attempt.blocking_reason().map(|reason| reason.as_str()),
            confidence = attempt.ground().confidence,
            "jump_attempt"
        );

        if !self.governor.should_record(FEATURE_JUMP_ATTEMPTS) {
            self.summary.unbuffered_attempts = self.summary.unbuffered_attempts.saturating_add(1);
            return;
        }

        let started = Instant::now();
        self.sync_capacity();
        self.attempts.push(attempt);
        self.governor
            .observe_overhead(FEATURE_JUMP_ATTEMPTS, elapsed_ms(started));
    }

    /// Statistics over the most recent `report_window` buffered attempts.
    pub fn generate_report(&self) -> DiagnosticStatistics {
        let started = Instant::now();
        let statistics = compute_statistics(self.attempts.recent(self.config.report_window));
        self.governor
            .observe_overhead(FEATURE_DISPLAY, elapsed_ms(started));
        statistics
    }

    /// At most `update_frequency_hz` snapshots per second of `now_ms`; `None`
    /// between refreshes or while the display feature is denied.
    pub fn poll_display(
        &mut self,
        now_ms: f64,
        ground: Option<GroundEstimate>,
    ) -> Option<DisplaySnapshot> {
        let throttle = self.governor.throttle_state();
        let due = self
            .last_display_ms
            .map_or(true, |last_ms| now_ms - last_ms >= throttle.update_interval_ms());
        if !due || !self.governor.should_record(FEATURE_DISPLAY) {
            return None;
        }
        self.last_display_ms = Some(now_ms);

        let statistics = self.generate_report();
        Some(DisplaySnapshot {
            at_ms: now_ms,
            ground,
            statistics,
            recent_attempts: self.recent_attempts(self.config.display_attempts),
            summary: self.summary,
            throttle,
        })
    }

    pub fn export_report(
        &self,
        now_ms: f64,
        ground_transitions: &[GroundTransition],
    ) -> ExportReport {
        let statistics = self.generate_report();
        let recent_attempts = self.recent_attempts(self.config.export_attempts);
        let throttle = self.governor.throttle_state();
        let recommendations = recommendations(&self.summary, &statistics, &throttle);
        ExportReport {
            generated_at_ms: now_ms,
            environment: self.governor.environment(),
            summary: self.summary,
            statistics,
            recent_attempts,
            ground_transitions: ground_transitions.to_vec(),
            throttle,
            recommendations,
        }
    }

    fn recent_attempts(&self, count: usize) -> Vec<JumpAttempt> {
        self.attempts.recent(count).cloned().collect()
    }

    fn sync_capacity(&mut self) {
        let capacity = self.governor.throttle_state().scaled_capacity(
            self.config.attempt_capacity,
            self.config.history_floor(),
        );
        if capacity != self.attempts.capacity() {
            debug!(
                from = self.attempts.capacity(),
                to = capacity,
                "attempt_history_resized"
            );
            self.attempts.set_capacity(capacity);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{GovernorConfig, GroundConfig};
    use crate::governor::{EnvironmentKind, PerformanceGovernor};
    use crate::ground::ComponentFlags;
    use crate::input::JumpIntentEdge;
    use crate::jump::{BlockingReason, JumpValidator};
    use crate::player::{BodySnapshot, PlayerFlags, Vec2};

    use super::*;

    fn recorder_with(config: RecorderConfig) -> (DiagnosticRecorder, GovernorHandle) {
        let governor = GovernorHandle::development(GovernorConfig::default());
        (DiagnosticRecorder::new(config, governor.clone()), governor)
    }

    fn recorder() -> DiagnosticRecorder {
        recorder_with(RecorderConfig::default()).0
    }

    /// `x` of the position snapshot carries a sequence number.
    fn numbered_attempt(sequence: u32, grounded: bool) -> JumpAttempt {
        let components = if grounded {
            ComponentFlags::ALL
        } else {
            ComponentFlags::NONE
        };
        let at_ms = f64::from(sequence) * 100.0;
        let ground = GroundEstimate::from_components(components, &GroundConfig::default(), at_ms);
        let edge = JumpIntentEdge {
            source_code: "Space".to_string(),
            timestamp_ms: at_ms - 4.0,
            had_focus: true,
        };
        JumpValidator::new(Default::default()).try_jump(
            true,
            &ground,
            PlayerFlags::default(),
            BodySnapshot {
                position: Vec2::new(sequence as f32, 0.0),
                velocity: Vec2::ZERO,
            },
            at_ms,
            Some(&edge),
        )
    }

    #[test]
    fn report_on_empty_recorder_is_not_available() {
        let recorder = recorder();
        let stats = recorder.generate_report();
        assert_eq!(stats.success_rate, "N/A");
        assert!(stats.failure_reasons.is_empty());
        assert!(stats.latency.is_none());
    }

    #[test]
    fn three_not_on_ground_failures_dominate_histogram() {
        let mut recorder = recorder();
        for sequence in 1..=3 {
            recorder.record(numbered_attempt(sequence, false));
        }

        let stats = recorder.generate_report();
        let top = &stats.failure_reasons[0];
        assert_eq!(top.reason, BlockingReason::NotOnGround);
        assert_eq!(top.reason.as_str(), "Not on ground");
        assert_eq!(top.count, 3);
        assert_eq!(top.percentage, "100.0");
        assert_eq!(stats.success_rate, "0.0");
    }

    #[test]
    fn buffer_keeps_latest_attempts_in_order() {
        let config = RecorderConfig {
            attempt_capacity: 5,
            min_history_capacity: 1,
            ..RecorderConfig::default()
        };
        let (mut recorder, _) = recorder_with(config);
        for sequence in 1..=8 {
            recorder.record(numbered_attempt(sequence, true));
        }

        let kept: Vec<f32> = recorder
            .attempts()
            .iter()
            .map(|attempt| attempt.position().x)
            .collect();
        assert_eq!(kept, [4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(recorder.summary().total_attempts, 8);
        assert_eq!(recorder.summary().successful_jumps, 8);
    }

    #[test]
    fn counters_are_cumulative_past_eviction() {
        let config = RecorderConfig {
            attempt_capacity: 10,
            report_window: 4,
            ..RecorderConfig::default()
        };
        let (mut recorder, _) = recorder_with(config);
        for sequence in 1..=30 {
            recorder.record(numbered_attempt(sequence, sequence % 3 == 0));
        }

        let summary = recorder.summary();
        assert_eq!(summary.total_attempts, 30);
        assert_eq!(summary.successful_jumps, 10);
        assert_eq!(summary.failed_jumps, 20);
        assert_eq!(recorder.attempts().len(), 10);
        assert_eq!(recorder.generate_report().window_size, 4);
    }

    #[test]
    fn denied_recording_still_counts() {
        let (mut recorder, governor) = recorder_with(RecorderConfig::default());
        governor.set_enabled(false);

        recorder.record(numbered_attempt(1, true));
        recorder.record(numbered_attempt(2, false));

        assert!(recorder.attempts().is_empty());
        let summary = recorder.summary();
        assert_eq!(summary.total_attempts, 2);
        assert_eq!(summary.unbuffered_attempts, 2);
    }

    #[test]
    fn production_recorder_counts_without_buffering() {
        let governor = GovernorHandle::new(PerformanceGovernor::new(
            GovernorConfig::default(),
            EnvironmentKind::Production,
        ));
        let mut recorder = DiagnosticRecorder::new(RecorderConfig::default(), governor);
        recorder.record(numbered_attempt(1, true));
        assert_eq!(recorder.summary().successful_jumps, 1);
        assert!(recorder.attempts().is_empty());
        assert!(recorder.poll_display(0.0, None).is_none());
    }

    #[test]
    fn throttled_history_shrinks_to_scaled_capacity() {
        let config = RecorderConfig {
            attempt_capacity: 40,
            min_history_capacity: 10,
            ..RecorderConfig::default()
        };
        let (mut recorder, governor) = recorder_with(config);
        for sequence in 1..=40 {
            recorder.record(numbered_attempt(sequence, true));
        }
        assert_eq!(recorder.attempts().len(), 40);

        governor.throttle();
        recorder.record(numbered_attempt(41, true));
        assert_eq!(recorder.attempts().capacity(), 20);
        assert_eq!(recorder.attempts().len(), 20);
        assert_eq!(
            recorder.attempts().latest().map(|attempt| attempt.position().x),
            Some(41.0)
        );

        governor.throttle();
        governor.throttle();
        recorder.record(numbered_attempt(42, true));
        assert_eq!(recorder.attempts().capacity(), 10);

        governor.unthrottle();
        recorder.record(numbered_attempt(43, true));
        assert_eq!(recorder.attempts().capacity(), 40);
        assert_eq!(recorder.attempts().len(), 11);
    }

    #[test]
    fn small_buffer_is_not_grown_by_default_floor() {
        let config = RecorderConfig {
            attempt_capacity: 5,
            ..RecorderConfig::default()
        };
        let (mut recorder, governor) = recorder_with(config);
        for sequence in 1..=7 {
            recorder.record(numbered_attempt(sequence, sequence != 3));
        }
        assert_eq!(recorder.attempts().capacity(), 5);
        assert_eq!(recorder.attempts().len(), 5);

        governor.throttle();
        recorder.record(numbered_attempt(8, true));
        assert_eq!(recorder.attempts().capacity(), 5);
        assert_eq!(
            recorder.attempts().iter().next().map(|attempt| attempt.position().x),
            Some(4.0)
        );
    }

    #[test]
    fn display_refresh_follows_update_frequency() {
        let (mut recorder, governor) = recorder_with(RecorderConfig::default());
        recorder.record(numbered_attempt(1, true));

        assert!(recorder.poll_display(0.0, None).is_some());
        assert!(recorder.poll_display(10.0, None).is_none());
        let snapshot = recorder.poll_display(17.0, None).expect("due at 60 Hz");
        assert_eq!(snapshot.recent_attempts.len(), 1);
        assert_eq!(snapshot.summary.total_attempts, 1);

        governor.throttle();
        assert!(recorder.poll_display(40.0, None).is_none());
        let throttled = recorder.poll_display(51.0, None).expect("due at 30 Hz");
        assert!(throttled.throttle.throttled);
        assert_eq!(throttled.throttle.update_frequency_hz, 30.0);
    }

    #[test]
    fn export_report_carries_summary_and_recommendations() {
        let (mut recorder, _) = recorder_with(RecorderConfig::default());
        let empty = recorder.export_report(0.0, &[]);
        assert_eq!(empty.recommendations.len(), 1);
        assert!(empty.recommendations[0].starts_with("No jump attempts"));

        for sequence in 1..=4 {
            recorder.record(numbered_attempt(sequence, false));
        }
        recorder.record(numbered_attempt(5, true));

        let report = recorder.export_report(1_000.0, &[]);
        assert_eq!(report.environment, EnvironmentKind::Development);
        assert_eq!(report.summary.total_attempts, 5);
        assert_eq!(report.recent_attempts.len(), 5);
        assert_eq!(report.statistics.success_rate, "20.0");
        assert!(report.recommendations[0].contains("not on ground"));
        assert!(report
            .recommendations
            .iter()
            .any(|line| line.contains("success rate is 20.0%")));

        let json = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(
            json["statistics"]["failure_reasons"][0]["reason"],
            "Not on ground"
        );
        assert_eq!(json["environment"], "development");
    }
}
