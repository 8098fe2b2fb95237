use serde::Serialize;

use crate::governor::{EnvironmentKind, ThrottleState};
use crate::ground::GroundTransition;
use crate::jump::{BlockingReason, JumpAttempt};

use super::DiagnosticStatistics;

/// Average latency above roughly three frames at 60 Hz.
const SLOW_LATENCY_MS: f64 = 50.0;
const LOW_SUCCESS_RATE: f64 = 50.0;

/// Cumulative for the whole session; eviction from the attempt buffer does
/// not touch these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub total_attempts: u64,
    pub successful_jumps: u64,
    pub failed_jumps: u64,
    /// Counted but not buffered because the governor denied recording.
    pub unbuffered_attempts: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    pub generated_at_ms: f64,
    pub environment: EnvironmentKind,
    pub summary: SessionSummary,
    pub statistics: DiagnosticStatistics,
    pub recent_attempts: Vec<JumpAttempt>,
    pub ground_transitions: Vec<GroundTransition>,
    pub throttle: ThrottleState,
    pub recommendations: Vec<String>,
}

pub(crate) fn recommendations(
    summary: &SessionSummary,
    statistics: &DiagnosticStatistics,
    throttle: &ThrottleState,
) -> Vec<String> {
    if summary.total_attempts == 0 {
        return vec!["No jump attempts recorded yet. Press a jump key to collect data.".to_string()];
    }

    let mut advice = Vec::new();
    if let Some(dominant) = statistics.dominant_failure() {
        advice.push(match dominant.reason {
            BlockingReason::InputNotDetected => format!(
                "Most failed jumps ({}%) had no usable input; {} of the last {} attempts lacked a focused jump press. Click the game window before playing.",
                dominant.percentage, dominant.count, statistics.window_size
            ),
            BlockingReason::PlayerBlocking => format!(
                "Most failed jumps ({}%) were refused because the player was blocking. Check what sets the blocking flag.",
                dominant.percentage
            ),
            BlockingReason::NotOnGround => format!(
                "Most failed jumps ({}%) happened while not on ground. Check collision contact flags and the ground position tolerance.",
                dominant.percentage
            ),
        });
    }

    if statistics
        .success_rate_value()
        .is_some_and(|rate| rate < LOW_SUCCESS_RATE)
    {
        advice.push(format!(
            "Jump success rate is {}% over the last {} attempts.",
            statistics.success_rate, statistics.window_size
        ));
    }

    if let Some(latency) = statistics
        .latency
        .filter(|latency| latency.avg_ms > SLOW_LATENCY_MS)
    {
        advice.push(format!(
            "Average input-to-jump latency is {:.1} ms (p95 {:.1} ms). Input may be waiting behind long frames.",
            latency.avg_ms, latency.p95_ms
        ));
    }

    if throttle.throttled {
        advice.push(format!(
            "Diagnostics are throttled to {:.0} Hz because recording overhead exceeded its budget.",
            throttle.update_frequency_hz
        ));
    }

    if summary.unbuffered_attempts > 0 {
        advice.push(format!(
            "{} attempts were counted but not kept in history because recording was disabled or over budget.",
            summary.unbuffered_attempts
        ));
    }

    if advice.is_empty() {
        advice.push("No jump issues detected.".to_string());
    }
    advice
}
