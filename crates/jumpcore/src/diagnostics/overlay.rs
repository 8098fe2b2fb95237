use crate::ground::GroundEstimate;
use crate::jump::JumpAttempt;

use super::{DisplaySnapshot, LatencyStats, NOT_AVAILABLE};

pub const GROUND_SECTION_LABEL: &str = "Ground";
pub const JUMPS_SECTION_LABEL: &str = "Jumps";
pub const DIAG_SECTION_LABEL: &str = "Diag";

pub fn is_section_label(line: &str) -> bool {
    matches!(
        line,
        GROUND_SECTION_LABEL | JUMPS_SECTION_LABEL | DIAG_SECTION_LABEL
    )
}

/// Text for an on-screen overlay, one entry per line; blank entries separate
/// sections.
pub fn overlay_lines(snapshot: &DisplaySnapshot) -> Vec<String> {
    let stats = &snapshot.statistics;
    let mut lines = vec![GROUND_SECTION_LABEL.to_string()];
    lines.extend(format_ground_lines(snapshot.ground.as_ref()));

    lines.push(String::new());
    lines.push(JUMPS_SECTION_LABEL.to_string());
    lines.push(format!(
        "ok/fail/all: {}/{}/{}",
        snapshot.summary.successful_jumps,
        snapshot.summary.failed_jumps,
        snapshot.summary.total_attempts
    ));
    lines.push(match stats.window_size {
        0 => format!("rate: {NOT_AVAILABLE}"),
        window => format!("rate: {}% of {}", stats.success_rate, window),
    });
    lines.push(format_latency_line(stats.latency));
    for failure in stats.failure_reasons.iter().take(3) {
        lines.push(format!(
            "{}: {} ({}%)",
            failure.reason, failure.count, failure.percentage
        ));
    }
    for attempt in snapshot.recent_attempts.iter().rev() {
        lines.push(format_attempt_line(attempt));
    }

    lines.push(String::new());
    lines.push(DIAG_SECTION_LABEL.to_string());
    lines.push(format!(
        "hz: {:.0}{}",
        snapshot.throttle.update_frequency_hz,
        if snapshot.throttle.throttled {
            " (throttled)"
        } else {
            ""
        }
    ));
    lines.push(format!(
        "cost: {:.3} ms",
        snapshot.throttle.last_measured_overhead_ms
    ));
    lines
}

fn format_ground_lines(ground: Option<&GroundEstimate>) -> Vec<String> {
    let Some(ground) = ground else {
        return vec!["est: none".to_string()];
    };
    let flag = |value: bool| if value { '+' } else { '-' };
    vec![
        format!(
            "on: {} conf: {:.2}",
            if ground.is_on_ground { "yes" } else { "no" },
            ground.confidence
        ),
        format!(
            "phy/pos/vel: {}/{}/{}",
            flag(ground.components.physics),
            flag(ground.components.position),
            flag(ground.components.velocity)
        ),
    ]
}

fn format_latency_line(latency: Option<LatencyStats>) -> String {
    match latency {
        Some(latency) => format!(
            "lat a/p95/m: {:.1}/{:.1}/{:.1} ms",
            latency.avg_ms, latency.p95_ms, latency.max_ms
        ),
        None => format!("lat: {NOT_AVAILABLE}"),
    }
}

fn format_attempt_line(attempt: &JumpAttempt) -> String {
    let outcome = match attempt.blocking_reason() {
        None => "jump".to_string(),
        Some(reason) => reason.to_string(),
    };
    format!(
        "@{:.0} {} {}",
        attempt.timestamp_ms(),
        attempt.input_source().unwrap_or("-"),
        outcome
    )
}

#[cfg(test)]
mod tests {
    use crate::diagnostics::{DiagnosticStatistics, SessionSummary};
    use crate::governor::ThrottleState;

    use super::*;

    fn snapshot() -> DisplaySnapshot {
        DisplaySnapshot {
            at_ms: 0.0,
            ground: None,
            statistics: DiagnosticStatistics::empty(),
            recent_attempts: Vec::new(),
            summary: SessionSummary::default(),
            throttle: ThrottleState::unthrottled(60.0),
        }
    }

    #[test]
    fn empty_snapshot_renders_placeholders() {
        let lines = overlay_lines(&snapshot());
        assert_eq!(lines[0], GROUND_SECTION_LABEL);
        assert!(lines.contains(&"est: none".to_string()));
        assert!(lines.contains(&"rate: N/A".to_string()));
        assert!(lines.contains(&"lat: N/A".to_string()));
        assert!(lines.contains(&"hz: 60".to_string()));
        assert_eq!(lines.iter().filter(|line| is_section_label(line)).count(), 3);
    }

    #[test]
    fn throttled_state_is_marked() {
        let mut data = snapshot();
        data.throttle.throttled = true;
        data.throttle.update_frequency_hz = 30.0;
        let lines = overlay_lines(&data);
        assert!(lines.contains(&"hz: 30 (throttled)".to_string()));
    }
}
