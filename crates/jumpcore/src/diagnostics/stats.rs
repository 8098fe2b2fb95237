use std::collections::BTreeMap;

use serde::Serialize;

use crate::jump::{BlockingReason, JumpAttempt};

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReasonCount {
    pub reason: BlockingReason,
    pub count: usize,
    /// Share of the window's failures, one decimal.
    pub percentage: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStats {
    pub samples: usize,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
}

/// View over the most recent attempts. Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticStatistics {
    pub window_size: usize,
    pub executed: usize,
    pub failed: usize,
    /// Percentage with one decimal, or `"N/A"` for an empty window.
    pub success_rate: String,
    /// Most frequent first.
    pub failure_reasons: Vec<FailureReasonCount>,
    /// `None` when no executed attempt carried an input timestamp.
    pub latency: Option<LatencyStats>,
}

impl DiagnosticStatistics {
    pub fn empty() -> Self {
        Self {
            window_size: 0,
            executed: 0,
            failed: 0,
            success_rate: NOT_AVAILABLE.to_string(),
            failure_reasons: Vec::new(),
            latency: None,
        }
    }

    pub fn success_rate_value(&self) -> Option<f64> {
        if self.window_size == 0 {
            return None;
        }
        Some(percentage(self.executed, self.window_size))
    }

    pub fn dominant_failure(&self) -> Option<&FailureReasonCount> {
        self.failure_reasons.first()
    }
}

pub fn compute_statistics<'a, I>(window: I) -> DiagnosticStatistics
where
    I: IntoIterator<Item = &'a JumpAttempt>,
{
    let mut window_size = 0usize;
    let mut executed = 0usize;
    let mut reasons: BTreeMap<BlockingReason, usize> = BTreeMap::new();
    let mut latencies = Vec::new();

    for attempt in window {
        window_size += 1;
        match attempt.blocking_reason() {
            None => executed += 1,
            Some(reason) => *reasons.entry(reason).or_insert(0) += 1,
        }
        if let Some(latency_ms) = attempt.latency_ms() {
            latencies.push(latency_ms);
        }
    }

    if window_size == 0 {
        return DiagnosticStatistics::empty();
    }

    let failed = window_size - executed;
    let mut failure_reasons: Vec<_> = reasons
        .into_iter()
        .map(|(reason, count)| FailureReasonCount {
            reason,
            count,
            percentage: format!("{:.1}", percentage(count, failed)),
        })
        .collect();
    // Stable sort keeps the declaration order of reasons on ties.
    failure_reasons.sort_by(|left, right| right.count.cmp(&left.count));

    DiagnosticStatistics {
        window_size,
        executed,
        failed,
        success_rate: format!("{:.1}", percentage(executed, window_size)),
        failure_reasons,
        latency: latency_stats(latencies),
    }
}

fn latency_stats(mut latencies: Vec<f64>) -> Option<LatencyStats> {
    if latencies.is_empty() {
        return None;
    }
    latencies.sort_by(f64::total_cmp);
    let samples = latencies.len();
    let sum: f64 = latencies.iter().sum();
    Some(LatencyStats {
        samples,
        avg_ms: sum / samples as f64,
        min_ms: latencies[0],
        max_ms: latencies[samples - 1],
        p50_ms: nearest_rank(&latencies, 50.0),
        p95_ms: nearest_rank(&latencies, 95.0),
    })
}

/// Nearest-rank percentile over an ascending, non-empty slice.
fn nearest_rank(sorted: &[f64], percentile: f64) -> f64 {
    let rank = ((percentile / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / whole as f64
}

#[cfg(test)]
mod tests {
    use crate::config::GroundConfig;
    use crate::ground::{ComponentFlags, GroundEstimate};
    use crate::input::JumpIntentEdge;
    use crate::jump::JumpValidator;
    use crate::player::{BodySnapshot, PlayerFlags};

    use super::*;

    fn attempt(executed: bool, blocking: bool, at_ms: f64, input_ms: Option<f64>) -> JumpAttempt {
        let components = if executed || blocking {
            ComponentFlags::ALL
        } else {
            ComponentFlags::NONE
        };
        let ground = GroundEstimate::from_components(components, &GroundConfig::default(), at_ms);
        let edge = input_ms.map(|timestamp_ms| JumpIntentEdge {
            source_code: "Space".to_string(),
            timestamp_ms,
            had_focus: true,
        });
        JumpValidator::new(Default::default()).try_jump(
            true,
            &ground,
            PlayerFlags {
                is_blocking: blocking,
            },
            BodySnapshot::default(),
            at_ms,
            edge.as_ref(),
        )
    }

    #[test]
    fn empty_window_reports_not_available() {
        let stats = compute_statistics(std::iter::empty());
        assert_eq!(stats.success_rate, "N/A");
        assert_eq!(stats.window_size, 0);
        assert!(stats.failure_reasons.is_empty());
        assert!(stats.latency.is_none());
        assert_eq!(stats.success_rate_value(), None);
    }

    #[test]
    fn success_rate_has_one_decimal() {
        let attempts = [
            attempt(true, false, 10.0, Some(5.0)),
            attempt(false, false, 20.0, Some(18.0)),
            attempt(false, false, 30.0, Some(28.0)),
        ];
        let stats = compute_statistics(&attempts);
        assert_eq!(stats.success_rate, "33.3");
        assert_eq!(stats.executed, 1);
        assert_eq!(stats.failed, 2);
    }

    #[test]
    fn failure_reasons_sort_by_count_then_reason_order() {
        let attempts = [
            attempt(false, true, 0.0, Some(0.0)),
            attempt(false, false, 1.0, Some(1.0)),
            attempt(false, true, 2.0, Some(2.0)),
            attempt(false, false, 3.0, Some(3.0)),
            attempt(false, false, 4.0, Some(4.0)),
            attempt(false, true, 5.0, Some(5.0)),
        ];
        let stats = compute_statistics(&attempts[..4]);
        assert_eq!(stats.failure_reasons[0].reason, BlockingReason::PlayerBlocking);
        assert_eq!(stats.failure_reasons[0].percentage, "50.0");

        let stats = compute_statistics(&attempts[..5]);
        assert_eq!(stats.failure_reasons[0].reason, BlockingReason::NotOnGround);
        assert_eq!(stats.failure_reasons[0].count, 3);
        assert_eq!(stats.failure_reasons[0].percentage, "60.0");
        assert_eq!(stats.failure_reasons[1].percentage, "40.0");
    }

    #[test]
    fn latency_uses_only_executed_attempts_with_input() {
        let attempts = [
            attempt(true, false, 10.0, Some(8.0)),
            attempt(true, false, 40.0, Some(30.0)),
            attempt(true, false, 50.0, None),
            attempt(false, false, 60.0, Some(0.0)),
            attempt(true, false, 104.0, Some(100.0)),
        ];
        let latency = compute_statistics(&attempts).latency.expect("latency");
        assert_eq!(latency.samples, 3);
        assert_eq!(latency.min_ms, 2.0);
        assert_eq!(latency.max_ms, 10.0);
        assert!((latency.avg_ms - 16.0 / 3.0).abs() < 1e-9);
        assert_eq!(latency.p50_ms, 4.0);
        assert_eq!(latency.p95_ms, 10.0);
    }

    #[test]
    fn nearest_rank_handles_single_sample() {
        assert_eq!(nearest_rank(&[7.0], 50.0), 7.0);
        assert_eq!(nearest_rank(&[7.0], 95.0), 7.0);
        assert_eq!(nearest_rank(&[1.0, 2.0, 3.0, 4.0], 50.0), 2.0);
    }
}
