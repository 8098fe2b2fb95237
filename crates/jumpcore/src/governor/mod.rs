//! Environment-aware policy over how much diagnostic bookkeeping runs.
//!
//! The recorder and the normalizer time their own work and report it with
//! [`GovernorHandle::observe_overhead`]; a sustained breach of the budget
//! halves the display update frequency and the retained history, and a long
//! enough calm stretch restores both.

mod environment;
mod handle;
mod policy;
mod throttle;

use std::time::Instant;

pub use environment::{
    EnvironmentClassification, EnvironmentKind, EnvironmentSignals, DEBUG_ENV_VAR,
    HOSTNAME_ENV_VAR, PROTOCOL_ENV_VAR,
};
pub use handle::GovernorHandle;
pub use policy::{PerformanceGovernor, ThrottleTransition};
pub use throttle::ThrottleState;

/// Normalizer event-history bookkeeping.
pub const FEATURE_INPUT_EVENTS: &str = "input_events";
/// Buffering of jump attempts in the recorder.
pub const FEATURE_JUMP_ATTEMPTS: &str = "jump_attempts";
/// Statistics and display snapshots.
pub const FEATURE_DISPLAY: &str = "display";

pub(crate) fn elapsed_ms(start: Instant) -> f32 {
    start.elapsed().as_secs_f32() * 1000.0
}
