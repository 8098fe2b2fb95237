use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::JumpConfig;
use crate::ground::GroundEstimate;
use crate::input::JumpIntentEdge;
use crate::player::{BodySnapshot, PlayerBody, PlayerFlags, Vec2};

/// Why a jump did not execute. Checked in declaration order; only the first
/// failing condition is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BlockingReason {
    #[serde(rename = "Input not detected")]
    InputNotDetected,
    #[serde(rename = "Player is blocking")]
    PlayerBlocking,
    #[serde(rename = "Not on ground")]
    NotOnGround,
}

impl BlockingReason {
    pub const ALL: [BlockingReason; 3] = [
        BlockingReason::InputNotDetected,
        BlockingReason::PlayerBlocking,
        BlockingReason::NotOnGround,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputNotDetected => "Input not detected",
            Self::PlayerBlocking => "Player is blocking",
            Self::NotOnGround => "Not on ground",
        }
    }
}

impl fmt::Display for BlockingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One evaluated jump intent. `executed` and `blocking_reason` are derived
/// from a single field, so exactly one of them is ever set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JumpAttempt {
    timestamp_ms: f64,
    input_detected: bool,
    ground: GroundEstimate,
    executed: bool,
    blocking_reason: Option<BlockingReason>,
    position: Vec2,
    velocity: Vec2,
    input_timestamp_ms: Option<f64>,
    input_source: Option<String>,
}

impl JumpAttempt {
    fn new(
        outcome: Result<(), BlockingReason>,
        input_detected: bool,
        ground: GroundEstimate,
        body: BodySnapshot,
        timestamp_ms: f64,
        input: Option<&JumpIntentEdge>,
    ) -> Self {
        Self {
            timestamp_ms,
            input_detected,
            ground,
            executed: outcome.is_ok(),
            blocking_reason: outcome.err(),
            position: body.position,
            velocity: body.velocity,
            input_timestamp_ms: input.map(|edge| edge.timestamp_ms),
            input_source: input.map(|edge| edge.source_code.clone()),
        }
    }

    pub fn timestamp_ms(&self) -> f64 {
        self.timestamp_ms
    }

    pub fn input_detected(&self) -> bool {
        self.input_detected
    }

    /// The estimate the decision was made against.
    pub fn ground(&self) -> &GroundEstimate {
        &self.ground
    }

    pub fn executed(&self) -> bool {
        self.executed
    }

    pub fn blocking_reason(&self) -> Option<BlockingReason> {
        self.blocking_reason
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn input_timestamp_ms(&self) -> Option<f64> {
        self.input_timestamp_ms
    }

    pub fn input_source(&self) -> Option<&str> {
        self.input_source.as_deref()
    }

    /// Input-to-execution latency; only for executed attempts with a known
    /// originating event.
    pub fn latency_ms(&self) -> Option<f64> {
        if !self.executed {
            return None;
        }
        self.input_timestamp_ms
            .map(|input_ms| (self.timestamp_ms - input_ms).max(0.0))
    }
}

#[derive(Debug, Clone)]
pub struct JumpValidator {
    config: JumpConfig,
}

impl JumpValidator {
    pub fn new(config: JumpConfig) -> Self {
        Self { config }
    }

    pub fn jump_impulse(&self) -> f32 {
        self.config.jump_impulse
    }

    /// Pure decision. Calling it once per rising edge is the caller's job;
    /// nothing here de-duplicates.
    pub fn try_jump(
        &self,
        intent_detected: bool,
        ground: &GroundEstimate,
        flags: PlayerFlags,
        body: BodySnapshot,
        timestamp_ms: f64,
        input: Option<&JumpIntentEdge>,
    ) -> JumpAttempt {
        let outcome = if !intent_detected {
            Err(BlockingReason::InputNotDetected)
        } else if flags.is_blocking {
            Err(BlockingReason::PlayerBlocking)
        } else if !ground.is_on_ground {
            Err(BlockingReason::NotOnGround)
        } else {
            Ok(())
        };
        JumpAttempt::new(outcome, intent_detected, *ground, body, timestamp_ms, input)
    }

    /// Applies the impulse for an executed attempt. Returns whether the
    /// player was touched.
    pub fn apply(&self, attempt: &JumpAttempt, player: &mut dyn PlayerBody) -> bool {
        if !attempt.executed() {
            return false;
        }
        player.apply_jump_impulse(self.config.jump_impulse);
        debug!(
            impulse = self.config.jump_impulse,
            latency_ms = attempt.latency_ms(),
            "jump_executed"
        );
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum JumpPhase {
    #[default]
    Grounded,
    Airborne,
}

/// `Grounded -> Airborne` on an executed jump, `Airborne -> Grounded` on the
/// next grounded estimate after launch. Nothing else moves it.
#[derive(Debug, Default)]
pub struct PhaseTracker {
    phase: JumpPhase,
    launched_at_ms: Option<f64>,
    transitions: u64,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> JumpPhase {
        self.phase
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn on_jump_executed(&mut self, attempt: &JumpAttempt) -> bool {
        if !attempt.executed() || self.phase != JumpPhase::Grounded {
            return false;
        }
        self.phase = JumpPhase::Airborne;
        self.launched_at_ms = Some(attempt.timestamp_ms());
        self.transitions = self.transitions.saturating_add(1);
        true
    }

    pub fn on_ground_estimate(&mut self, estimate: &GroundEstimate) -> bool {
        if self.phase != JumpPhase::Airborne || !estimate.is_on_ground {
            return false;
        }
        let after_launch = self
            .launched_at_ms
            .map_or(true, |launched_ms| estimate.computed_at_ms > launched_ms);
        if !after_launch {
            return false;
        }
        self.phase = JumpPhase::Grounded;
        self.launched_at_ms = None;
        self.transitions = self.transitions.saturating_add(1);
        true
    }
}
