//! One-per-session orchestration of the jump pipeline.
//!
//! Event callbacks call [`JumpPipeline::handle_raw_event`] and
//! [`JumpPipeline::set_focus`] as events arrive. Each simulation tick calls
//! [`JumpPipeline::tick`], which runs normalizer, estimator, validator and
//! recorder in that order against a single ground estimate.

use serde::Serialize;
use tracing::info;

use crate::config::{ConfigError, PipelineConfig};
use crate::diagnostics::{DiagnosticRecorder, DisplaySnapshot, ExportReport};
use crate::governor::GovernorHandle;
use crate::ground::{GroundEstimate, GroundStateEstimator};
use crate::input::{
    InputNormalizer, InputSchedule, IntentCollector, IntentSnapshot, JumpIntentEdge,
    NormalizeOutcome, RawInputEvent,
};
use crate::jump::{JumpAttempt, JumpPhase, JumpValidator, PhaseTracker};
use crate::player::{BodySnapshot, PlayerBody, PlayerFlags, Surface};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub intent: IntentSnapshot,
    pub ground: GroundEstimate,
    /// Present only on ticks that consumed a jump edge.
    pub attempt: Option<JumpAttempt>,
    pub phase: JumpPhase,
}

#[derive(Debug)]
pub struct JumpPipeline {
    config: PipelineConfig,
    governor: GovernorHandle,
    normalizer: InputNormalizer,
    intents: IntentCollector,
    schedule: InputSchedule,
    estimator: GroundStateEstimator,
    validator: JumpValidator,
    phase: PhaseTracker,
    recorder: DiagnosticRecorder,
}

impl JumpPipeline {
    pub fn new(config: PipelineConfig, governor: GovernorHandle) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            primary_jump_code = config.input.primary_jump_code.as_str(),
            alternates = config.input.alternate_jump_codes.len(),
            require_focus = config.input.require_focus,
            attempt_capacity = config.diagnostics.attempt_capacity,
            diagnostics_enabled = governor.is_enabled(),
            environment = %governor.environment(),
            "pipeline_config"
        );
        Ok(Self {
            normalizer: InputNormalizer::new(config.input.clone(), governor.clone()),
            intents: IntentCollector::new(),
            schedule: InputSchedule::new(),
            estimator: GroundStateEstimator::new(config.ground.clone()),
            validator: JumpValidator::new(config.jump.clone()),
            phase: PhaseTracker::new(),
            recorder: DiagnosticRecorder::new(config.diagnostics.clone(), governor.clone()),
            config,
            governor,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn governor(&self) -> &GovernorHandle {
        &self.governor
    }

    pub fn normalizer(&self) -> &InputNormalizer {
        &self.normalizer
    }

    pub fn estimator(&self) -> &GroundStateEstimator {
        &self.estimator
    }

    pub fn recorder(&self) -> &DiagnosticRecorder {
        &self.recorder
    }

    pub fn phase(&self) -> JumpPhase {
        self.phase.phase()
    }

    /// Delayed synthetic input, drained at the start of each tick.
    pub fn schedule_mut(&mut self) -> &mut InputSchedule {
        &mut self.schedule
    }

    pub fn handle_raw_event(&mut self, raw: &RawInputEvent, received_at_ms: f64) -> NormalizeOutcome {
        let outcome = self.normalizer.normalize(raw, received_at_ms);
        self.intents.handle(&outcome);
        outcome
    }

    pub fn set_focus(&mut self, focused: bool, at_ms: f64) {
        let releases = self.normalizer.set_focus(focused, at_ms);
        self.intents.apply_releases(&releases);
        info!(focused, released = releases.len(), "input_focus_changed");
    }

    /// Never fails: a missing player is estimated as airborne and any jump
    /// edge is recorded as blocked.
    pub fn tick(
        &mut self,
        mut player: Option<&mut dyn PlayerBody>,
        surfaces: &[Surface],
        now_ms: f64,
    ) -> TickReport {
        for raw in self.schedule.drain_due(now_ms) {
            self.handle_raw_event(&raw, now_ms);
        }
        let intent = self.intents.snapshot_for_tick();

        let ground = self.estimator.estimate(player.as_deref(), surfaces, now_ms);
        self.phase.on_ground_estimate(&ground);

        let attempt = match intent.jump_edge() {
            Some(edge) => {
                let attempt = self.evaluate_edge(edge, &ground, player.as_deref(), now_ms);
                if let Some(player) = player.as_deref_mut() {
                    self.validator.apply(&attempt, player);
                }
                self.phase.on_jump_executed(&attempt);
                self.recorder.record(attempt.clone());
                Some(attempt)
            }
            None => None,
        };

        TickReport {
            intent,
            ground,
            attempt,
            phase: self.phase.phase(),
        }
    }

    pub fn poll_display(&mut self, now_ms: f64) -> Option<DisplaySnapshot> {
        let ground = self.estimator.latest().copied();
        self.recorder.poll_display(now_ms, ground)
    }

    pub fn export_report(&self, now_ms: f64) -> ExportReport {
        let transitions: Vec<_> = self.estimator.transitions().iter().copied().collect();
        self.recorder.export_report(now_ms, &transitions)
    }

    fn evaluate_edge(
        &self,
        edge: &JumpIntentEdge,
        ground: &GroundEstimate,
        player: Option<&dyn PlayerBody>,
        now_ms: f64,
    ) -> JumpAttempt {
        let intent_detected = edge.had_focus || !self.config.input.require_focus;
        let (flags, body) = match player {
            Some(player) => (PlayerFlags::capture(player), BodySnapshot::capture(player)),
            None => (PlayerFlags::default(), BodySnapshot::default()),
        };
        self.validator
            .try_jump(intent_detected, ground, flags, body, now_ms, Some(edge))
    }
}
