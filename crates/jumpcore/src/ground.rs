//! Ground-contact estimation.
//!
//! Three independent checks vote with fixed weights. The collision pass's own
//! contact flag is authoritative: when it says grounded, the estimate says
//! grounded no matter what the geometric checks found.

use serde::Serialize;
use tracing::debug;

use crate::config::GroundConfig;
use crate::player::{PlayerBody, Surface};
use crate::ring::RingBuffer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComponentFlags {
    pub physics: bool,
    pub position: bool,
    pub velocity: bool,
}

impl ComponentFlags {
    pub const NONE: ComponentFlags = ComponentFlags {
        physics: false,
        position: false,
        velocity: false,
    };

    pub const ALL: ComponentFlags = ComponentFlags {
        physics: true,
        position: true,
        velocity: true,
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GroundEstimate {
    pub is_on_ground: bool,
    /// Always within `0.0..=1.0`.
    pub confidence: f32,
    pub components: ComponentFlags,
    pub computed_at_ms: f64,
}

impl GroundEstimate {
    /// Builds an estimate straight from component results.
    pub fn from_components(components: ComponentFlags, config: &GroundConfig, at_ms: f64) -> Self {
        let confidence = confidence_for(components, config);
        Self {
            is_on_ground: components.physics || confidence >= config.on_ground_threshold,
            confidence,
            components,
            computed_at_ms: at_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroundTransition {
    pub at_ms: f64,
    pub from_on_ground: bool,
    pub to_on_ground: bool,
    pub confidence: f32,
}

/// Sum of the weights of the checks that passed, clamped to `0.0..=1.0`.
pub fn confidence_for(components: ComponentFlags, config: &GroundConfig) -> f32 {
    let mut confidence = 0.0_f32;
    if components.physics {
        confidence += config.physics_weight;
    }
    if components.position {
        confidence += config.position_weight;
    }
    if components.velocity {
        confidence += config.velocity_weight;
    }
    confidence.clamp(0.0, 1.0)
}

#[derive(Debug)]
pub struct GroundStateEstimator {
    config: GroundConfig,
    history: RingBuffer<GroundEstimate>,
    transitions: RingBuffer<GroundTransition>,
    last_ground_contact_ms: Option<f64>,
}

impl GroundStateEstimator {
    pub fn new(config: GroundConfig) -> Self {
        let history = RingBuffer::new(config.history_capacity);
        let transitions = RingBuffer::new(config.transition_capacity);
        Self {
            config,
            history,
            transitions,
            last_ground_contact_ms: None,
        }
    }

    pub fn config(&self) -> &GroundConfig {
        &self.config
    }

    /// A missing player yields the all-false estimate with zero confidence.
    pub fn estimate(
        &mut self,
        player: Option<&dyn PlayerBody>,
        surfaces: &[Surface],
        now_ms: f64,
    ) -> GroundEstimate {
        let components = match player {
            Some(player) => self.check_components(player, surfaces),
            None => ComponentFlags::NONE,
        };
        let estimate = GroundEstimate::from_components(components, &self.config, now_ms);
        self.remember(estimate);
        estimate
    }

    pub fn latest(&self) -> Option<&GroundEstimate> {
        self.history.latest()
    }

    pub fn history(&self) -> &RingBuffer<GroundEstimate> {
        &self.history
    }

    pub fn transitions(&self) -> &RingBuffer<GroundTransition> {
        &self.transitions
    }

    /// Kept outside the history ring, so eviction does not lose it.
    pub fn time_since_last_ground_contact(&self, now_ms: f64) -> Option<f64> {
        self.last_ground_contact_ms
            .map(|contact_ms| (now_ms - contact_ms).max(0.0))
    }

    fn check_components(&self, player: &dyn PlayerBody, surfaces: &[Surface]) -> ComponentFlags {
        let position = player.position();
        let size = player.size();
        let feet_y = position.y + size.y;
        let left = position.x;
        let right = position.x + size.x;

        let position_ok = surfaces.iter().any(|surface| {
            surface.overlaps_span(left, right)
                && (feet_y - surface.top).abs() <= self.config.position_epsilon_px
        });
        let vertical_speed = player.velocity().y;

        ComponentFlags {
            physics: player.physics_on_ground(),
            position: position_ok,
            velocity: vertical_speed.is_finite()
                && vertical_speed.abs() <= self.config.velocity_epsilon,
        }
    }

    fn remember(&mut self, estimate: GroundEstimate) {
        if estimate.is_on_ground {
            self.last_ground_contact_ms = Some(estimate.computed_at_ms);
        }
        let previous = self.history.latest().map(|latest| latest.is_on_ground);
        if let Some(from_on_ground) = previous.filter(|was| *was != estimate.is_on_ground) {
            debug!(
                from_on_ground,
                to_on_ground = estimate.is_on_ground,
                confidence = estimate.confidence,
                "ground_transition"
            );
            self.transitions.push(GroundTransition {
                at_ms: estimate.computed_at_ms,
                from_on_ground,
                to_on_ground: estimate.is_on_ground,
                confidence: estimate.confidence,
            });
        }
        self.history.push(estimate);
    }
}

#[cfg(test)]
mod tests {
    use crate::player::testing::StubPlayer;
    use crate::player::Vec2;

    use super::*;

    const FLOOR: Surface = Surface {
        left: 0.0,
        right: 800.0,
        top: 400.0,
    };

    fn all_flag_combinations() -> Vec<ComponentFlags> {
        let mut combinations = Vec::new();
        for physics in [false, true] {
            for position in [false, true] {
                for velocity in [false, true] {
                    combinations.push(ComponentFlags {
                        physics,
                        position,
                        velocity,
                    });
                }
            }
        }
        combinations
    }

    #[test]
    fn confidence_hits_bounds_only_at_all_false_and_all_true() {
        let config = GroundConfig::default();
        for flags in all_flag_combinations() {
            let confidence = confidence_for(flags, &config);
            let all_false = flags == ComponentFlags::NONE;
            let all_true = flags == ComponentFlags::ALL;
            assert_eq!(confidence == 0.0, all_false, "{flags:?}");
            assert_eq!(confidence == 1.0, all_true, "{flags:?}");
            assert!((0.0..=1.0).contains(&confidence));
        }
    }

    #[test]
    fn physics_contact_is_authoritative() {
        let config = GroundConfig {
            on_ground_threshold: 0.9,
            ..GroundConfig::default()
        };
        for flags in all_flag_combinations().into_iter().filter(|flags| flags.physics) {
            let estimate = GroundEstimate::from_components(flags, &config, 0.0);
            assert!(estimate.is_on_ground, "{flags:?}");
        }
    }

    #[test]
    fn position_and_velocity_alone_reach_threshold() {
        let estimate = GroundEstimate::from_components(
            ComponentFlags {
                physics: false,
                position: true,
                velocity: true,
            },
            &GroundConfig::default(),
            0.0,
        );
        assert!((estimate.confidence - 0.5).abs() < 1e-6);
        assert!(estimate.is_on_ground);

        let velocity_only = GroundEstimate::from_components(
            ComponentFlags {
                physics: false,
                position: false,
                velocity: true,
            },
            &GroundConfig::default(),
            0.0,
        );
        assert!(!velocity_only.is_on_ground);
    }

    #[test]
    fn standing_player_passes_every_check() {
        let mut estimator = GroundStateEstimator::new(GroundConfig::default());
        let player = StubPlayer::standing_on(FLOOR.top);

        let estimate = estimator.estimate(Some(&player), &[FLOOR], 16.0);

        assert_eq!(estimate.components, ComponentFlags::ALL);
        assert_eq!(estimate.confidence, 1.0);
        assert!(estimate.is_on_ground);
        assert_eq!(estimate.computed_at_ms, 16.0);
    }

    #[test]
    fn airborne_player_fails_every_check() {
        let mut estimator = GroundStateEstimator::new(GroundConfig::default());
        let player = StubPlayer {
            position: Vec2::new(100.0, 200.0),
            velocity: Vec2::new(0.0, -300.0),
            on_ground: false,
            ..StubPlayer::standing_on(FLOOR.top)
        };

        let estimate = estimator.estimate(Some(&player), &[FLOOR], 16.0);

        assert_eq!(estimate.components, ComponentFlags::NONE);
        assert_eq!(estimate.confidence, 0.0);
        assert!(!estimate.is_on_ground);
    }

    #[test]
    fn position_check_uses_epsilon_and_horizontal_overlap() {
        let mut estimator = GroundStateEstimator::new(GroundConfig::default());
        let mut player = StubPlayer::standing_on(FLOOR.top);
        player.position.y += 1.5;
        assert!(estimator.estimate(Some(&player), &[FLOOR], 0.0).components.position);

        player.position.y += 1.0;
        assert!(!estimator.estimate(Some(&player), &[FLOOR], 1.0).components.position);

        let ledge = Surface {
            left: 0.0,
            right: 50.0,
            top: FLOOR.top,
        };
        let beside = StubPlayer::standing_on(FLOOR.top);
        assert!(!estimator.estimate(Some(&beside), &[ledge], 2.0).components.position);
    }

    #[test]
    fn missing_player_is_conservative() {
        let mut estimator = GroundStateEstimator::new(GroundConfig::default());
        let estimate = estimator.estimate(None, &[FLOOR], 5.0);
        assert_eq!(estimate.components, ComponentFlags::NONE);
        assert_eq!(estimate.confidence, 0.0);
        assert!(!estimate.is_on_ground);
        assert_eq!(estimator.time_since_last_ground_contact(5.0), None);
    }

    #[test]
    fn history_is_bounded_and_transitions_are_tracked() {
        let config = GroundConfig {
            history_capacity: 4,
            ..GroundConfig::default()
        };
        let mut estimator = GroundStateEstimator::new(config);
        let grounded = StubPlayer::standing_on(FLOOR.top);
        let mut airborne = grounded;
        airborne.on_ground = false;
        airborne.position.y -= 80.0;
        airborne.velocity.y = -200.0;

        estimator.estimate(Some(&grounded), &[FLOOR], 0.0);
        estimator.estimate(Some(&grounded), &[FLOOR], 16.0);
        estimator.estimate(Some(&airborne), &[FLOOR], 32.0);
        for step in 0..5 {
            estimator.estimate(Some(&airborne), &[FLOOR], 48.0 + step as f64 * 16.0);
        }
        estimator.estimate(Some(&grounded), &[FLOOR], 200.0);

        assert_eq!(estimator.history().len(), 4);
        let transitions: Vec<_> = estimator.transitions().iter().copied().collect();
        assert_eq!(transitions.len(), 2);
        assert!(transitions[0].from_on_ground && !transitions[0].to_on_ground);
        assert_eq!(transitions[0].at_ms, 32.0);
        assert!(!transitions[1].from_on_ground && transitions[1].to_on_ground);
        assert_eq!(estimator.time_since_last_ground_contact(250.0), Some(50.0));
    }

    #[test]
    fn last_contact_survives_history_eviction() {
        let config = GroundConfig {
            history_capacity: 2,
            ..GroundConfig::default()
        };
        let mut estimator = GroundStateEstimator::new(config);
        let grounded = StubPlayer::standing_on(FLOOR.top);
        estimator.estimate(Some(&grounded), &[FLOOR], 10.0);
        for step in 0..6 {
            estimator.estimate(None, &[FLOOR], 20.0 + step as f64);
        }
        assert_eq!(estimator.time_since_last_ground_contact(110.0), Some(100.0));
    }
}
