use serde::{Deserialize, Serialize};

/// Screen-space vector. `y` grows downward, so a jump impulse is negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Top edge of a solid platform spanning `left..=right`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub left: f32,
    pub right: f32,
    pub top: f32,
}

impl Surface {
    pub fn overlaps_span(&self, left: f32, right: f32) -> bool {
        left <= self.right && right >= self.left
    }
}

/// What the pipeline needs from the player entity. `position` is the top-left
/// corner of the bounding box.
pub trait PlayerBody {
    fn position(&self) -> Vec2;
    fn velocity(&self) -> Vec2;
    fn size(&self) -> Vec2;
    /// Contact flag written by the last collision-resolution pass.
    fn physics_on_ground(&self) -> bool;
    fn is_blocking(&self) -> bool;
    fn apply_jump_impulse(&mut self, impulse: f32);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerFlags {
    pub is_blocking: bool,
}

/// Copy of the player's kinematic state at decision time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl BodySnapshot {
    pub fn capture(player: &dyn PlayerBody) -> Self {
        Self {
            position: player.position(),
            velocity: player.velocity(),
        }
    }
}

impl PlayerFlags {
    pub fn capture(player: &dyn PlayerBody) -> Self {
        Self {
            is_blocking: player.is_blocking(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub(crate) struct StubPlayer {
        pub position: Vec2,
        pub velocity: Vec2,
        pub size: Vec2,
        pub on_ground: bool,
        pub blocking: bool,
    }

    impl StubPlayer {
        /// Standing with feet exactly on `surface_top`.
        pub(crate) fn standing_on(surface_top: f32) -> Self {
            Self {
                position: Vec2::new(100.0, surface_top - 32.0),
                velocity: Vec2::ZERO,
                size: Vec2::new(24.0, 32.0),
                on_ground: true,
                blocking: false,
            }
        }
    }

    impl PlayerBody for StubPlayer {
        fn position(&self) -> Vec2 {
            self.position
        }

        fn velocity(&self) -> Vec2 {
            self.velocity
        }

        fn size(&self) -> Vec2 {
            self.size
        }

        fn physics_on_ground(&self) -> bool {
            self.on_ground
        }

        fn is_blocking(&self) -> bool {
            self.blocking
        }

        fn apply_jump_impulse(&mut self, impulse: f32) {
            self.velocity.y = -impulse.abs();
            self.on_ground = false;
        }
    }
}
