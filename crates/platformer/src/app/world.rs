use jumpcore::{PlayerBody, Surface, Vec2};

const GRAVITY_PX_PER_S2: f32 = 1400.0;
const MAX_FALL_SPEED_PX_PER_S: f32 = 900.0;
const MOVE_SPEED_PX_PER_S: f32 = 220.0;
const PLAYER_SIZE: Vec2 = Vec2::new(24.0, 32.0);
const LANDING_TOLERANCE_PX: f32 = 0.5;
const RESPAWN_FREEZE_SECONDS: f32 = 0.25;
const KILL_PLANE_MARGIN_PX: f32 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Platform {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) width: f32,
    pub(crate) height: f32,
}

impl Platform {
    pub(crate) const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub(crate) fn surface(&self) -> Surface {
        Surface {
            left: self.x,
            right: self.x + self.width,
            top: self.y,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Player {
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) size: Vec2,
    on_ground: bool,
    /// Seconds left of the post-respawn freeze, during which jumps are blocked.
    respawn_freeze: f32,
}

impl Player {
    fn spawned_at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            size: PLAYER_SIZE,
            on_ground: false,
            respawn_freeze: 0.0,
        }
    }

    fn feet_y(&self) -> f32 {
        self.position.y + self.size.y
    }
}

impl PlayerBody for Player {
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
        self.respawn_freeze > 0.0
    }

    fn apply_jump_impulse(&mut self, impulse: f32) {
        self.velocity.y = -impulse.abs();
        self.on_ground = false;
    }
}

#[derive(Debug, Clone)]
pub(crate) struct World {
    pub(crate) player: Player,
    pub(crate) platforms: Vec<Platform>,
    spawn: Vec2,
    width: f32,
    kill_plane_y: f32,
    respawns: u64,
}

impl World {
    pub(crate) fn new(width: f32, height: f32, platforms: Vec<Platform>, spawn: Vec2) -> Self {
        Self {
            player: Player::spawned_at(spawn),
            platforms,
            spawn,
            width,
            kill_plane_y: height + KILL_PLANE_MARGIN_PX,
            respawns: 0,
        }
    }

    /// Floor with a gap and a few ledges, laid out for a 960x540 view.
    pub(crate) fn demo() -> Self {
        let platforms = vec![
            Platform::new(0.0, 500.0, 600.0, 40.0),
            Platform::new(700.0, 500.0, 260.0, 40.0),
            Platform::new(180.0, 450.0, 120.0, 12.0),
            Platform::new(360.0, 400.0, 120.0, 12.0),
            Platform::new(760.0, 450.0, 140.0, 12.0),
        ];
        Self::new(960.0, 540.0, platforms, Vec2::new(80.0, 500.0 - PLAYER_SIZE.y))
    }

    pub(crate) fn surfaces(&self) -> Vec<Surface> {
        self.platforms.iter().map(Platform::surface).collect()
    }

    pub(crate) fn respawns(&self) -> u64 {
        self.respawns
    }

    /// Advances one fixed step. `axis` is -1, 0 or 1 from the held movement
    /// actions.
    pub(crate) fn step(&mut self, dt_seconds: f32, axis: f32) {
        let player = &mut self.player;
        if player.respawn_freeze > 0.0 {
            player.respawn_freeze = (player.respawn_freeze - dt_seconds).max(0.0);
            player.velocity = Vec2::ZERO;
            return;
        }

        player.velocity.x = axis.clamp(-1.0, 1.0) * MOVE_SPEED_PX_PER_S;
        player.velocity.y =
            (player.velocity.y + GRAVITY_PX_PER_S2 * dt_seconds).min(MAX_FALL_SPEED_PX_PER_S);

        let previous_feet = player.feet_y();
        let max_x = (self.width - player.size.x).max(0.0);
        player.position.x = (player.position.x + player.velocity.x * dt_seconds).clamp(0.0, max_x);
        player.position.y += player.velocity.y * dt_seconds;
        player.on_ground = false;

        if player.velocity.y >= 0.0 {
            let left = player.position.x;
            let right = player.position.x + player.size.x;
            let feet = player.feet_y();
            let landing_top = self
                .platforms
                .iter()
                .map(Platform::surface)
                .filter(|surface| {
                    surface.overlaps_span(left, right)
                        && previous_feet <= surface.top + LANDING_TOLERANCE_PX
                        && feet >= surface.top
                })
                .map(|surface| surface.top)
                .reduce(f32::min);
            if let Some(top) = landing_top {
                player.position.y = top - player.size.y;
                player.velocity.y = 0.0;
                player.on_ground = true;
            }
        }

        if player.position.y > self.kill_plane_y {
            self.respawn();
        }
    }

    fn respawn(&mut self) {
        self.respawns += 1;
        self.player = Player::spawned_at(self.spawn);
        self.player.on_ground = true;
        self.player.respawn_freeze = RESPAWN_FREEZE_SECONDS;
    }
}
