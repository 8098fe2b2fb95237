use jumpcore::{BlockingReason, DisplaySnapshot, GroundEstimate, JumpAttempt, PlayerBody};
use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use super::world::World;

const WORLD_WIDTH: f32 = 960.0;
const WORLD_HEIGHT: f32 = 540.0;

const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];
const PLATFORM_COLOR: [u8; 4] = [86, 92, 108, 255];
const PLAYER_GROUNDED_COLOR: [u8; 4] = [110, 210, 120, 255];
const PLAYER_AIRBORNE_COLOR: [u8; 4] = [90, 160, 240, 255];
const PLAYER_BLOCKING_COLOR: [u8; 4] = [240, 150, 60, 255];
const HUD_PANEL_COLOR: [u8; 4] = [12, 14, 18, 255];
const HUD_OUTLINE_COLOR: [u8; 4] = [60, 66, 80, 255];
const CONFIDENCE_FILL_COLOR: [u8; 4] = [110, 210, 120, 255];
const CONFIDENCE_LOW_COLOR: [u8; 4] = [200, 90, 90, 255];
const THRESHOLD_MARK_COLOR: [u8; 4] = [240, 240, 240, 255];
const COMPONENT_ON_COLOR: [u8; 4] = [230, 230, 120, 255];
const COMPONENT_OFF_COLOR: [u8; 4] = [48, 52, 60, 255];
const THROTTLED_COLOR: [u8; 4] = [240, 180, 40, 255];
const ATTEMPT_EXECUTED_COLOR: [u8; 4] = [110, 210, 120, 255];
const ATTEMPT_NO_INPUT_COLOR: [u8; 4] = [150, 150, 160, 255];
const ATTEMPT_BLOCKING_COLOR: [u8; 4] = [240, 150, 60, 255];
const ATTEMPT_NOT_GROUNDED_COLOR: [u8; 4] = [200, 90, 90, 255];

const HUD_X: i32 = 8;
const HUD_Y: i32 = 8;
const HUD_WIDTH: i32 = 148;
const HUD_HEIGHT: i32 = 52;
const CONFIDENCE_BAR_WIDTH: i32 = 132;
const CONFIDENCE_BAR_HEIGHT: i32 = 10;
const LIGHT_SIZE: i32 = 10;
const PIP_SIZE: i32 = 8;
const PIP_GAP: i32 = 3;

/// Everything the HUD shows, taken from the latest display refresh.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HudView<'a> {
    pub(crate) snapshot: &'a DisplaySnapshot,
    pub(crate) on_ground_threshold: f32,
}

pub(crate) struct Renderer {
    window: &'static Window,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
}

impl Renderer {
    pub(crate) fn new(window: &'static Window) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(window, size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            width: size.width,
            height: size.height,
        })
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(self.window, width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn build_pixels(
        window: &'static Window,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render(&mut self, world: &World, hud: Option<HudView<'_>>) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }
        let (width, height) = (self.width, self.height);
        let frame = self.pixels.frame_mut();
        draw_world(frame, width, height, world);
        if let Some(hud) = hud {
            draw_hud(frame, width, height, hud);
        }
        self.pixels.render()
    }
}

fn view_scale(width: u32, height: u32) -> f32 {
    (width as f32 / WORLD_WIDTH)
        .min(height as f32 / WORLD_HEIGHT)
        .max(0.1)
}

fn draw_world(frame: &mut [u8], width: u32, height: u32, world: &World) {
    for pixel in frame.chunks_exact_mut(4) {
        pixel.copy_from_slice(&CLEAR_COLOR);
    }

    let scale = view_scale(width, height);
    let to_px = |value: f32| (value * scale).round() as i32;

    for platform in &world.platforms {
        draw_filled_rect(
            frame,
            width,
            height,
            to_px(platform.x),
            to_px(platform.y),
            to_px(platform.width),
            to_px(platform.height),
            PLATFORM_COLOR,
        );
    }

    let player = &world.player;
    draw_filled_rect(
        frame,
        width,
        height,
        to_px(player.position.x),
        to_px(player.position.y),
        to_px(player.size.x),
        to_px(player.size.y),
        player_color(player),
    );
}

fn player_color(player: &dyn PlayerBody) -> [u8; 4] {
    if player.is_blocking() {
        PLAYER_BLOCKING_COLOR
    } else if player.physics_on_ground() {
        PLAYER_GROUNDED_COLOR
    } else {
        PLAYER_AIRBORNE_COLOR
    }
}

fn draw_hud(frame: &mut [u8], width: u32, height: u32, hud: HudView<'_>) {
    draw_filled_rect(
        frame,
        width,
        height,
        HUD_X,
        HUD_Y,
        HUD_WIDTH,
        HUD_HEIGHT,
        HUD_PANEL_COLOR,
    );
    draw_rect_outline(
        frame,
        width,
        height,
        HUD_X,
        HUD_Y,
        HUD_WIDTH,
        HUD_HEIGHT,
        HUD_OUTLINE_COLOR,
    );

    let bar_x = HUD_X + 8;
    let bar_y = HUD_Y + 8;
    draw_confidence_bar(
        frame,
        width,
        height,
        bar_x,
        bar_y,
        hud.snapshot.ground,
        hud.on_ground_threshold,
    );

    let lights_y = bar_y + CONFIDENCE_BAR_HEIGHT + 4;
    let components = hud.snapshot.ground.map(|ground| ground.components);
    let lit = [
        components.is_some_and(|flags| flags.physics),
        components.is_some_and(|flags| flags.position),
        components.is_some_and(|flags| flags.velocity),
    ];
    for (index, on) in lit.into_iter().enumerate() {
        let color = if on {
            COMPONENT_ON_COLOR
        } else {
            COMPONENT_OFF_COLOR
        };
        let x = bar_x + index as i32 * (LIGHT_SIZE + 4);
        draw_filled_rect(frame, width, height, x, lights_y, LIGHT_SIZE, LIGHT_SIZE, color);
    }
    if hud.snapshot.throttle.throttled {
        let x = bar_x + CONFIDENCE_BAR_WIDTH - LIGHT_SIZE;
        draw_filled_rect(
            frame,
            width,
            height,
            x,
            lights_y,
            LIGHT_SIZE,
            LIGHT_SIZE,
            THROTTLED_COLOR,
        );
    }

    let pips_y = lights_y + LIGHT_SIZE + 4;
    for (index, attempt) in hud.snapshot.recent_attempts.iter().rev().enumerate() {
        let x = bar_x + index as i32 * (PIP_SIZE + PIP_GAP);
        if x + PIP_SIZE > HUD_X + HUD_WIDTH {
            break;
        }
        draw_filled_rect(
            frame,
            width,
            height,
            x,
            pips_y,
            PIP_SIZE,
            PIP_SIZE,
            attempt_color(attempt),
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_confidence_bar(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    ground: Option<GroundEstimate>,
    threshold: f32,
) {
    draw_rect_outline(
        frame,
        width,
        height,
        x - 1,
        y - 1,
        CONFIDENCE_BAR_WIDTH + 2,
        CONFIDENCE_BAR_HEIGHT + 2,
        HUD_OUTLINE_COLOR,
    );
    if let Some(ground) = ground {
        let fill = (ground.confidence.clamp(0.0, 1.0) * CONFIDENCE_BAR_WIDTH as f32).round() as i32;
        let color = if ground.is_on_ground {
            CONFIDENCE_FILL_COLOR
        } else {
            CONFIDENCE_LOW_COLOR
        };
        draw_filled_rect(frame, width, height, x, y, fill, CONFIDENCE_BAR_HEIGHT, color);
    }
    let mark_x = x + (threshold.clamp(0.0, 1.0) * CONFIDENCE_BAR_WIDTH as f32).round() as i32;
    draw_filled_rect(
        frame,
        width,
        height,
        mark_x,
        y - 2,
        1,
        CONFIDENCE_BAR_HEIGHT + 4,
        THRESHOLD_MARK_COLOR,
    );
}

fn attempt_color(attempt: &JumpAttempt) -> [u8; 4] {
    match attempt.blocking_reason() {
        None => ATTEMPT_EXECUTED_COLOR,
        Some(BlockingReason::InputNotDetected) => ATTEMPT_NO_INPUT_COLOR,
        Some(BlockingReason::PlayerBlocking) => ATTEMPT_BLOCKING_COLOR,
        Some(BlockingReason::NotOnGround) => ATTEMPT_NOT_GROUNDED_COLOR,
    }
}

fn write_pixel_rgba(frame: &mut [u8], width: usize, x: usize, y: usize, color: [u8; 4]) {
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }

    frame[byte_offset..end].copy_from_slice(&color);
}

#[allow(clippy::too_many_arguments)]
fn draw_filled_rect(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    let start_x = x.max(0);
    let start_y = y.max(0);
    let end_x = x.saturating_add(rect_width).min(width as i32);
    let end_y = y.saturating_add(rect_height).min(height as i32);
    if end_x <= start_x || end_y <= start_y {
        return;
    }

    let width_usize = width as usize;
    for py in start_y..end_y {
        for px in start_x..end_x {
            write_pixel_rgba(frame, width_usize, px as usize, py as usize, color);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_rect_outline(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    if rect_width <= 1 || rect_height <= 1 {
        return;
    }
    draw_filled_rect(frame, width, height, x, y, rect_width, 1, color);
    draw_filled_rect(
        frame,
        width,
        height,
        x,
        y + rect_height - 1,
        rect_width,
        1,
        color,
    );
    draw_filled_rect(frame, width, height, x, y, 1, rect_height, color);
    draw_filled_rect(
        frame,
        width,
        height,
        x + rect_width - 1,
        y,
        1,
        rect_height,
        color,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(frame: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * width + x) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn filled_rect_is_clipped_to_frame() {
        let (width, height) = (8u32, 6u32);
        let mut frame = vec![0u8; (width * height * 4) as usize];
        let color = [1, 2, 3, 255];

        draw_filled_rect(&mut frame, width, height, -2, 4, 5, 10, color);

        assert_eq!(pixel(&frame, width, 0, 4), color);
        assert_eq!(pixel(&frame, width, 2, 5), color);
        assert_eq!(pixel(&frame, width, 3, 5), [0, 0, 0, 0]);
        assert_eq!(pixel(&frame, width, 0, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn write_pixel_ignores_out_of_range_offsets() {
        let mut frame = vec![0u8; 4 * 4];
        write_pixel_rgba(&mut frame, 2, 5, 5, [9, 9, 9, 9]);
        write_pixel_rgba(&mut frame, usize::MAX, 2, 2, [9, 9, 9, 9]);
        assert!(frame.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn outline_leaves_interior_untouched() {
        let (width, height) = (6u32, 6u32);
        let mut frame = vec![0u8; (width * height * 4) as usize];
        let color = [200, 0, 0, 255];

        draw_rect_outline(&mut frame, width, height, 1, 1, 4, 4, color);

        assert_eq!(pixel(&frame, width, 1, 1), color);
        assert_eq!(pixel(&frame, width, 4, 4), color);
        assert_eq!(pixel(&frame, width, 2, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn world_draw_paints_player_grounded_color() {
        let (width, height) = (960u32, 540u32);
        let mut frame = vec![0u8; (width * height * 4) as usize];
        let mut world = World::demo();
        for _ in 0..5 {
            world.step(1.0 / 60.0, 0.0);
        }

        draw_world(&mut frame, width, height, &world);

        let center_x = (world.player.position.x + world.player.size.x / 2.0) as u32;
        let center_y = (world.player.position.y + world.player.size.y / 2.0) as u32;
        assert_eq!(
            pixel(&frame, width, center_x, center_y),
            PLAYER_GROUNDED_COLOR
        );
        assert_eq!(pixel(&frame, width, 5, 5), CLEAR_COLOR);
    }

    #[test]
    fn view_scale_fits_the_smaller_axis() {
        assert_eq!(view_scale(960, 540), 1.0);
        assert_eq!(view_scale(1920, 540), 1.0);
        assert_eq!(view_scale(1920, 1080), 2.0);
    }
}
