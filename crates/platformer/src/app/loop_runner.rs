use std::process::ExitCode;
use std::time::{Duration, Instant};

use jumpcore::{
    overlay_lines, ConfigError, DisplaySnapshot, JumpAttempt, JumpPipeline, RawInputEvent,
};
use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::bootstrap::AppWiring;
use super::keys;
use super::metrics::MetricsAccumulator;
use super::renderer::{HudView, Renderer};
use super::world::World;

#[derive(Debug, Clone)]
pub(crate) struct LoopConfig {
    pub(crate) window_title: String,
    pub(crate) window_width: u32,
    pub(crate) window_height: u32,
    pub(crate) target_tps: u32,
    pub(crate) max_frame_delta: Duration,
    pub(crate) max_ticks_per_frame: u32,
    pub(crate) metrics_log_interval: Duration,
    /// How long the self-test hotkey holds the synthetic jump key.
    pub(crate) self_test_hold_ms: f64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Jump Lab".to_string(),
            window_width: 960,
            window_height: 540,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            self_test_hold_ms: 80.0,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("invalid pipeline config")]
    Config(#[from] ConfigError),
    #[error("failed to create event loop")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create window")]
    CreateWindow(#[source] OsError),
    #[error("failed to create renderer")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed while running")]
    EventLoopRun(#[source] EventLoopError),
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    if let Err(err) = run_app(app) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run_app(app: AppWiring) -> Result<(), AppError> {
    let AppWiring {
        loop_config: config,
        pipeline_config,
        governor,
    } = app;
    let mut pipeline = JumpPipeline::new(pipeline_config, governor)?;
    let on_ground_threshold = pipeline.config().ground.on_ground_threshold;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window: &'static winit::window::Window = Box::leak(Box::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    ));
    let mut renderer = Renderer::new(window).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let self_test_hold_ms = config.self_test_hold_ms.max(0.0);

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        self_test_hold_ms,
        "loop_config"
    );

    let session_start = Instant::now();
    let mut world = World::demo();
    let mut hotkeys = HotkeyCollector::default();
    let mut focused = true;
    pipeline.set_focus(focused, 0.0);

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut overlay_visible = true;
    let mut latest_display: Option<DisplaySnapshot> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::Focused(is_focused) => {
                    focused = is_focused;
                    pipeline.set_focus(is_focused, session_ms(session_start, Instant::now()));
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if hotkeys.handle_key(event.physical_key, event.state) {
                        if hotkeys.quit_requested {
                            info!(reason = "escape_key", "shutdown_requested");
                            window_target.exit();
                        }
                        return;
                    }
                    let raw = keys::raw_from_key_event(&event, focused);
                    feed_raw_event(&mut pipeline, &raw, session_start);
                }
                WindowEvent::Touch(touch) => {
                    if let Some(raw) = keys::raw_from_touch(touch.phase, touch.id, focused) {
                        feed_raw_event(&mut pipeline, &raw, session_start);
                    }
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    if let Some(raw) = keys::raw_from_mouse(button, state, focused) {
                        feed_raw_event(&mut pipeline, &raw, session_start);
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let now_ms = session_ms(session_start, now);

                    if hotkeys.take_overlay_toggle_pressed() {
                        overlay_visible = !overlay_visible;
                        info!(overlay_visible, "overlay_toggled");
                    }
                    if hotkeys.take_self_test_pressed() {
                        let code = pipeline.config().input.primary_jump_code.clone();
                        pipeline
                            .schedule_mut()
                            .schedule_tap(now_ms, &code, self_test_hold_ms);
                        info!(code = code.as_str(), hold_ms = self_test_hold_ms, "self_test_scheduled");
                    }
                    if hotkeys.take_export_pressed() {
                        log_export_report(&pipeline, now_ms);
                    }

                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                    accumulator = accumulator.saturating_add(clamped_frame_dt);

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    let surfaces = world.surfaces();
                    for _ in 0..step_plan.ticks_to_run {
                        let tick_ms = session_ms(session_start, Instant::now());
                        let report = pipeline.tick(Some(&mut world.player), &surfaces, tick_ms);
                        world.step(fixed_dt_seconds, report.intent.horizontal_axis());
                        metrics_accumulator
                            .record_tick(report.attempt.as_ref().map(JumpAttempt::executed));
                    }
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        metrics_accumulator.record_dropped_backlog(step_plan.dropped_backlog);
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    if let Some(display) = pipeline.poll_display(now_ms) {
                        latest_display = Some(display);
                    }
                    let hud = if overlay_visible {
                        latest_display.as_ref().map(|snapshot| HudView {
                            snapshot,
                            on_ground_threshold,
                        })
                    } else {
                        None
                    };
                    if let Err(error) = renderer.render(&world, hud) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    metrics_accumulator.record_frame(raw_frame_dt);

                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        let throttle = pipeline.governor().throttle_state();
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            jump_edges = snapshot.jump_edges,
                            jumps_executed = snapshot.jumps_executed,
                            dropped_backlog_ms = snapshot.dropped_backlog_ms,
                            respawns = world.respawns(),
                            throttled = throttle.throttled,
                            "loop_metrics"
                        );
                        if overlay_visible {
                            if let Some(display_snapshot) = &latest_display {
                                info!(overlay = %overlay_lines(display_snapshot).join(" | "), "diagnostics_overlay");
                            }
                        }
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                let summary = pipeline.recorder().summary();
                info!(
                    total_attempts = summary.total_attempts,
                    successful_jumps = summary.successful_jumps,
                    failed_jumps = summary.failed_jumps,
                    "shutdown"
                );
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn feed_raw_event(pipeline: &mut JumpPipeline, raw: &RawInputEvent, session_start: Instant) {
    let received_at_ms = session_ms(session_start, Instant::now());
    pipeline.handle_raw_event(raw, received_at_ms);
}

fn log_export_report(pipeline: &JumpPipeline, now_ms: f64) {
    let report = pipeline.export_report(now_ms);
    match serde_json::to_string_pretty(&report) {
        Ok(json) => info!(
            total_attempts = report.summary.total_attempts,
            report = %json,
            "diagnostic_report_exported"
        ),
        Err(error) => warn!(error = %error, "diagnostic_report_export_failed"),
    }
}

fn session_ms(session_start: Instant, now: Instant) -> f64 {
    now.saturating_duration_since(session_start).as_secs_f64() * 1000.0
}

/// Host hotkeys, edge-triggered so a held key fires once. These keys are not
/// forwarded to the jump pipeline.
#[derive(Debug, Default)]
struct HotkeyCollector {
    quit_requested: bool,
    self_test_is_down: bool,
    self_test_pressed_edge: bool,
    overlay_toggle_is_down: bool,
    overlay_toggle_pressed_edge: bool,
    export_is_down: bool,
    export_pressed_edge: bool,
}

impl HotkeyCollector {
    /// Returns whether the key was a hotkey.
    fn handle_key(&mut self, key: PhysicalKey, state: ElementState) -> bool {
        let PhysicalKey::Code(code) = key else {
            return false;
        };
        let pressed = state == ElementState::Pressed;
        match code {
            KeyCode::Escape => {
                if pressed {
                    self.quit_requested = true;
                }
            }
            KeyCode::F2 => record_edge(
                &mut self.self_test_is_down,
                &mut self.self_test_pressed_edge,
                pressed,
            ),
            KeyCode::F3 => record_edge(
                &mut self.overlay_toggle_is_down,
                &mut self.overlay_toggle_pressed_edge,
                pressed,
            ),
            KeyCode::F4 => record_edge(
                &mut self.export_is_down,
                &mut self.export_pressed_edge,
                pressed,
            ),
            _ => return false,
        }
        true
    }

    fn take_self_test_pressed(&mut self) -> bool {
        std::mem::take(&mut self.self_test_pressed_edge)
    }

    fn take_overlay_toggle_pressed(&mut self) -> bool {
        std::mem::take(&mut self.overlay_toggle_pressed_edge)
    }

    fn take_export_pressed(&mut self) -> bool {
        std::mem::take(&mut self.export_pressed_edge)
    }
}

fn record_edge(is_down: &mut bool, pressed_edge: &mut bool, pressed: bool) {
    if pressed && !*is_down {
        *pressed_edge = true;
    }
    *is_down = pressed;
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(50), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(2));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn zero_durations_fall_back() {
        let fallback = Duration::from_secs(1);
        assert_eq!(normalize_non_zero_duration(Duration::ZERO, fallback), fallback);
        assert_eq!(
            normalize_non_zero_duration(Duration::from_millis(5), fallback),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn f3_toggle_is_edge_triggered() {
        let mut hotkeys = HotkeyCollector::default();
        let f3 = PhysicalKey::Code(KeyCode::F3);

        assert!(hotkeys.handle_key(f3, ElementState::Pressed));
        assert!(hotkeys.take_overlay_toggle_pressed());

        hotkeys.handle_key(f3, ElementState::Pressed);
        assert!(!hotkeys.take_overlay_toggle_pressed());

        hotkeys.handle_key(f3, ElementState::Released);
        hotkeys.handle_key(f3, ElementState::Pressed);
        assert!(hotkeys.take_overlay_toggle_pressed());
    }

    #[test]
    fn held_self_test_key_schedules_once() {
        let mut hotkeys = HotkeyCollector::default();
        let f2 = PhysicalKey::Code(KeyCode::F2);

        for _ in 0..10 {
            hotkeys.handle_key(f2, ElementState::Pressed);
        }
        assert!(hotkeys.take_self_test_pressed());
        assert!(!hotkeys.take_self_test_pressed());
    }

    #[test]
    fn jump_keys_are_not_hotkeys() {
        let mut hotkeys = HotkeyCollector::default();
        assert!(!hotkeys.handle_key(PhysicalKey::Code(KeyCode::Space), ElementState::Pressed));
        assert!(hotkeys.handle_key(PhysicalKey::Code(KeyCode::Escape), ElementState::Pressed));
        assert!(hotkeys.quit_requested);
        assert!(!hotkeys.take_export_pressed());
    }

    #[test]
    fn session_clock_reports_milliseconds() {
        let start = Instant::now();
        let later = start + Duration::from_millis(1500);
        assert!((session_ms(start, later) - 1500.0).abs() < 1e-6);
        assert_eq!(session_ms(later, start), 0.0);
    }
}
