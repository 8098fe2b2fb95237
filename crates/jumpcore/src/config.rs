use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PRIMARY_JUMP_CODE: &str = "Space";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {origin} at {field_path}: {message}")]
    Parse {
        origin: String,
        field_path: String,
        message: String,
    },
    #[error("invalid config value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub input: InputConfig,
    pub ground: GroundConfig,
    pub jump: JumpConfig,
    pub diagnostics: RecorderConfig,
    pub governor: GovernorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    pub primary_jump_code: String,
    pub alternate_jump_codes: Vec<String>,
    pub move_left_codes: Vec<String>,
    pub move_right_codes: Vec<String>,
    /// Used only when the platform does not report a `repeat` flag.
    pub duplicate_window_ms: f64,
    pub cross_source_window_ms: f64,
    pub suppress_default_for_movement: bool,
    /// A jump edge from an unfocused target counts as "input not detected".
    pub require_focus: bool,
    pub event_history_capacity: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            primary_jump_code: DEFAULT_PRIMARY_JUMP_CODE.to_string(),
            alternate_jump_codes: vec![
                "ArrowUp".to_string(),
                "KeyW".to_string(),
                "Enter".to_string(),
            ],
            move_left_codes: vec!["ArrowLeft".to_string(), "KeyA".to_string()],
            move_right_codes: vec!["ArrowRight".to_string(), "KeyD".to_string()],
            duplicate_window_ms: 100.0,
            cross_source_window_ms: 50.0,
            suppress_default_for_movement: true,
            require_focus: true,
            event_history_capacity: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroundConfig {
    pub physics_weight: f32,
    pub position_weight: f32,
    pub velocity_weight: f32,
    pub on_ground_threshold: f32,
    pub position_epsilon_px: f32,
    pub velocity_epsilon: f32,
    pub history_capacity: usize,
    pub transition_capacity: usize,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            physics_weight: 0.5,
            position_weight: 0.3,
            velocity_weight: 0.2,
            on_ground_threshold: 0.5,
            position_epsilon_px: 2.0,
            velocity_epsilon: 5.0,
            history_capacity: 50,
            transition_capacity: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JumpConfig {
    /// Magnitude of the upward velocity set on a successful jump.
    pub jump_impulse: f32,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            jump_impulse: 420.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecorderConfig {
    pub attempt_capacity: usize,
    pub report_window: usize,
    pub min_history_capacity: usize,
    pub display_attempts: usize,
    pub export_attempts: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            attempt_capacity: 100,
            report_window: 20,
            min_history_capacity: 10,
            display_attempts: 5,
            export_attempts: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GovernorConfig {
    /// `None` lets the environment classification decide.
    pub diagnostics_enabled: Option<bool>,
    pub overhead_budget_ms: f32,
    pub feature_window: usize,
    pub sustained_breaches: u32,
    pub recovery_samples: u32,
    pub base_update_hz: f32,
    pub min_update_hz: f32,
    pub min_history_scale: f32,
    pub retry_interval: u32,
    pub signal_weights: SignalWeights,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            diagnostics_enabled: None,
            overhead_budget_ms: 2.0,
            feature_window: 10,
            sustained_breaches: 3,
            recovery_samples: 30,
            base_update_hz: 60.0,
            min_update_hz: 15.0,
            min_history_scale: 0.25,
            retry_interval: 120,
            signal_weights: SignalWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SignalWeights {
    pub hostname: f32,
    pub protocol: f32,
    pub debug_flag: f32,
    pub debug_console: f32,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            hostname: 1.0,
            protocol: 1.0,
            debug_flag: 1.0,
            debug_console: 1.0,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.input.validate()?;
        self.ground.validate()?;
        self.jump.validate()?;
        self.diagnostics.validate()?;
        self.governor.validate()
    }
}

impl InputConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.primary_jump_code.trim().is_empty() {
            return Err(invalid("input.primary_jump_code", "must not be empty"));
        }
        if !(50.0..=150.0).contains(&self.duplicate_window_ms) {
            return Err(invalid(
                "input.duplicate_window_ms",
                format!("expected 50..=150, got {}", self.duplicate_window_ms),
            ));
        }
        require_finite_non_negative(
            "input.cross_source_window_ms",
            self.cross_source_window_ms as f32,
        )?;
        require_positive_capacity("input.event_history_capacity", self.event_history_capacity)
    }
}

impl GroundConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, weight) in [
            ("ground.physics_weight", self.physics_weight),
            ("ground.position_weight", self.position_weight),
            ("ground.velocity_weight", self.velocity_weight),
        ] {
            if !(weight > 0.0 && weight <= 1.0) {
                return Err(invalid(field, format!("expected (0, 1], got {weight}")));
            }
        }
        let sum = self.physics_weight + self.position_weight + self.velocity_weight;
        if sum > 1.0 + 1e-5 {
            return Err(invalid(
                "ground.weights",
                format!("weights must sum to at most 1.0, got {sum}"),
            ));
        }
        if !(self.on_ground_threshold > 0.0 && self.on_ground_threshold <= 1.0) {
            return Err(invalid(
                "ground.on_ground_threshold",
                format!("expected (0, 1], got {}", self.on_ground_threshold),
            ));
        }
        require_finite_non_negative("ground.position_epsilon_px", self.position_epsilon_px)?;
        require_finite_non_negative("ground.velocity_epsilon", self.velocity_epsilon)?;
        require_positive_capacity("ground.history_capacity", self.history_capacity)?;
        require_positive_capacity("ground.transition_capacity", self.transition_capacity)
    }
}

impl JumpConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.jump_impulse.is_finite() && self.jump_impulse > 0.0) {
            return Err(invalid(
                "jump.jump_impulse",
                format!("expected a positive magnitude, got {}", self.jump_impulse),
            ));
        }
        Ok(())
    }
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive_capacity("diagnostics.attempt_capacity", self.attempt_capacity)?;
        require_positive_capacity("diagnostics.report_window", self.report_window)?;
        require_positive_capacity(
            "diagnostics.min_history_capacity",
            self.min_history_capacity,
        )
    }

    /// Throttling never shrinks the attempt buffer below this. A floor above
    /// `attempt_capacity` is clamped rather than rejected, so a small buffer
    /// can be configured on its own.
    pub fn history_floor(&self) -> usize {
        self.min_history_capacity.min(self.attempt_capacity)
    }
}

impl GovernorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.overhead_budget_ms.is_finite() && self.overhead_budget_ms > 0.0) {
            return Err(invalid(
                "governor.overhead_budget_ms",
                format!("expected a positive budget, got {}", self.overhead_budget_ms),
            ));
        }
        require_positive_capacity("governor.feature_window", self.feature_window)?;
        if self.sustained_breaches == 0 {
            return Err(invalid("governor.sustained_breaches", "must be at least 1"));
        }
        if self.recovery_samples == 0 {
            return Err(invalid("governor.recovery_samples", "must be at least 1"));
        }
        if !(self.min_update_hz > 0.0 && self.min_update_hz <= self.base_update_hz) {
            return Err(invalid(
                "governor.min_update_hz",
                format!(
                    "expected 0 < min_update_hz <= base_update_hz ({}), got {}",
                    self.base_update_hz, self.min_update_hz
                ),
            ));
        }
        if !(self.min_history_scale > 0.0 && self.min_history_scale <= 1.0) {
            return Err(invalid(
                "governor.min_history_scale",
                format!("expected (0, 1], got {}", self.min_history_scale),
            ));
        }
        if self.retry_interval == 0 {
            return Err(invalid("governor.retry_interval", "must be at least 1"));
        }
        let weights = self.signal_weights;
        for (field, weight) in [
            ("governor.signal_weights.hostname", weights.hostname),
            ("governor.signal_weights.protocol", weights.protocol),
            ("governor.signal_weights.debug_flag", weights.debug_flag),
            ("governor.signal_weights.debug_console", weights.debug_console),
        ] {
            require_finite_non_negative(field, weight)?;
        }
        Ok(())
    }
}

pub fn load_pipeline_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_pipeline_config(&raw, &path.display().to_string())
}

pub fn parse_pipeline_config(raw: &str, origin: &str) -> Result<PipelineConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let config = serde_path_to_error::deserialize::<_, PipelineConfig>(&mut deserializer)
        .map_err(|error| {
            let field_path = error.path().to_string();
            ConfigError::Parse {
                origin: origin.to_string(),
                field_path: if field_path.is_empty() {
                    ".".to_string()
                } else {
                    field_path
                },
                message: error.into_inner().to_string(),
            }
        })?;
    config.validate()?;
    Ok(config)
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

fn require_positive_capacity(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(field, "capacity must be at least 1"));
    }
    Ok(())
}

fn require_finite_non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(invalid(
            field,
            format!("expected a finite non-negative value, got {value}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        PipelineConfig::default().validate().expect("defaults");
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("pipeline.json");
        fs::write(
            &path,
            r#"{ "diagnostics": { "attempt_capacity": 5 }, "governor": { "min_update_hz": 20.0 } }"#,
        )
        .expect("write config");

        let config = load_pipeline_config(&path).expect("load");
        assert_eq!(config.diagnostics.attempt_capacity, 5);
        assert_eq!(config.diagnostics.report_window, 20);
        assert_eq!(config.governor.min_update_hz, 20.0);
        assert_eq!(config.input, InputConfig::default());
    }

    #[test]
    fn parse_error_names_the_failing_field_path() {
        let error = parse_pipeline_config(
            r#"{ "ground": { "history_capacity": "lots" } }"#,
            "inline",
        )
        .expect_err("string capacity should fail");

        match error {
            ConfigError::Parse { field_path, .. } => {
                assert_eq!(field_path, "ground.history_capacity");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = parse_pipeline_config(r#"{ "input": { "jump_code": "Space" } }"#, "inline")
            .expect_err("unknown field");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_reports_read_error() {
        let temp = TempDir::new().expect("temp");
        let error =
            load_pipeline_config(&temp.path().join("absent.json")).expect_err("missing file");
        assert!(matches!(error, ConfigError::Read { .. }));
    }

    #[test]
    fn small_attempt_capacity_clamps_history_floor() {
        let config = parse_pipeline_config(r#"{ "diagnostics": { "attempt_capacity": 5 } }"#, "inline")
            .expect("capacity below the default floor is accepted");
        assert_eq!(config.diagnostics.min_history_capacity, 10);
        assert_eq!(config.diagnostics.history_floor(), 5);
        assert_eq!(RecorderConfig::default().history_floor(), 10);
    }

    #[test]
    fn zero_capacity_fails_fast() {
        let mut config = PipelineConfig::default();
        config.diagnostics.attempt_capacity = 0;
        config.diagnostics.min_history_capacity = 0;

        let error = config.validate().expect_err("zero capacity");
        assert!(matches!(
            error,
            ConfigError::Invalid {
                field: "diagnostics.attempt_capacity",
                ..
            }
        ));
    }

    #[test]
    fn overweight_ground_weights_are_rejected() {
        let mut config = GroundConfig::default();
        config.physics_weight = 0.8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_window_outside_range_is_rejected() {
        let mut config = InputConfig::default();
        config.duplicate_window_ms = 20.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn min_update_above_base_is_rejected() {
        let mut config = GovernorConfig::default();
        config.min_update_hz = 90.0;
        assert!(config.validate().is_err());
    }
}
