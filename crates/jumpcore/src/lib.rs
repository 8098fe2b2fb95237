pub mod config;
pub mod diagnostics;
pub mod governor;
pub mod ground;
pub mod input;
pub mod jump;
pub mod pipeline;
pub mod player;
mod ring;

pub use config::{
    load_pipeline_config, parse_pipeline_config, ConfigError, GovernorConfig, GroundConfig,
    InputConfig, JumpConfig, PipelineConfig, RecorderConfig, SignalWeights,
};
pub use diagnostics::{
    overlay_lines, DiagnosticRecorder, DiagnosticStatistics, DisplaySnapshot, ExportReport,
    FailureReasonCount, LatencyStats, SessionSummary,
};
pub use governor::{
    EnvironmentClassification, EnvironmentKind, EnvironmentSignals, GovernorHandle,
    PerformanceGovernor, ThrottleState, ThrottleTransition,
};
pub use ground::{ComponentFlags, GroundEstimate, GroundStateEstimator, GroundTransition};
pub use input::{
    InputEventKind, InputNormalizer, InputSchedule, IntentCollector, IntentSnapshot,
    JumpIntentEdge, LogicalAction, NormalizeOutcome, NormalizedInputEvent, RawEventKind,
    RawInputEvent, SuppressReason,
};
pub use jump::{BlockingReason, JumpAttempt, JumpPhase, JumpValidator, PhaseTracker};
pub use pipeline::{JumpPipeline, TickReport};
pub use player::{BodySnapshot, PlayerBody, PlayerFlags, Surface, Vec2};
pub use ring::RingBuffer;
