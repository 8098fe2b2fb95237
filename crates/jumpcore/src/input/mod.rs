//! Raw platform events in, per-tick intent out.

mod intent;
mod normalizer;
mod raw;
mod schedule;

pub use intent::{IntentCollector, IntentSnapshot, JumpIntentEdge};
pub use normalizer::{
    InputEventKind, InputHistoryEntry, InputNormalizer, LogicalAction, NormalizeOutcome,
    NormalizedInputEvent, NormalizerCounters, SuppressReason,
};
pub use raw::{RawEventKind, RawInputEvent};
pub use schedule::InputSchedule;
