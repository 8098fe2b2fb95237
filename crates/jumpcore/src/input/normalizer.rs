use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::InputConfig;
use crate::governor::{elapsed_ms, GovernorHandle, FEATURE_INPUT_EVENTS};
use crate::ring::RingBuffer;

use super::{RawEventKind, RawInputEvent};

const UNKNOWN_SOURCE: &str = "unknown";
/// Throttling never shrinks the event history below this many entries.
const MIN_EVENT_HISTORY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputEventKind {
    KeyDown,
    KeyUp,
    TouchStart,
    TouchEnd,
}

impl InputEventKind {
    pub fn is_press(self) -> bool {
        matches!(self, Self::KeyDown | Self::TouchStart)
    }

    fn from_raw(kind: RawEventKind) -> Self {
        match kind {
            RawEventKind::KeyDown => Self::KeyDown,
            RawEventKind::KeyUp => Self::KeyUp,
            RawEventKind::TouchStart | RawEventKind::ButtonDown => Self::TouchStart,
            RawEventKind::TouchEnd | RawEventKind::ButtonUp => Self::TouchEnd,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalAction {
    Jump,
    MoveLeft,
    MoveRight,
}

impl LogicalAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jump => "jump",
            Self::MoveLeft => "move_left",
            Self::MoveRight => "move_right",
        }
    }
}

impl fmt::Display for LogicalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical input event. Immutable once built by [`InputNormalizer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedInputEvent {
    kind: InputEventKind,
    logical_action: Option<LogicalAction>,
    source_code: String,
    timestamp_ms: f64,
    raw_had_focus: bool,
}

impl NormalizedInputEvent {
    pub fn kind(&self) -> InputEventKind {
        self.kind
    }

    pub fn logical_action(&self) -> Option<LogicalAction> {
        self.logical_action
    }

    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    pub fn timestamp_ms(&self) -> f64 {
        self.timestamp_ms
    }

    pub fn raw_had_focus(&self) -> bool {
        self.raw_had_focus
    }

    pub fn is_jump_press(&self) -> bool {
        self.kind.is_press() && self.logical_action == Some(LogicalAction::Jump)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    /// The platform flagged the event as OS auto-repeat.
    Repeat,
    /// No repeat flag, but the source is already held.
    AlreadyHeld,
    /// No repeat flag, and the same source pressed within the duplicate window.
    Duplicate,
    /// A different source produced a jump press within the cross-source window.
    CrossSourceDuplicate,
    /// No code, key, or key code to identify the source.
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizeOutcome {
    pub event: NormalizedInputEvent,
    pub suppressed: Option<SuppressReason>,
    /// The caller should cancel the platform's default handling (page
    /// scrolling on space and arrows).
    pub prevent_default: bool,
}

impl NormalizeOutcome {
    pub fn is_accepted(&self) -> bool {
        self.suppressed.is_none()
    }

    pub fn is_jump_press(&self) -> bool {
        self.is_accepted() && self.event.is_jump_press()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizerCounters {
    pub accepted: u64,
    pub unmapped: u64,
    pub repeats_filtered: u64,
    pub duplicates_filtered: u64,
    pub cross_source_filtered: u64,
    pub malformed: u64,
    pub unfocused_presses: u64,
    pub focus_releases: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputHistoryEntry {
    pub event: NormalizedInputEvent,
    pub suppressed: Option<SuppressReason>,
}

pub struct InputNormalizer {
    config: InputConfig,
    governor: GovernorHandle,
    has_focus: bool,
    held_sources: HashMap<String, f64>,
    last_press_by_source: HashMap<String, f64>,
    last_jump_press: Option<(String, f64)>,
    history: RingBuffer<InputHistoryEntry>,
    counters: NormalizerCounters,
}

impl fmt::Debug for InputNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputNormalizer")
            .field("has_focus", &self.has_focus)
            .field("held_sources", &self.held_sources.len())
            .field("history_len", &self.history.len())
            .field("counters", &self.counters)
            .finish()
    }
}

impl InputNormalizer {
    pub fn new(config: InputConfig, governor: GovernorHandle) -> Self {
        let history = RingBuffer::new(config.event_history_capacity);
        Self {
            config,
            governor,
            has_focus: true,
            held_sources: HashMap::new(),
            last_press_by_source: HashMap::new(),
            last_jump_press: None,
            history,
            counters: NormalizerCounters::default(),
        }
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn counters(&self) -> NormalizerCounters {
        self.counters
    }

    pub fn history(&self) -> &RingBuffer<InputHistoryEntry> {
        &self.history
    }

    pub fn is_source_held(&self, source_code: &str) -> bool {
        self.held_sources.contains_key(source_code)
    }

    /// `received_at_ms` stands in for a missing or non-finite event
    /// timestamp. Never fails: unidentifiable events come back with no
    /// logical action and [`SuppressReason::Malformed`].
    pub fn normalize(&mut self, raw: &RawInputEvent, received_at_ms: f64) -> NormalizeOutcome {
        let bookkeeping = self.governor.should_record(FEATURE_INPUT_EVENTS);
        let started = bookkeeping.then(Instant::now);

        let outcome = self.normalize_inner(raw, received_at_ms);

        if let Some(started) = started {
            self.sync_history_capacity();
            self.history.push(InputHistoryEntry {
                event: outcome.event.clone(),
                suppressed: outcome.suppressed,
            });
            self.governor
                .observe_overhead(FEATURE_INPUT_EVENTS, elapsed_ms(started));
        }
        outcome
    }

    fn sync_history_capacity(&mut self) {
        let configured = self.config.event_history_capacity;
        let capacity = self
            .governor
            .throttle_state()
            .scaled_capacity(configured, MIN_EVENT_HISTORY.min(configured));
        if capacity != self.history.capacity() {
            debug!(
                from = self.history.capacity(),
                to = capacity,
                "input_history_resized"
            );
            self.history.set_capacity(capacity);
        }
    }

    /// Losing focus releases every held source, since the matching key-up
    /// is delivered to whatever now has focus. Returns the synthesized
    /// releases so downstream held state can be cleared too.
    pub fn set_focus(&mut self, focused: bool, at_ms: f64) -> Vec<NormalizedInputEvent> {
        self.has_focus = focused;
        if focused || self.held_sources.is_empty() {
            return Vec::new();
        }

        let mut released: Vec<String> = self.held_sources.drain().map(|(code, _)| code).collect();
        released.sort();
        self.counters.focus_releases = self
            .counters
            .focus_releases
            .saturating_add(released.len() as u64);
        debug!(released = released.len(), "focus_lost_released_held_sources");

        released
            .into_iter()
            .map(|source_code| {
                let pointer = source_code.starts_with("touch:") || source_code.starts_with("button:");
                let logical_action = self.map_source(&source_code, pointer);
                NormalizedInputEvent {
                    kind: if pointer {
                        InputEventKind::TouchEnd
                    } else {
                        InputEventKind::KeyUp
                    },
                    logical_action,
                    source_code,
                    timestamp_ms: at_ms,
                    raw_had_focus: false,
                }
            })
            .collect()
    }

    fn normalize_inner(&mut self, raw: &RawInputEvent, received_at_ms: f64) -> NormalizeOutcome {
        let kind = InputEventKind::from_raw(raw.kind);
        let timestamp_ms = raw
            .timestamp_ms
            .filter(|value| value.is_finite())
            .unwrap_or(received_at_ms);
        let raw_had_focus = raw.target_has_focus.unwrap_or(self.has_focus);

        let Some(source_code) = resolve_source_code(raw) else {
            self.counters.malformed = self.counters.malformed.saturating_add(1);
            return NormalizeOutcome {
                event: NormalizedInputEvent {
                    kind,
                    logical_action: None,
                    source_code: UNKNOWN_SOURCE.to_string(),
                    timestamp_ms,
                    raw_had_focus,
                },
                suppressed: Some(SuppressReason::Malformed),
                prevent_default: false,
            };
        };

        let logical_action = self.map_source(&source_code, raw.kind.is_pointer());
        let prevent_default = self.config.suppress_default_for_movement && logical_action.is_some();
        let suppressed = if raw.kind.is_press() {
            self.filter_press(raw.repeat, &source_code, logical_action, timestamp_ms)
        } else {
            self.held_sources.remove(&source_code);
            None
        };

        if suppressed.is_none() {
            self.counters.accepted = self.counters.accepted.saturating_add(1);
            if logical_action.is_none() {
                self.counters.unmapped = self.counters.unmapped.saturating_add(1);
            }
            if raw.kind.is_press() && !raw_had_focus {
                self.counters.unfocused_presses = self.counters.unfocused_presses.saturating_add(1);
            }
        }

        NormalizeOutcome {
            event: NormalizedInputEvent {
                kind,
                logical_action,
                source_code,
                timestamp_ms,
                raw_had_focus,
            },
            suppressed,
            prevent_default,
        }
    }

    fn filter_press(
        &mut self,
        repeat: Option<bool>,
        source_code: &str,
        logical_action: Option<LogicalAction>,
        timestamp_ms: f64,
    ) -> Option<SuppressReason> {
        let duplicate_window_ms = self.config.duplicate_window_ms;
        let previous_press = self.last_press_by_source.remove(source_code);
        // Entries outside the window can no longer mark a duplicate.
        self.last_press_by_source
            .retain(|_, previous| (timestamp_ms - *previous).abs() <= duplicate_window_ms);
        self.last_press_by_source
            .insert(source_code.to_string(), timestamp_ms);

        let repeat_reason = match repeat {
            Some(true) => Some(SuppressReason::Repeat),
            Some(false) => None,
            None => {
                let within_window = previous_press
                    .is_some_and(|previous| (timestamp_ms - previous).abs() <= duplicate_window_ms);
                if within_window {
                    Some(SuppressReason::Duplicate)
                } else if self.held_sources.contains_key(source_code) {
                    Some(SuppressReason::AlreadyHeld)
                } else {
                    None
                }
            }
        };
        if let Some(reason) = repeat_reason {
            // A suppressed press still means the source is down until its release.
            self.held_sources
                .entry(source_code.to_string())
                .or_insert(timestamp_ms);
            match reason {
                SuppressReason::Repeat | SuppressReason::AlreadyHeld => {
                    self.counters.repeats_filtered =
                        self.counters.repeats_filtered.saturating_add(1);
                }
                _ => {
                    self.counters.duplicates_filtered =
                        self.counters.duplicates_filtered.saturating_add(1);
                }
            }
            return Some(reason);
        }

        self.held_sources
            .insert(source_code.to_string(), timestamp_ms);

        if logical_action != Some(LogicalAction::Jump) {
            return None;
        }
        let cross_source = self
            .last_jump_press
            .as_ref()
            .is_some_and(|(previous_source, previous_ms)| {
                previous_source != source_code
                    && (timestamp_ms - previous_ms).abs() <= self.config.cross_source_window_ms
            });
        if cross_source {
            self.counters.cross_source_filtered =
                self.counters.cross_source_filtered.saturating_add(1);
            return Some(SuppressReason::CrossSourceDuplicate);
        }
        self.last_jump_press = Some((source_code.to_string(), timestamp_ms));
        None
    }

    fn map_source(&self, source_code: &str, pointer: bool) -> Option<LogicalAction> {
        if pointer {
            return Some(LogicalAction::Jump);
        }
        if source_code == self.config.primary_jump_code
            || contains_code(&self.config.alternate_jump_codes, source_code)
        {
            Some(LogicalAction::Jump)
        } else if contains_code(&self.config.move_left_codes, source_code) {
            Some(LogicalAction::MoveLeft)
        } else if contains_code(&self.config.move_right_codes, source_code) {
            Some(LogicalAction::MoveRight)
        } else {
            None
        }
    }
}

fn contains_code(codes: &[String], source_code: &str) -> bool {
    codes.iter().any(|code| code == source_code)
}

/// `code` first, then the layout `key`, then the legacy numeric code.
fn resolve_source_code(raw: &RawInputEvent) -> Option<String> {
    if let Some(code) = raw.code.as_deref().filter(|code| !code.is_empty()) {
        return Some(code.to_string());
    }
    if raw.kind.is_pointer() {
        return Some(match raw.kind {
            RawEventKind::ButtonDown | RawEventKind::ButtonUp => "button".to_string(),
            _ => "touch".to_string(),
        });
    }
    if let Some(key) = raw.key.as_deref().filter(|key| !key.is_empty()) {
        return Some(
            code_for_key(key)
                .map(ToString::to_string)
                .unwrap_or_else(|| format!("key:{key}")),
        );
    }
    raw.key_code.map(|key_code| {
        code_for_legacy_key_code(key_code)
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("keyCode:{key_code}"))
    })
}

fn code_for_key(key: &str) -> Option<&'static str> {
    Some(match key {
        " " | "Spacebar" | "Space" => "Space",
        "ArrowUp" | "Up" => "ArrowUp",
        "ArrowLeft" | "Left" => "ArrowLeft",
        "ArrowRight" | "Right" => "ArrowRight",
        "ArrowDown" | "Down" => "ArrowDown",
        "w" | "W" => "KeyW",
        "a" | "A" => "KeyA",
        "d" | "D" => "KeyD",
        "s" | "S" => "KeyS",
        "Enter" => "Enter",
        _ => return None,
    })
}

fn code_for_legacy_key_code(key_code: u32) -> Option<&'static str> {
    Some(match key_code {
        13 => "Enter",
        32 => "Space",
        37 => "ArrowLeft",
        38 => "ArrowUp",
        39 => "ArrowRight",
        40 => "ArrowDown",
        65 => "KeyA",
        68 => "KeyD",
        83 => "KeyS",
        87 => "KeyW",
        _ => return None,
    })
}
