use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use tracing::warn;

use super::{LogicalAction, NormalizeOutcome, NormalizedInputEvent};

const MAX_PENDING_JUMP_EDGES: usize = 8;

/// One physical jump press, carried from the event callback to the tick that
/// evaluates it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JumpIntentEdge {
    pub source_code: String,
    pub timestamp_ms: f64,
    pub had_focus: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntentSnapshot {
    jump_edge: Option<JumpIntentEdge>,
    jump_held: bool,
    move_left_held: bool,
    move_right_held: bool,
}

impl IntentSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn jump_edge(&self) -> Option<&JumpIntentEdge> {
        self.jump_edge.as_ref()
    }

    pub fn jump_pressed(&self) -> bool {
        self.jump_edge.is_some()
    }

    pub fn jump_held(&self) -> bool {
        self.jump_held
    }

    pub fn move_left_held(&self) -> bool {
        self.move_left_held
    }

    pub fn move_right_held(&self) -> bool {
        self.move_right_held
    }

    /// -1, 0 or 1.
    pub fn horizontal_axis(&self) -> f32 {
        match (self.move_left_held, self.move_right_held) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    pub fn with_jump_edge(mut self, edge: JumpIntentEdge) -> Self {
        self.jump_edge = Some(edge);
        self
    }

    pub fn with_move_left_held(mut self, held: bool) -> Self {
        self.move_left_held = held;
        self
    }

    pub fn with_move_right_held(mut self, held: bool) -> Self {
        self.move_right_held = held;
        self
    }
}

/// Turns accepted normalized events into per-tick intent. Jump presses are
/// queued as edges and handed out one per tick, so each press is evaluated
/// exactly once even when two land inside the same frame.
#[derive(Debug, Default)]
pub struct IntentCollector {
    held: HashMap<String, LogicalAction>,
    pending_jump_edges: VecDeque<JumpIntentEdge>,
    dropped_edges: u64,
}

impl IntentCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, outcome: &NormalizeOutcome) {
        if outcome.is_accepted() {
            self.apply_event(&outcome.event);
        }
    }

    /// Releases synthesized by the normalizer on focus loss.
    pub fn apply_releases(&mut self, releases: &[NormalizedInputEvent]) {
        for event in releases {
            self.apply_event(event);
        }
    }

    pub fn is_held(&self, action: LogicalAction) -> bool {
        self.held.values().any(|held| *held == action)
    }

    pub fn pending_jump_edges(&self) -> usize {
        self.pending_jump_edges.len()
    }

    pub fn dropped_edges(&self) -> u64 {
        self.dropped_edges
    }

    pub fn snapshot_for_tick(&mut self) -> IntentSnapshot {
        IntentSnapshot {
            jump_edge: self.pending_jump_edges.pop_front(),
            jump_held: self.is_held(LogicalAction::Jump),
            move_left_held: self.is_held(LogicalAction::MoveLeft),
            move_right_held: self.is_held(LogicalAction::MoveRight),
        }
    }

    fn apply_event(&mut self, event: &NormalizedInputEvent) {
        let Some(action) = event.logical_action() else {
            return;
        };

        if !event.kind().is_press() {
            self.held.remove(event.source_code());
            return;
        }

        let was_held = self.held.insert(event.source_code().to_string(), action);
        if action != LogicalAction::Jump || was_held.is_some() {
            return;
        }

        if self.pending_jump_edges.len() == MAX_PENDING_JUMP_EDGES {
            self.pending_jump_edges.pop_front();
            self.dropped_edges = self.dropped_edges.saturating_add(1);
            warn!(
                pending = MAX_PENDING_JUMP_EDGES,
                "jump_edge_queue_full_dropped_oldest"
            );
        }
        self.pending_jump_edges.push_back(JumpIntentEdge {
            source_code: event.source_code().to_string(),
            timestamp_ms: event.timestamp_ms(),
            had_focus: event.raw_had_focus(),
        });
    }
}
