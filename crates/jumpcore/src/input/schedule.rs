use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::RawInputEvent;

#[derive(Debug)]
struct Pending {
    due_ms: f64,
    seq: u64,
    event: RawInputEvent,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    // Reversed so the max-heap pops the earliest due time, then the earliest
    // scheduled among equal times.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_ms
            .total_cmp(&self.due_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Raw events due at future monotonic times. Delayed synthetic input (a
/// scripted tap, a release after a hold) is queued here and drained by the
/// tick loop instead of sleeping.
#[derive(Debug, Default)]
pub struct InputSchedule {
    pending: BinaryHeap<Pending>,
    next_seq: u64,
}

impl InputSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_at(&mut self, due_ms: f64, event: RawInputEvent) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.pending.push(Pending { due_ms, seq, event });
    }

    pub fn schedule_after(&mut self, now_ms: f64, delay_ms: f64, event: RawInputEvent) {
        self.schedule_at(now_ms + delay_ms.max(0.0), event);
    }

    /// Press `code` now and release it `hold_ms` later.
    pub fn schedule_tap(&mut self, now_ms: f64, code: &str, hold_ms: f64) {
        self.schedule_at(now_ms, RawInputEvent::key_down(code).with_repeat(false).synthetic());
        self.schedule_after(now_ms, hold_ms, RawInputEvent::key_up(code).synthetic());
    }

    /// Pointer variant of [`Self::schedule_tap`].
    pub fn schedule_touch_tap(&mut self, now_ms: f64, pointer_id: u64, hold_ms: f64) {
        self.schedule_at(now_ms, RawInputEvent::touch_start(pointer_id).synthetic());
        self.schedule_after(now_ms, hold_ms, RawInputEvent::touch_end(pointer_id).synthetic());
    }

    /// Every event due at or before `now_ms`, in due order. Events scheduled
    /// without a timestamp are stamped with their due time.
    pub fn drain_due(&mut self, now_ms: f64) -> Vec<RawInputEvent> {
        let mut due = Vec::new();
        while self
            .pending
            .peek()
            .is_some_and(|pending| pending.due_ms <= now_ms)
        {
            let Some(Pending { due_ms, mut event, .. }) = self.pending.pop() else {
                break;
            };
            if event.timestamp_ms.is_none() {
                event.timestamp_ms = Some(due_ms);
            }
            due.push(event);
        }
        due
    }

    pub fn next_due_ms(&self) -> Option<f64> {
        self.pending.peek().map(|pending| pending.due_ms)
    }

    pub fn pending_presses(&self) -> usize {
        self.pending
            .iter()
            .filter(|pending| pending.event.kind.is_press())
            .count()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
