use std::collections::VecDeque;

/// Fixed-capacity FIFO history. Pushing into a full buffer evicts the oldest
/// entry; it never fails.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
    evicted: u64,
}

impl<T> RingBuffer<T> {
    /// `capacity` of zero is treated as one; callers validate configuration
    /// before building buffers.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
            self.evicted = self.evicted.saturating_add(1);
        }
        self.items.push_back(item);
    }

    /// Shrinking drops the oldest entries until the new capacity fits.
    pub fn set_capacity(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        while self.items.len() > capacity {
            self.items.pop_front();
            self.evicted = self.evicted.saturating_add(1);
        }
        self.capacity = capacity;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// The last `count` entries, oldest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &T> {
        let skip = self.items.len().saturating_sub(count);
        self.items.iter().skip(skip)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Rolling millisecond samples with an O(1) running sum.
#[derive(Debug, Clone)]
pub(crate) struct RollingMs {
    samples_ms: Vec<f32>,
    head: usize,
    count: usize,
    sum_ms: f32,
    last_ms: f32,
}

impl RollingMs {
    pub(crate) fn new(window_len: usize) -> Self {
        Self {
            samples_ms: vec![0.0; window_len.max(1)],
            head: 0,
            count: 0,
            sum_ms: 0.0,
            last_ms: 0.0,
        }
    }

    pub(crate) fn push_ms(&mut self, value_ms: f32) {
        let window_len = self.samples_ms.len();
        self.last_ms = value_ms;

        if self.count < window_len {
            self.samples_ms[self.head] = value_ms;
            self.head = (self.head + 1) % window_len;
            self.count += 1;
            self.sum_ms += value_ms;
            return;
        }

        let evicted = self.samples_ms[self.head];
        self.samples_ms[self.head] = value_ms;
        self.head = (self.head + 1) % window_len;
        self.sum_ms += value_ms - evicted;
    }

    pub(crate) fn average_ms(&self) -> Option<f32> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum_ms / self.count as f32)
    }

    pub(crate) fn last_ms(&self) -> f32 {
        self.last_ms
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn clear(&mut self) {
        self.head = 0;
        self.count = 0;
        self.sum_ms = 0.0;
        self.last_ms = 0.0;
    }
}
