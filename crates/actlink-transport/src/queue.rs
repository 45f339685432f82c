use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;

/// Bounded FIFO of decoded frames shared between a reader thread and callers.
///
/// When full, pushing evicts the oldest frame. Closing wakes every waiter.
#[derive(Debug)]
pub struct FrameQueue {
    capacity: usize,
    state: Mutex<QueueState>,
    ready: Condvar,
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<Bytes>,
    closed: bool,
}

impl FrameQueue {
    /// Default number of frames held before the oldest is dropped.
    pub const DEFAULT_CAPACITY: usize = 10;

    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Append a frame, returning the evicted oldest frame if the queue was full.
    ///
    /// Frames pushed after `close` are discarded.
    pub fn push(&self, frame: Bytes) -> Option<Bytes> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }
        let evicted = if state.items.len() >= self.capacity {
            state.items.pop_front()
        } else {
            None
        };
        state.items.push_back(frame);
        drop(state);
        self.ready.notify_one();
        evicted
    }

    /// Wait up to `timeout` for the oldest frame; `None` waits indefinitely.
    ///
    /// Returns `None` on timeout or once the queue is closed.
    pub fn pop(&self, timeout: Option<Duration>) -> Option<Bytes> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(frame) = state.items.pop_front() {
                return Some(frame);
            }
            state = match deadline {
                None => self.ready.wait(state).unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return None;
                    }
                    self.ready
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Discard every queued frame, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let n = state.items.len();
        state.items.clear();
        n
    }

    /// Mark the queue closed and wake all waiters. Idempotent.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.items.clear();
        drop(state);
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
