//! Readiness plumbing: the per-handle poll descriptor and the
//! cache-line-aligned pointer cells shared with the back-end.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Readiness kind of a poll descriptor: playback handles report
/// writability (`Out`), capture handles readability (`In`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    In,
    Out,
}

struct PollShared {
    ready: Mutex<bool>,
    cond: Condvar,
}

/// Condvar-backed readiness cell; the handle's single poll descriptor.
///
/// The back-end raises readiness when at least `avail_min` frames are
/// available, and on any event a blocked waiter must observe (xrun,
/// drain completion, stop).
#[derive(Clone)]
pub struct PollDesc {
    shared: Arc<PollShared>,
    event: PollEvent,
}

impl PollDesc {
    pub fn new(event: PollEvent) -> PollDesc {
        PollDesc {
            shared: Arc::new(PollShared {
                ready: Mutex::new(false),
                cond: Condvar::new(),
            }),
            event,
        }
    }

    #[inline]
    pub fn event(&self) -> PollEvent {
        self.event
    }

    pub fn is_ready(&self) -> bool {
        *self.shared.ready.lock()
    }

    /// Raise readiness and wake every waiter.
    pub fn set_ready(&self) {
        let mut ready = self.shared.ready.lock();
        *ready = true;
        self.shared.cond.notify_all();
    }

    /// Clear readiness; waiters block again.
    pub fn clear(&self) {
        *self.shared.ready.lock() = false;
    }

    /// Wake waiters without latching readiness, so they re-check state.
    pub fn kick(&self) {
        self.shared.cond.notify_all();
    }

    /// Block until the descriptor fires or `timeout` elapses. `None`
    /// waits indefinitely. Returns whether the descriptor is ready.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut ready = self.shared.ready.lock();
        match timeout {
            None => {
                while !*ready {
                    self.shared.cond.wait(&mut ready);
                }
                true
            }
            Some(t) => {
                let deadline = std::time::Instant::now() + t;
                while !*ready {
                    if self
                        .shared
                        .cond
                        .wait_until(&mut ready, deadline)
                        .timed_out()
                    {
                        return *ready;
                    }
                }
                true
            }
        }
    }
}

impl std::fmt::Debug for PollDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollDesc")
            .field("event", &self.event)
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Cache-line aligned free-running frame counter, shared between the
/// handle and its back-end.
#[derive(Debug)]
#[repr(align(64))]
pub struct FrameCell {
    value: AtomicU64,
}

impl FrameCell {
    pub fn new(value: u64) -> FrameCell {
        FrameCell {
            value: AtomicU64::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Release);
    }
}

impl Default for FrameCell {
    fn default() -> Self {
        FrameCell::new(0)
    }
}
