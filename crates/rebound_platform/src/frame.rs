//! Frame callback scheduling
//!
//! The animation scheduler never talks to vsync directly. It posts one-shot
//! callbacks through [`FrameCallbackScheduler`] and trusts the host to run them
//! on the owning thread at the next frame boundary.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::thread::{self, ThreadId};

use crate::clock::Clock;

/// One-shot callback run at the next frame, receiving the frame time in
/// milliseconds
pub type FrameCallback = Box<dyn FnOnce(i64) + 'static>;

/// Source of frame boundaries
pub trait FrameCallbackScheduler {
    /// Schedule `callback` to run once on the next frame, on the owning thread
    fn post_frame_callback(&self, callback: FrameCallback);

    /// Whether the caller is on the thread frames are delivered to
    fn is_current_thread(&self) -> bool;
}

/// Frame source driven by the host event loop
///
/// Callbacks are queued until the host calls [`FrameQueue::run_frame`] (usually
/// once per vsync or redraw request). Callbacks posted while a frame is running
/// are deferred to the next frame.
///
/// The queue doubles as the [`Clock`] of its host: "now" is the time of the
/// most recent frame.
pub struct FrameQueue {
    owner: ThreadId,
    pending: RefCell<VecDeque<FrameCallback>>,
    last_frame_time: Cell<i64>,
}

impl FrameQueue {
    /// Create a queue owned by the current thread
    pub fn new() -> Self {
        Self {
            owner: thread::current().id(),
            pending: RefCell::new(VecDeque::new()),
            last_frame_time: Cell::new(0),
        }
    }

    /// Run every callback posted before this call
    ///
    /// Returns the number of callbacks that ran.
    pub fn run_frame(&self, frame_time: i64) -> usize {
        self.last_frame_time.set(frame_time);

        // Drain first so callbacks can post for the following frame
        let callbacks: Vec<FrameCallback> = self.pending.borrow_mut().drain(..).collect();
        let count = callbacks.len();
        for callback in callbacks {
            callback(frame_time);
        }

        tracing::trace!(frame_time, count, "ran frame callbacks");
        count
    }

    /// Whether any callback is waiting for the next frame
    pub fn has_pending(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Number of callbacks waiting for the next frame
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Time passed to the most recent [`FrameQueue::run_frame`]
    pub fn last_frame_time(&self) -> i64 {
        self.last_frame_time.get()
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCallbackScheduler for FrameQueue {
    fn post_frame_callback(&self, callback: FrameCallback) {
        self.pending.borrow_mut().push_back(callback);
    }

    fn is_current_thread(&self) -> bool {
        thread::current().id() == self.owner
    }
}

impl Clock for FrameQueue {
    fn now_millis(&self) -> i64 {
        self.last_frame_time.get()
    }
}
