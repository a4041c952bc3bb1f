//! Rebound Platform Boundary
//!
//! The pieces of the host environment the animation engine depends on but does
//! not own:
//!
//! - **Frame callbacks**: "run this once on the next frame" plus the owner
//!   thread check used for fault detection
//! - **Clocks**: epoch-free monotonic milliseconds
//! - **Duration scale**: the global animation speed setting and its change
//!   notifications
//!
//! # Example
//!
//! ```rust
//! use rebound_platform::{FrameCallbackScheduler, FrameQueue};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let frames = FrameQueue::new();
//! let seen = Rc::new(Cell::new(0));
//!
//! let seen_clone = seen.clone();
//! frames.post_frame_callback(Box::new(move |frame_time| seen_clone.set(frame_time)));
//!
//! // The host event loop drains the queue on every vsync
//! frames.run_frame(16);
//! assert_eq!(seen.get(), 16);
//! ```

pub mod clock;
pub mod duration_scale;
pub mod frame;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use duration_scale::{
    DurationScaleSetting, DurationScaleSource, ScaleListener, ScaleSubscription,
};
pub use frame::{FrameCallback, FrameCallbackScheduler, FrameQueue};
