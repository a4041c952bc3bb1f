//! Rebound Animation System
//!
//! Physically based property animation driven by the host's frame signal.
//!
//! # Features
//!
//! - **Closed-form springs**: exact damped-oscillator solution, independent of
//!   frame rate
//! - **Frame scheduler**: one platform frame request fans out to every running
//!   animation
//! - **Interruptible**: retargeting a running spring keeps its velocity
//! - **Duration scale**: follows the global animation speed setting, including
//!   "animations off"
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use rebound_animation::{
//!     AnimationScheduler, FloatValueHolder, SpringAnimation, SpringConfig, SpringForce,
//! };
//! use rebound_platform::FrameQueue;
//!
//! let frames = Rc::new(FrameQueue::new());
//! let scheduler = AnimationScheduler::builder(frames.clone())
//!     .clock(frames.clone())
//!     .build();
//!
//! let offset = FloatValueHolder::new(0.0);
//! let animation = SpringAnimation::from_value_holder(&scheduler, &offset);
//! animation.set_spring(SpringForce::from_config(300.0, SpringConfig::snappy()).unwrap());
//! animation.start().unwrap();
//!
//! frames.run_frame(16);
//! frames.run_frame(32);
//! assert!(offset.value() > 0.0);
//! ```

pub mod animation;
pub mod config;
pub mod error;
pub mod force;
pub mod property;
pub mod scheduler;
mod slots;
pub mod spring;
pub mod spring_animation;

pub use animation::{
    DynamicAnimation, EndListener, EndListenerId, Motion, UpdateListener, UpdateListenerId,
};
pub use config::{damping, stiffness, SpringConfig};
pub use error::{AnimationError, Result};
pub use force::{Force, MassState};
pub use property::{
    FloatProperty, FloatValueHolder, FnProperty, PropertyKind, ViewProperty, ViewTarget,
    MIN_VISIBLE_CHANGE_ALPHA, MIN_VISIBLE_CHANGE_PIXELS, MIN_VISIBLE_CHANGE_ROTATION_DEGREES,
    MIN_VISIBLE_CHANGE_SCALE, THRESHOLD_MULTIPLIER,
};
pub use scheduler::{AnimationFrameCallback, AnimationScheduler, CallbackId, SchedulerBuilder};
pub use spring::SpringForce;
pub use spring_animation::{SpringAnimation, SpringMotion};
