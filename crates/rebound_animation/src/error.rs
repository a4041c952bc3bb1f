//! Animation error types

use thiserror::Error;

/// Validation faults reported by animations, springs and the scheduler
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// Called from a thread other than the one frames are delivered to
    #[error("Animations may only be {action} on the thread that owns the frame scheduler")]
    WrongThread { action: &'static str },

    /// Started without a spring or final position
    #[error("Incomplete spring animation: set a final position or a spring force")]
    MissingSpring,

    /// Spring target lies outside the animation bounds
    #[error("Final position {position} of the spring is outside [{min}, {max}]")]
    FinalPositionOutOfBounds { position: f32, min: f32, max: f32 },

    /// Start value lies outside the animation bounds
    #[error("Starting value {value} needs to be in between min value {min} and max value {max}")]
    StartValueOutOfBounds { value: f32, min: f32, max: f32 },

    #[error("Spring stiffness constant must be positive, got {0}")]
    InvalidStiffness(f32),

    #[error("Damping ratio must be non-negative, got {0}")]
    InvalidDampingRatio(f32),

    #[error("Minimum visible change must be positive, got {0}")]
    InvalidMinimumVisibleChange(f32),

    /// Undamped springs never settle
    #[error("Spring animations can only come to an end when there is damping")]
    CannotSkipToEnd,

    #[error("Update listeners must be added before the animation starts")]
    UpdateListenerWhileRunning,

    #[error("The scheduler of a running animation cannot be changed")]
    SchedulerChangeWhileRunning,
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
