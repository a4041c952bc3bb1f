//! Spring configuration presets

use crate::error::{AnimationError, Result};

/// Standard stiffness values
pub mod stiffness {
    pub const HIGH: f32 = 10_000.0;
    pub const MEDIUM: f32 = 1500.0;
    pub const LOW: f32 = 200.0;
    pub const VERY_LOW: f32 = 50.0;
}

/// Standard damping ratios
pub mod damping {
    /// Lots of overshoot
    pub const HIGH_BOUNCY: f32 = 0.2;
    pub const MEDIUM_BOUNCY: f32 = 0.5;
    pub const LOW_BOUNCY: f32 = 0.75;
    /// Critically damped, no overshoot
    pub const NO_BOUNCY: f32 = 1.0;
}

/// Stiffness and damping of a spring, independent of its target
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping_ratio: f32,
}

impl SpringConfig {
    pub fn new(stiffness: f32, damping_ratio: f32) -> Self {
        Self {
            stiffness,
            damping_ratio,
        }
    }

    /// Fast and without overshoot
    pub fn stiff() -> Self {
        Self::new(stiffness::HIGH, damping::NO_BOUNCY)
    }

    /// Quick settle with a hint of overshoot
    pub fn snappy() -> Self {
        Self::new(stiffness::MEDIUM, damping::LOW_BOUNCY)
    }

    /// Slow, smooth approach
    pub fn gentle() -> Self {
        Self::new(stiffness::LOW, damping::NO_BOUNCY)
    }

    /// Slow with visible oscillation
    pub fn wobbly() -> Self {
        Self::new(stiffness::LOW, damping::HIGH_BOUNCY)
    }

    pub fn bouncy() -> Self {
        Self::new(stiffness::MEDIUM, damping::HIGH_BOUNCY)
    }

    /// Default stiffness, critically damped
    pub fn no_bounce() -> Self {
        Self::new(stiffness::MEDIUM, damping::NO_BOUNCY)
    }

    /// Check that the values describe a physical spring
    pub fn validate(&self) -> Result<()> {
        if self.stiffness.is_nan() || self.stiffness <= 0.0 {
            return Err(AnimationError::InvalidStiffness(self.stiffness));
        }
        if self.damping_ratio.is_nan() || self.damping_ratio < 0.0 {
            return Err(AnimationError::InvalidDampingRatio(self.damping_ratio));
        }
        Ok(())
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::new(stiffness::MEDIUM, damping::MEDIUM_BOUNCY)
    }
}
