//! Spring force model
//!
//! Integrates the damped harmonic oscillator
//!
//! ```text
//! a = -k·(x - final) - c·v      k = ω²,  c = 2·ω·ζ
//! ```
//!
//! in closed form rather than stepping it numerically. Every call to
//! [`SpringForce::update_values`] evaluates the exact solution from the given
//! start state, so the result does not depend on frame rate and splitting an
//! interval in two gives the same end state as integrating it at once.
//!
//! Three regimes, selected by the damping ratio ζ:
//!
//! - **Overdamped** (ζ > 1): sum of two decaying exponentials
//! - **Critically damped** (ζ = 1): `(A + B·t)·e^{-ωt}`
//! - **Underdamped** (0 ≤ ζ < 1): exponentially decaying sinusoid
//!
//! # Example
//!
//! ```rust
//! use rebound_animation::{Force, SpringConfig, SpringForce};
//!
//! let mut spring = SpringForce::from_config(100.0, SpringConfig::new(1500.0, 1.0)).unwrap();
//! let state = spring.update_values(0.0, 0.0, 2000);
//!
//! assert!((state.value - 100.0).abs() < 0.75);
//! assert!(spring.is_at_equilibrium(state.value, state.velocity));
//! ```

use crate::config::SpringConfig;
use crate::error::{AnimationError, Result};
use crate::force::{Force, MassState};
use crate::property::{MIN_VISIBLE_CHANGE_PIXELS, THRESHOLD_MULTIPLIER};

/// A velocity below `value_threshold × VELOCITY_THRESHOLD_MULTIPLIER` moves
/// less than one threshold in a nominal 16 ms frame
const VELOCITY_THRESHOLD_MULTIPLIER: f64 = 1000.0 / 16.0;

/// Regime-dependent solution coefficients
#[derive(Clone, Copy, Debug, PartialEq)]
enum Regime {
    Overdamped { gamma_plus: f64, gamma_minus: f64 },
    CriticallyDamped,
    Underdamped { damped_frequency: f64 },
}

impl Regime {
    fn new(natural_frequency: f64, damping_ratio: f64) -> Self {
        if damping_ratio > 1.0 {
            let root = natural_frequency * (damping_ratio * damping_ratio - 1.0).sqrt();
            Regime::Overdamped {
                gamma_plus: -damping_ratio * natural_frequency + root,
                gamma_minus: -damping_ratio * natural_frequency - root,
            }
        } else if damping_ratio == 1.0 {
            Regime::CriticallyDamped
        } else {
            Regime::Underdamped {
                damped_frequency: natural_frequency * (1.0 - damping_ratio * damping_ratio).sqrt(),
            }
        }
    }
}

/// Spring pulling a value toward its final position
#[derive(Clone, Debug, PartialEq)]
pub struct SpringForce {
    natural_frequency: f64,
    damping_ratio: f64,
    final_position: f64,
    value_threshold: f64,
    velocity_threshold: f64,
    /// Cleared whenever stiffness or damping change
    regime: Option<Regime>,
}

impl SpringForce {
    /// Spring with the default configuration resting at `final_position`
    pub fn new(final_position: f32) -> Self {
        let config = SpringConfig::default();
        let value_threshold = (MIN_VISIBLE_CHANGE_PIXELS * THRESHOLD_MULTIPLIER) as f64;
        Self {
            natural_frequency: (config.stiffness as f64).sqrt(),
            damping_ratio: config.damping_ratio as f64,
            final_position: final_position as f64,
            value_threshold,
            velocity_threshold: value_threshold * VELOCITY_THRESHOLD_MULTIPLIER,
            regime: None,
        }
    }

    /// Spring with an explicit configuration
    pub fn from_config(final_position: f32, config: SpringConfig) -> Result<Self> {
        config.validate()?;
        let mut spring = Self::new(final_position);
        spring.natural_frequency = (config.stiffness as f64).sqrt();
        spring.damping_ratio = config.damping_ratio as f64;
        Ok(spring)
    }

    pub fn with_stiffness(mut self, stiffness: f32) -> Result<Self> {
        self.set_stiffness(stiffness)?;
        Ok(self)
    }

    pub fn with_damping_ratio(mut self, damping_ratio: f32) -> Result<Self> {
        self.set_damping_ratio(damping_ratio)?;
        Ok(self)
    }

    /// Set the spring constant `k`; must be positive
    pub fn set_stiffness(&mut self, stiffness: f32) -> Result<()> {
        if stiffness.is_nan() || stiffness <= 0.0 {
            return Err(AnimationError::InvalidStiffness(stiffness));
        }
        self.natural_frequency = (stiffness as f64).sqrt();
        self.regime = None;
        Ok(())
    }

    pub fn stiffness(&self) -> f32 {
        (self.natural_frequency * self.natural_frequency) as f32
    }

    /// Set the damping ratio ζ; must be non-negative
    pub fn set_damping_ratio(&mut self, damping_ratio: f32) -> Result<()> {
        if damping_ratio.is_nan() || damping_ratio < 0.0 {
            return Err(AnimationError::InvalidDampingRatio(damping_ratio));
        }
        self.damping_ratio = damping_ratio as f64;
        self.regime = None;
        Ok(())
    }

    pub fn damping_ratio(&self) -> f32 {
        self.damping_ratio as f32
    }

    pub fn natural_frequency(&self) -> f64 {
        self.natural_frequency
    }

    pub fn set_final_position(&mut self, final_position: f32) {
        self.final_position = final_position as f64;
    }

    pub fn final_position(&self) -> f32 {
        self.final_position as f32
    }

    pub fn config(&self) -> SpringConfig {
        SpringConfig::new(self.stiffness(), self.damping_ratio())
    }

    /// Set the position threshold used by the equilibrium check
    ///
    /// The velocity threshold follows from it.
    pub fn set_value_threshold(&mut self, threshold: f64) {
        self.value_threshold = threshold.abs();
        self.velocity_threshold = self.value_threshold * VELOCITY_THRESHOLD_MULTIPLIER;
    }

    pub fn value_threshold(&self) -> f64 {
        self.value_threshold
    }

    pub fn velocity_threshold(&self) -> f64 {
        self.velocity_threshold
    }

    fn regime(&mut self) -> Regime {
        *self
            .regime
            .get_or_insert_with(|| Regime::new(self.natural_frequency, self.damping_ratio))
    }

    /// Advance the spring from `(last_value, last_velocity)` by `elapsed_ms`
    pub fn update_values(
        &mut self,
        last_value: f64,
        last_velocity: f64,
        elapsed_ms: i64,
    ) -> MassState {
        let regime = self.regime();
        let omega = self.natural_frequency;
        let zeta = self.damping_ratio;

        let t = elapsed_ms as f64 / 1000.0;
        let x0 = last_value - self.final_position;
        let v0 = last_velocity;

        let (displacement, velocity) = match regime {
            Regime::Overdamped {
                gamma_plus,
                gamma_minus,
            } => {
                let coeff_b = (gamma_minus * x0 - v0) / (gamma_minus - gamma_plus);
                let coeff_a = x0 - coeff_b;
                let decay_minus = (gamma_minus * t).exp();
                let decay_plus = (gamma_plus * t).exp();
                (
                    coeff_a * decay_minus + coeff_b * decay_plus,
                    coeff_a * gamma_minus * decay_minus + coeff_b * gamma_plus * decay_plus,
                )
            }
            Regime::CriticallyDamped => {
                let coeff_a = x0;
                let coeff_b = v0 + omega * x0;
                let decay = (-omega * t).exp();
                let displacement = (coeff_a + coeff_b * t) * decay;
                (displacement, displacement * -omega + coeff_b * decay)
            }
            Regime::Underdamped { damped_frequency } => {
                let cos_coeff = x0;
                let sin_coeff = (zeta * omega * x0 + v0) / damped_frequency;
                let decay = (-zeta * omega * t).exp();
                let (sin, cos) = (damped_frequency * t).sin_cos();
                let displacement = decay * (cos_coeff * cos + sin_coeff * sin);
                let velocity = displacement * -omega * zeta
                    + decay * damped_frequency * (sin_coeff * cos - cos_coeff * sin);
                (displacement, velocity)
            }
        };

        MassState::new(
            (displacement + self.final_position) as f32,
            velocity as f32,
        )
    }
}

impl Force for SpringForce {
    fn acceleration(&self, value: f32, velocity: f32) -> f32 {
        let displacement = value as f64 - self.final_position;
        let k = self.natural_frequency * self.natural_frequency;
        let c = 2.0 * self.natural_frequency * self.damping_ratio;
        (-k * displacement - c * velocity as f64) as f32
    }

    fn is_at_equilibrium(&self, value: f32, velocity: f32) -> bool {
        (velocity as f64).abs() < self.velocity_threshold
            && (value as f64 - self.final_position).abs() < self.value_threshold
    }
}
