//! Force model interface

/// Position and velocity of the animated value after one integration step
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MassState {
    pub value: f32,
    pub velocity: f32,
}

impl MassState {
    pub fn new(value: f32, velocity: f32) -> Self {
        Self { value, velocity }
    }
}

/// A force acting on the animated value
pub trait Force {
    /// Instantaneous acceleration at the given state
    fn acceleration(&self, value: f32, velocity: f32) -> f32;

    /// Whether the state is close enough to rest to stop animating
    fn is_at_equilibrium(&self, value: f32, velocity: f32) -> bool;
}
