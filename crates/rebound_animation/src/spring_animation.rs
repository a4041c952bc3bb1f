//! Spring-driven property animation
//!
//! [`SpringAnimation`] moves a property toward the final position of its
//! [`SpringForce`]. The target can change mid-flight: the next frame integrates
//! half of its elapsed time toward the old target and the other half toward the
//! new one, so velocity carries over without a visible jump.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use rebound_animation::{AnimationScheduler, FloatValueHolder, SpringAnimation};
//! use rebound_platform::FrameQueue;
//!
//! let frames = Rc::new(FrameQueue::new());
//! let scheduler = AnimationScheduler::builder(frames.clone())
//!     .clock(frames.clone())
//!     .build();
//!
//! let holder = FloatValueHolder::new(0.0);
//! let animation =
//!     SpringAnimation::from_value_holder_with_final_position(&scheduler, &holder, 100.0);
//! animation.start().unwrap();
//!
//! // Host event loop
//! let mut frame_time = 0;
//! while frames.has_pending() {
//!     frame_time += 16;
//!     frames.run_frame(frame_time);
//! }
//!
//! assert_eq!(holder.value(), 100.0);
//! assert!(!animation.is_running());
//! ```

use std::rc::Rc;

use crate::animation::{DynamicAnimation, Motion};
use crate::error::{AnimationError, Result};
use crate::force::{Force, MassState};
use crate::property::{FloatProperty, FloatValueHolder};
use crate::scheduler::AnimationScheduler;
use crate::spring::SpringForce;

/// [`Motion`] that follows a [`SpringForce`]
#[derive(Clone, Debug, Default)]
pub struct SpringMotion {
    spring: Option<SpringForce>,
    /// Retarget waiting for the next frame
    pending_position: Option<f32>,
    end_requested: bool,
}

impl SpringMotion {
    pub fn new(spring: SpringForce) -> Self {
        Self {
            spring: Some(spring),
            ..Self::default()
        }
    }
}

impl Motion for SpringMotion {
    fn prepare(&mut self, min_value: f32, max_value: f32, value_threshold: f32) -> Result<()> {
        let Some(spring) = self.spring.as_mut() else {
            return Err(AnimationError::MissingSpring);
        };

        let position = spring.final_position();
        if position > max_value || position < min_value {
            return Err(AnimationError::FinalPositionOutOfBounds {
                position,
                min: min_value,
                max: max_value,
            });
        }

        spring.set_value_threshold(value_threshold as f64);
        Ok(())
    }

    fn advance(
        &mut self,
        state: &mut MassState,
        elapsed_ms: i64,
        min_value: f32,
        max_value: f32,
    ) -> bool {
        let Some(spring) = self.spring.as_mut() else {
            return true;
        };

        if self.end_requested {
            if let Some(position) = self.pending_position.take() {
                spring.set_final_position(position);
            }
            *state = MassState::new(spring.final_position(), 0.0);
            self.end_requested = false;
            return true;
        }

        *state = match self.pending_position.take() {
            Some(position) => {
                // The second half takes the odd millisecond
                let first_half = elapsed_ms / 2;
                let midway =
                    spring.update_values(state.value as f64, state.velocity as f64, first_half);
                spring.set_final_position(position);
                spring.update_values(
                    midway.value as f64,
                    midway.velocity as f64,
                    elapsed_ms - first_half,
                )
            }
            None => spring.update_values(state.value as f64, state.velocity as f64, elapsed_ms),
        };

        state.value = state.value.max(min_value).min(max_value);
        if spring.is_at_equilibrium(state.value, state.velocity) {
            *state = MassState::new(spring.final_position(), 0.0);
            return true;
        }
        false
    }

    fn acceleration(&self, value: f32, velocity: f32) -> f32 {
        self.spring
            .as_ref()
            .map_or(0.0, |spring| spring.acceleration(value, velocity))
    }

    fn is_at_equilibrium(&self, value: f32, velocity: f32) -> bool {
        self.spring
            .as_ref()
            .map_or(true, |spring| spring.is_at_equilibrium(value, velocity))
    }

    fn ended(&mut self, _canceled: bool) {
        self.end_requested = false;
        if let Some(position) = self.pending_position.take() {
            match self.spring.as_mut() {
                Some(spring) => spring.set_final_position(position),
                None => self.spring = Some(SpringForce::new(position)),
            }
        }
    }
}

/// Property animation driven by a spring
pub type SpringAnimation = DynamicAnimation<SpringMotion>;

impl DynamicAnimation<SpringMotion> {
    /// Spring animation without a spring; set one (or a final position)
    /// before starting
    pub fn new<T, P>(scheduler: &AnimationScheduler, target: Rc<T>, property: P) -> Self
    where
        T: ?Sized + 'static,
        P: FloatProperty<T> + 'static,
    {
        Self::with_motion(scheduler, target, property, SpringMotion::default())
    }

    /// Spring animation with a default spring resting at `final_position`
    pub fn with_final_position<T, P>(
        scheduler: &AnimationScheduler,
        target: Rc<T>,
        property: P,
        final_position: f32,
    ) -> Self
    where
        T: ?Sized + 'static,
        P: FloatProperty<T> + 'static,
    {
        Self::with_motion(
            scheduler,
            target,
            property,
            SpringMotion::new(SpringForce::new(final_position)),
        )
    }

    pub fn from_value_holder(scheduler: &AnimationScheduler, holder: &FloatValueHolder) -> Self {
        Self::holder_with_motion(scheduler, holder, SpringMotion::default())
    }

    pub fn from_value_holder_with_final_position(
        scheduler: &AnimationScheduler,
        holder: &FloatValueHolder,
        final_position: f32,
    ) -> Self {
        Self::holder_with_motion(
            scheduler,
            holder,
            SpringMotion::new(SpringForce::new(final_position)),
        )
    }

    /// Copy of the current spring, if one is set
    pub fn spring(&self) -> Option<SpringForce> {
        self.motion().borrow().spring.clone()
    }

    pub fn set_spring(&self, spring: SpringForce) -> &Self {
        self.motion().borrow_mut().spring = Some(spring);
        self
    }

    /// Modify the spring in place
    ///
    /// Returns `None` if no spring is set. The closure must not call back
    /// into this animation.
    pub fn with_spring_mut<R>(&self, f: impl FnOnce(&mut SpringForce) -> R) -> Option<R> {
        self.motion().borrow_mut().spring.as_mut().map(f)
    }

    /// Send the animation toward `final_position`
    ///
    /// A running animation is retargeted on its next frame. An idle one gets
    /// its spring's final position set (creating a default spring if needed)
    /// and starts.
    pub fn animate_to_final_position(&self, final_position: f32) -> Result<()> {
        if self.is_running() {
            self.motion().borrow_mut().pending_position = Some(final_position);
            return Ok(());
        }

        self.motion()
            .borrow_mut()
            .spring
            .get_or_insert_with(|| SpringForce::new(final_position))
            .set_final_position(final_position);
        self.start()
    }

    /// Jump to the final position on the next frame and end there
    ///
    /// Only damped springs can be skipped; an undamped one has no end.
    pub fn skip_to_end(&self) -> Result<()> {
        let damped = self
            .motion()
            .borrow()
            .spring
            .as_ref()
            .map(|spring| spring.damping_ratio() > 0.0)
            .ok_or(AnimationError::MissingSpring)?;
        if !damped {
            return Err(AnimationError::CannotSkipToEnd);
        }

        self.scheduler().ensure_owner_thread("skipped to end")?;
        if self.is_running() {
            self.motion().borrow_mut().end_requested = true;
        }
        Ok(())
    }

    pub fn can_skip_to_end(&self) -> bool {
        self.motion()
            .borrow()
            .spring
            .as_ref()
            .is_some_and(|spring| spring.damping_ratio() > 0.0)
    }
}
