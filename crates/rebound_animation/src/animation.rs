//! Frame-driven property animation
//!
//! [`DynamicAnimation`] owns the running state of one animated property: its
//! value and velocity, bounds, listeners and the scheduler registration. How
//! the value moves is delegated to a [`Motion`], so the same state machine
//! drives every physics model.
//!
//! ```text
//!            start()                     equilibrium / cancel()
//!   Idle ───────────────▶ Running ─────────────────────────────▶ Idle
//!                          │   ▲
//!                          └───┘ frame tick
//! ```
//!
//! The first frame after `start()` only records the frame time and writes the
//! start value. Each later frame integrates the elapsed (duration-scaled) time,
//! clamps the result to `[min_value, max_value]`, writes it to the property and
//! notifies update listeners in registration order.
//!
//! Listeners receive the animation itself and may cancel, retarget or restart
//! it from inside the callback.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, Key};

use crate::error::{AnimationError, Result};
use crate::force::MassState;
use crate::property::{
    BoundProperty, FloatProperty, FloatValueHolder, HeldValue, PropertyAccess,
    THRESHOLD_MULTIPLIER,
};
use crate::scheduler::{AnimationFrameCallback, AnimationScheduler};
use crate::slots::OrderedSlots;

/// Physics model driving a [`DynamicAnimation`]
pub trait Motion: 'static {
    /// Validate against the animation bounds before a run starts
    ///
    /// `value_threshold` is the position tolerance for equilibrium.
    fn prepare(&mut self, min_value: f32, max_value: f32, value_threshold: f32) -> Result<()>;

    /// Integrate `state` over `elapsed_ms`
    ///
    /// Returns `true` once the motion has come to rest.
    fn advance(
        &mut self,
        state: &mut MassState,
        elapsed_ms: i64,
        min_value: f32,
        max_value: f32,
    ) -> bool;

    fn acceleration(&self, value: f32, velocity: f32) -> f32;

    fn is_at_equilibrium(&self, value: f32, velocity: f32) -> bool;

    /// Called when a run ends, before the end listeners fire
    ///
    /// A retarget requested on the final frame is still pending here.
    fn ended(&mut self, _canceled: bool) {}
}

new_key_type! {
    pub struct UpdateListenerId;
    pub struct EndListenerId;
}

/// Called after every frame with `(animation, value, velocity)`
pub type UpdateListener<M> = Rc<dyn Fn(&DynamicAnimation<M>, f32, f32)>;

/// Called once per run with `(animation, canceled, value, velocity)`
pub type EndListener<M> = Rc<dyn Fn(&DynamicAnimation<M>, bool, f32, f32)>;

#[derive(Clone, Copy, Debug)]
struct AnimationState {
    value: f32,
    velocity: f32,
    min_value: f32,
    max_value: f32,
    running: bool,
    last_frame_time: Option<i64>,
    start_value_set: bool,
    min_visible_change: f32,
}

struct AnimationInner<M> {
    this: Weak<AnimationInner<M>>,
    scheduler: RefCell<AnimationScheduler>,
    property: Box<dyn PropertyAccess>,
    state: RefCell<AnimationState>,
    motion: RefCell<M>,
    update_listeners: RefCell<OrderedSlots<UpdateListenerId, UpdateListener<M>>>,
    end_listeners: RefCell<OrderedSlots<EndListenerId, EndListener<M>>>,
}

impl<M: Motion> AnimationFrameCallback for AnimationInner<M> {
    fn do_animation_frame(&self, frame_time: i64) {
        if let Some(inner) = self.this.upgrade() {
            DynamicAnimation { inner }.do_animation_frame(frame_time);
        }
    }
}

/// Animation of one float property toward rest
///
/// Owned by its creator. The scheduler only keeps a weak handle, so dropping
/// the animation stops it.
pub struct DynamicAnimation<M> {
    inner: Rc<AnimationInner<M>>,
}

impl<M: Motion> DynamicAnimation<M> {
    /// Animate `property` of `target` with a custom motion
    pub fn with_motion<T, P>(
        scheduler: &AnimationScheduler,
        target: Rc<T>,
        property: P,
        motion: M,
    ) -> Self
    where
        T: ?Sized + 'static,
        P: FloatProperty<T> + 'static,
    {
        Self::from_access(
            scheduler,
            Box::new(BoundProperty::new(target, property)),
            motion,
        )
    }

    /// Animate a free-standing value with a custom motion
    pub fn holder_with_motion(
        scheduler: &AnimationScheduler,
        holder: &FloatValueHolder,
        motion: M,
    ) -> Self {
        Self::from_access(
            scheduler,
            Box::new(BoundProperty::new(Rc::new(holder.clone()), HeldValue)),
            motion,
        )
    }

    fn from_access(
        scheduler: &AnimationScheduler,
        property: Box<dyn PropertyAccess>,
        motion: M,
    ) -> Self {
        let state = AnimationState {
            value: property.get(),
            velocity: 0.0,
            min_value: -f32::MAX,
            max_value: f32::MAX,
            running: false,
            last_frame_time: None,
            start_value_set: false,
            min_visible_change: property.kind().min_visible_change(),
        };

        let inner = Rc::new_cyclic(|this| AnimationInner {
            this: this.clone(),
            scheduler: RefCell::new(scheduler.clone()),
            property,
            state: RefCell::new(state),
            motion: RefCell::new(motion),
            update_listeners: RefCell::new(OrderedSlots::new()),
            end_listeners: RefCell::new(OrderedSlots::new()),
        });
        Self { inner }
    }

    /// Start the animation from the start value (or the current property value)
    ///
    /// Starting a running animation has no effect.
    pub fn start(&self) -> Result<()> {
        let inner = &self.inner;
        let scheduler = self.scheduler();
        scheduler.ensure_owner_thread("started")?;

        let state = *inner.state.borrow();
        if state.running {
            return Ok(());
        }

        inner.motion.borrow_mut().prepare(
            state.min_value,
            state.max_value,
            state.min_visible_change * THRESHOLD_MULTIPLIER,
        )?;

        let value = if state.start_value_set {
            state.value
        } else {
            inner.property.get()
        };
        if !(state.min_value..=state.max_value).contains(&value) {
            return Err(AnimationError::StartValueOutOfBounds {
                value,
                min: state.min_value,
                max: state.max_value,
            });
        }

        {
            let mut state = inner.state.borrow_mut();
            state.value = value;
            state.running = true;
        }
        scheduler.register(self.callback_handle(), 0);

        tracing::debug!(
            property = inner.property.name(),
            value,
            velocity = state.velocity,
            "Animation started"
        );
        Ok(())
    }

    /// Stop a running animation where it is
    ///
    /// End listeners see `canceled = true`. Canceling an idle animation has no
    /// effect.
    pub fn cancel(&self) -> Result<()> {
        self.scheduler().ensure_owner_thread("canceled")?;
        self.end(true);
        Ok(())
    }

    fn do_animation_frame(&self, frame_time: i64) {
        let inner = &self.inner;
        let last_frame_time = inner.state.borrow_mut().last_frame_time.replace(frame_time);

        let Some(last_frame_time) = last_frame_time else {
            let value = inner.state.borrow().value;
            self.set_property_value(value);
            return;
        };

        let elapsed_ms = self.scheduler().scale_elapsed(frame_time - last_frame_time);
        let (finished, value) = {
            let mut state = inner.state.borrow_mut();
            let mut mass = MassState::new(state.value, state.velocity);
            let finished = inner.motion.borrow_mut().advance(
                &mut mass,
                elapsed_ms,
                state.min_value,
                state.max_value,
            );
            state.value = mass.value.min(state.max_value).max(state.min_value);
            state.velocity = mass.velocity;
            (finished, state.value)
        };

        self.set_property_value(value);
        if finished {
            self.end(false);
        }
    }

    fn set_property_value(&self, value: f32) {
        self.inner.property.set(value);
        let velocity = self.inner.state.borrow().velocity;
        notify(&self.inner.update_listeners, |listener| {
            listener(self, value, velocity)
        });
    }

    /// Leave the running state; no effect when already idle
    fn end(&self, canceled: bool) {
        let inner = &self.inner;
        let (value, velocity) = {
            let mut state = inner.state.borrow_mut();
            if !state.running {
                return;
            }
            state.running = false;
            state.last_frame_time = None;
            state.start_value_set = false;
            (state.value, state.velocity)
        };

        self.scheduler().unregister(&self.callback_handle());
        inner.motion.borrow_mut().ended(canceled);
        tracing::debug!(
            property = inner.property.name(),
            canceled,
            value,
            "Animation ended"
        );

        notify(&inner.end_listeners, |listener| {
            listener(self, canceled, value, velocity)
        });
    }

    fn callback_handle(&self) -> Weak<dyn AnimationFrameCallback> {
        let handle = Rc::downgrade(&self.inner);
        handle
    }

    pub(crate) fn motion(&self) -> &RefCell<M> {
        &self.inner.motion
    }

    /// Value to start from instead of the current property value
    ///
    /// Applies to the next run only.
    pub fn set_start_value(&self, value: f32) -> &Self {
        let mut state = self.inner.state.borrow_mut();
        state.value = value;
        state.start_value_set = true;
        self
    }

    pub fn set_start_velocity(&self, velocity: f32) -> &Self {
        self.inner.state.borrow_mut().velocity = velocity;
        self
    }

    pub fn set_min_value(&self, min_value: f32) -> &Self {
        self.inner.state.borrow_mut().min_value = min_value;
        self
    }

    pub fn set_max_value(&self, max_value: f32) -> &Self {
        self.inner.state.borrow_mut().max_value = max_value;
        self
    }

    /// Smallest change of the property that is visible to the user
    ///
    /// Determines how close to rest the motion must come before it ends.
    pub fn set_min_visible_change(&self, min_visible_change: f32) -> Result<&Self> {
        if min_visible_change.is_nan() || min_visible_change <= 0.0 {
            return Err(AnimationError::InvalidMinimumVisibleChange(
                min_visible_change,
            ));
        }
        self.inner.state.borrow_mut().min_visible_change = min_visible_change;
        Ok(self)
    }

    /// Move the animation to another scheduler; only allowed while idle
    pub fn set_scheduler(&self, scheduler: &AnimationScheduler) -> Result<&Self> {
        if self.is_running() {
            return Err(AnimationError::SchedulerChangeWhileRunning);
        }
        *self.inner.scheduler.borrow_mut() = scheduler.clone();
        Ok(self)
    }

    pub fn add_update_listener(
        &self,
        listener: impl Fn(&DynamicAnimation<M>, f32, f32) + 'static,
    ) -> Result<UpdateListenerId> {
        if self.is_running() {
            return Err(AnimationError::UpdateListenerWhileRunning);
        }
        Ok(self
            .inner
            .update_listeners
            .borrow_mut()
            .insert(Rc::new(listener)))
    }

    /// Returns `false` if the listener was not registered
    pub fn remove_update_listener(&self, id: UpdateListenerId) -> bool {
        self.inner.update_listeners.borrow_mut().remove(id).is_some()
    }

    pub fn add_end_listener(
        &self,
        listener: impl Fn(&DynamicAnimation<M>, bool, f32, f32) + 'static,
    ) -> EndListenerId {
        self.inner.end_listeners.borrow_mut().insert(Rc::new(listener))
    }

    pub fn remove_end_listener(&self, id: EndListenerId) -> bool {
        self.inner.end_listeners.borrow_mut().remove(id).is_some()
    }

    pub fn value(&self) -> f32 {
        self.inner.state.borrow().value
    }

    pub fn velocity(&self) -> f32 {
        self.inner.state.borrow().velocity
    }

    pub fn min_value(&self) -> f32 {
        self.inner.state.borrow().min_value
    }

    pub fn max_value(&self) -> f32 {
        self.inner.state.borrow().max_value
    }

    pub fn min_visible_change(&self) -> f32 {
        self.inner.state.borrow().min_visible_change
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.borrow().running
    }

    pub fn property_name(&self) -> &str {
        self.inner.property.name()
    }

    pub fn scheduler(&self) -> AnimationScheduler {
        self.inner.scheduler.borrow().clone()
    }

    pub fn acceleration(&self, value: f32, velocity: f32) -> f32 {
        self.inner.motion.borrow().acceleration(value, velocity)
    }

    pub fn is_at_equilibrium(&self, value: f32, velocity: f32) -> bool {
        self.inner.motion.borrow().is_at_equilibrium(value, velocity)
    }
}

impl<M> fmt::Debug for DynamicAnimation<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("DynamicAnimation")
            .field("property", &self.inner.property.name())
            .field("value", &state.value)
            .field("velocity", &state.velocity)
            .field("running", &state.running)
            .finish()
    }
}

/// Call every live listener in registration order
///
/// No borrow is held while a listener runs, so listeners may add or remove
/// listeners. Removed slots are compacted once the outermost pass finishes.
fn notify<K: Key, L: Clone>(listeners: &RefCell<OrderedSlots<K, L>>, mut call: impl FnMut(&L)) {
    listeners.borrow_mut().begin_pass();
    let mut cursor = 0;
    loop {
        let next = listeners
            .borrow()
            .next_live(&mut cursor)
            .map(|(_, listener)| listener.clone());
        let Some(listener) = next else {
            break;
        };
        call(&listener);
    }
    listeners.borrow_mut().end_pass();
}
