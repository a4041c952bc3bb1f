//! Animation scheduler
//!
//! Fans one platform frame signal out to every running animation. The
//! scheduler asks its [`FrameCallbackScheduler`] for a frame only while it has
//! registered callbacks, and holds the duration scale subscription for exactly
//! that long.
//!
//! The registry keeps weak handles; animations are owned by whoever created
//! them and simply stop receiving frames once dropped.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use rebound_platform::{
    Clock, DurationScaleSource, FrameCallbackScheduler, MonotonicClock, ScaleSubscription,
};
use slotmap::new_key_type;

use crate::error::{AnimationError, Result};
use crate::slots::OrderedSlots;

new_key_type! {
    /// Registry slot of a frame callback
    pub struct CallbackId;
}

/// Receiver of batched frame ticks
pub trait AnimationFrameCallback {
    /// Advance to `frame_time` (milliseconds of the frame source's clock)
    fn do_animation_frame(&self, frame_time: i64);
}

struct RegistryEntry {
    callback: Weak<dyn AnimationFrameCallback>,
    /// Absolute time before which the callback is not delivered
    start_deadline: Option<i64>,
}

impl RegistryEntry {
    fn is_due(&mut self, now: i64) -> bool {
        match self.start_deadline {
            None => true,
            Some(deadline) if deadline < now => {
                self.start_deadline = None;
                true
            }
            Some(_) => false,
        }
    }
}

struct SchedulerInner {
    frames: Rc<dyn FrameCallbackScheduler>,
    clock: Rc<dyn Clock>,
    registry: RefCell<OrderedSlots<CallbackId, RegistryEntry>>,
    frame_posted: Cell<bool>,
    /// Shared with the duration scale listener
    duration_scale: Rc<Cell<f32>>,
    scale_source: Option<Rc<dyn DurationScaleSource>>,
    scale_subscription: Cell<Option<ScaleSubscription>>,
}

impl SchedulerInner {
    fn subscribe_duration_scale(&self) {
        let Some(source) = &self.scale_source else {
            return;
        };
        if self.scale_subscription.get().is_some() {
            return;
        }

        self.duration_scale.set(source.duration_scale());
        let scale = Rc::downgrade(&self.duration_scale);
        let subscription = source.subscribe(Rc::new(move |value| {
            if let Some(scale) = scale.upgrade() {
                scale.set(value);
            }
        }));
        self.scale_subscription.set(Some(subscription));

        tracing::debug!(
            scale = self.duration_scale.get(),
            "Subscribed to duration scale"
        );
    }

    fn unsubscribe_duration_scale(&self) {
        if let (Some(source), Some(subscription)) =
            (&self.scale_source, self.scale_subscription.take())
        {
            source.unsubscribe(subscription);
            tracing::debug!("Unsubscribed from duration scale");
        }
    }
}

impl Drop for SchedulerInner {
    fn drop(&mut self) {
        self.unsubscribe_duration_scale();
    }
}

/// Builder for [`AnimationScheduler`]
pub struct SchedulerBuilder {
    frames: Rc<dyn FrameCallbackScheduler>,
    clock: Option<Rc<dyn Clock>>,
    scale_source: Option<Rc<dyn DurationScaleSource>>,
}

impl SchedulerBuilder {
    /// Clock used for delayed starts (defaults to [`MonotonicClock`])
    pub fn clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Global duration scale to follow while animations are running
    pub fn duration_scale_source(mut self, source: Rc<dyn DurationScaleSource>) -> Self {
        self.scale_source = Some(source);
        self
    }

    pub fn build(self) -> AnimationScheduler {
        let clock = self
            .clock
            .unwrap_or_else(|| Rc::new(MonotonicClock::new()) as Rc<dyn Clock>);

        AnimationScheduler {
            inner: Rc::new(SchedulerInner {
                frames: self.frames,
                clock,
                registry: RefCell::new(OrderedSlots::new()),
                frame_posted: Cell::new(false),
                duration_scale: Rc::new(Cell::new(1.0)),
                scale_source: self.scale_source,
                scale_subscription: Cell::new(None),
            }),
        }
    }
}

/// Per-thread dispatcher of animation frames
///
/// Cloning yields another handle to the same scheduler.
#[derive(Clone)]
pub struct AnimationScheduler {
    inner: Rc<SchedulerInner>,
}

impl AnimationScheduler {
    /// Scheduler with a monotonic clock and no duration scale source
    pub fn new(frames: Rc<dyn FrameCallbackScheduler>) -> Self {
        Self::builder(frames).build()
    }

    pub fn builder(frames: Rc<dyn FrameCallbackScheduler>) -> SchedulerBuilder {
        SchedulerBuilder {
            frames,
            clock: None,
            scale_source: None,
        }
    }

    /// Register `callback` for frame ticks
    ///
    /// Adding a callback that is already registered does not duplicate it. A
    /// positive `delay_ms` holds back delivery until that many milliseconds
    /// have passed.
    pub fn add_callback(
        &self,
        callback: &Rc<dyn AnimationFrameCallback>,
        delay_ms: i64,
    ) -> Result<CallbackId> {
        self.ensure_owner_thread("registered")?;
        Ok(self.register(Rc::downgrade(callback), delay_ms))
    }

    /// Stop delivering frame ticks to `callback`
    ///
    /// Unknown callbacks are ignored.
    pub fn remove_callback(&self, callback: &Rc<dyn AnimationFrameCallback>) -> Result<()> {
        self.ensure_owner_thread("unregistered")?;
        self.unregister(&Rc::downgrade(callback));
        Ok(())
    }

    pub(crate) fn register(
        &self,
        callback: Weak<dyn AnimationFrameCallback>,
        delay_ms: i64,
    ) -> CallbackId {
        let inner = &self.inner;
        let start_deadline =
            (delay_ms > 0).then(|| inner.clock.now_millis().saturating_add(delay_ms));

        let mut registry = inner.registry.borrow_mut();
        if let Some(id) = registry.find(|entry| entry.callback.ptr_eq(&callback)) {
            if let (Some(deadline), Some(entry)) = (start_deadline, registry.get_mut(id)) {
                entry.start_deadline = Some(deadline);
            }
            return id;
        }

        let was_empty = registry.is_empty();
        let id = registry.insert(RegistryEntry {
            callback,
            start_deadline,
        });
        drop(registry);

        if was_empty {
            tracing::debug!("Animation scheduler active");
            inner.subscribe_duration_scale();
            self.request_frame();
        }
        id
    }

    pub(crate) fn unregister(&self, callback: &Weak<dyn AnimationFrameCallback>) {
        let drained = {
            let mut registry = self.inner.registry.borrow_mut();
            let Some(id) = registry.find(|entry| entry.callback.ptr_eq(callback)) else {
                return;
            };
            registry.remove(id);
            registry.is_empty()
        };

        if drained {
            self.went_idle();
        }
    }

    /// Deliver one frame to every due callback
    ///
    /// Normally driven by the frame source; exposed for hosts that pump
    /// frames themselves. Callbacks may add or remove callbacks (themselves
    /// included) while the frame is being delivered.
    pub fn dispatch_frame(&self, frame_time: i64) {
        let inner = &self.inner;
        let now = inner.clock.now_millis();
        let had_callbacks = {
            let mut registry = inner.registry.borrow_mut();
            registry.begin_pass();
            !registry.is_empty()
        };

        let mut cursor = 0;
        let mut delivered = 0usize;
        loop {
            let next = {
                let mut registry = inner.registry.borrow_mut();
                let mut next = None;
                while let Some(id) = registry.key_at(cursor) {
                    cursor += 1;
                    if let Some(entry) = registry.get_mut(id) {
                        if entry.is_due(now) {
                            next = Some((id, entry.callback.clone()));
                            break;
                        }
                    }
                }
                next
            };
            let Some((id, callback)) = next else {
                break;
            };

            match callback.upgrade() {
                Some(callback) => {
                    callback.do_animation_frame(frame_time);
                    delivered += 1;
                }
                None => {
                    tracing::warn!("Pruning frame callback whose owner was dropped while running");
                    inner.registry.borrow_mut().remove(id);
                }
            }
        }

        let (remaining, drained) = {
            let mut registry = inner.registry.borrow_mut();
            registry.end_pass();
            (registry.len(), registry.is_empty())
        };
        tracing::trace!(frame_time, delivered, remaining, "Dispatched animation frame");

        if !drained {
            self.request_frame();
        } else if had_callbacks {
            self.went_idle();
        }
    }

    fn went_idle(&self) {
        tracing::debug!("Animation scheduler idle");
        self.inner.unsubscribe_duration_scale();
    }

    fn request_frame(&self) {
        if self.inner.frame_posted.replace(true) {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        self.inner
            .frames
            .post_frame_callback(Box::new(move |frame_time| {
                if let Some(inner) = weak.upgrade() {
                    AnimationScheduler { inner }.on_frame(frame_time);
                }
            }));
    }

    fn on_frame(&self, frame_time: i64) {
        self.inner.frame_posted.set(false);
        self.dispatch_frame(frame_time);
    }

    pub(crate) fn ensure_owner_thread(&self, action: &'static str) -> Result<()> {
        if self.inner.frames.is_current_thread() {
            Ok(())
        } else {
            Err(AnimationError::WrongThread { action })
        }
    }

    /// Override the duration scale until the subscribed source next changes
    ///
    /// Negative and non-finite scales are ignored.
    pub fn set_duration_scale(&self, scale: f32) {
        if !scale.is_finite() || scale < 0.0 {
            tracing::warn!(scale, "Ignoring invalid duration scale");
            return;
        }
        self.inner.duration_scale.set(scale);
    }

    pub fn duration_scale(&self) -> f32 {
        self.inner.duration_scale.get()
    }

    /// Convert real elapsed time into animation time
    ///
    /// A zero scale jumps animations straight to their end.
    pub(crate) fn scale_elapsed(&self, elapsed_ms: i64) -> i64 {
        let scale = self.inner.duration_scale.get();
        if scale == 0.0 {
            i32::MAX as i64
        } else {
            (elapsed_ms as f64 / scale as f64) as i64
        }
    }

    /// Number of registered callbacks
    pub fn callback_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }

    pub fn is_subscribed_to_duration_scale(&self) -> bool {
        self.inner.scale_subscription.get().is_some()
    }

    /// Whether the caller is on the thread that owns this scheduler
    pub fn is_current_thread(&self) -> bool {
        self.inner.frames.is_current_thread()
    }

    /// Whether both handles refer to the same scheduler
    pub fn ptr_eq(&self, other: &AnimationScheduler) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationScheduler")
            .field("callbacks", &self.callback_count())
            .field("frame_posted", &self.inner.frame_posted.get())
            .field("duration_scale", &self.duration_scale())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebound_platform::{DurationScaleSetting, FrameQueue};

    #[derive(Default)]
    struct Recorder {
        frames: RefCell<Vec<i64>>,
        hook: RefCell<Option<Box<dyn Fn()>>>,
    }

    impl AnimationFrameCallback for Recorder {
        fn do_animation_frame(&self, frame_time: i64) {
            self.frames.borrow_mut().push(frame_time);
            let hook = self.hook.borrow();
            if let Some(hook) = hook.as_ref() {
                hook();
            }
        }
    }

    fn recorder() -> (Rc<Recorder>, Rc<dyn AnimationFrameCallback>) {
        let recorder = Rc::new(Recorder::default());
        let callback: Rc<dyn AnimationFrameCallback> = recorder.clone();
        (recorder, callback)
    }

    fn scheduler() -> (Rc<FrameQueue>, AnimationScheduler) {
        let frames = Rc::new(FrameQueue::new());
        let scheduler = AnimationScheduler::builder(frames.clone())
            .clock(frames.clone())
            .build();
        (frames, scheduler)
    }

    struct ForeignFrames;

    impl FrameCallbackScheduler for ForeignFrames {
        fn post_frame_callback(&self, _callback: rebound_platform::FrameCallback) {}

        fn is_current_thread(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_huge_delay_never_starts() {
        let (frames, scheduler) = scheduler();
        let (a, a_cb) = recorder();

        frames.run_frame(1_000);
        scheduler.add_callback(&a_cb, i64::MAX).unwrap();
        for frame_time in [1_016, 1_032, 1_048] {
            frames.run_frame(frame_time);
        }

        assert!(a.frames.borrow().is_empty());
        assert_eq!(scheduler.callback_count(), 1);
        assert!(frames.has_pending());
    }

    #[test]
    fn test_add_callback_is_idempotent() {
        let (frames, scheduler) = scheduler();
        let (a, a_cb) = recorder();

        let first = scheduler.add_callback(&a_cb, 0).unwrap();
        let second = scheduler.add_callback(&a_cb, 0).unwrap();

        assert_eq!(first, second);
        assert_eq!(scheduler.callback_count(), 1);
        assert_eq!(frames.pending_count(), 1);

        frames.run_frame(16);
        assert_eq!(*a.frames.borrow(), vec![16]);
    }

    #[test]
    fn test_self_removal_during_pass() {
        let (frames, scheduler) = scheduler();
        let (a, a_cb) = recorder();
        let (b, b_cb) = recorder();
        let (c, c_cb) = recorder();

        let b_weak = Rc::downgrade(&b_cb);
        let scheduler_clone = scheduler.clone();
        *b.hook.borrow_mut() = Some(Box::new(move || scheduler_clone.unregister(&b_weak)));

        for callback in [&a_cb, &b_cb, &c_cb] {
            scheduler.add_callback(callback, 0).unwrap();
        }

        frames.run_frame(16);
        frames.run_frame(32);

        assert_eq!(*a.frames.borrow(), vec![16, 32]);
        assert_eq!(*b.frames.borrow(), vec![16]);
        assert_eq!(*c.frames.borrow(), vec![16, 32]);
        assert_eq!(scheduler.callback_count(), 2);
    }

    #[test]
    fn test_removing_later_callback_skips_it() {
        let (frames, scheduler) = scheduler();
        let (a, a_cb) = recorder();
        let (b, b_cb) = recorder();

        let b_weak = Rc::downgrade(&b_cb);
        let scheduler_clone = scheduler.clone();
        *a.hook.borrow_mut() = Some(Box::new(move || scheduler_clone.unregister(&b_weak)));

        scheduler.add_callback(&a_cb, 0).unwrap();
        scheduler.add_callback(&b_cb, 0).unwrap();
        frames.run_frame(16);

        assert_eq!(*a.frames.borrow(), vec![16]);
        assert!(b.frames.borrow().is_empty());
    }

    #[test]
    fn test_callback_added_during_pass_runs_same_frame() {
        let (frames, scheduler) = scheduler();
        let (a, a_cb) = recorder();
        let (b, b_cb) = recorder();

        let b_weak = Rc::downgrade(&b_cb);
        let scheduler_clone = scheduler.clone();
        *a.hook.borrow_mut() = Some(Box::new(move || {
            scheduler_clone.register(b_weak.clone(), 0);
        }));

        scheduler.add_callback(&a_cb, 0).unwrap();
        frames.run_frame(16);

        assert_eq!(*a.frames.borrow(), vec![16]);
        assert_eq!(*b.frames.borrow(), vec![16]);
        assert_eq!(scheduler.callback_count(), 2);
    }

    #[test]
    fn test_delayed_start() {
        let (frames, scheduler) = scheduler();
        let (a, a_cb) = recorder();

        scheduler.add_callback(&a_cb, 50).unwrap();
        for frame_time in [16, 32, 48, 64, 80] {
            frames.run_frame(frame_time);
        }

        assert_eq!(*a.frames.borrow(), vec![64, 80]);
    }

    #[test]
    fn test_drained_registry_stops_frames() {
        let (frames, scheduler) = scheduler();
        let (_a, a_cb) = recorder();

        scheduler.add_callback(&a_cb, 0).unwrap();
        frames.run_frame(16);
        assert!(frames.has_pending());

        scheduler.remove_callback(&a_cb).unwrap();
        assert!(scheduler.is_empty());

        frames.run_frame(32);
        assert!(!frames.has_pending());
    }

    #[test]
    fn test_remove_unknown_callback_is_noop() {
        let (_frames, scheduler) = scheduler();
        let (_a, a_cb) = recorder();
        assert_eq!(scheduler.remove_callback(&a_cb), Ok(()));
    }

    #[test]
    fn test_wrong_thread() {
        let scheduler = AnimationScheduler::new(Rc::new(ForeignFrames));
        let (_a, a_cb) = recorder();

        assert_eq!(
            scheduler.add_callback(&a_cb, 0),
            Err(AnimationError::WrongThread {
                action: "registered"
            })
        );
        assert_eq!(
            scheduler.remove_callback(&a_cb),
            Err(AnimationError::WrongThread {
                action: "unregistered"
            })
        );
        assert!(!scheduler.is_current_thread());
    }

    #[test]
    fn test_dropped_callback_is_pruned() {
        let (frames, scheduler) = scheduler();
        let (a, a_cb) = recorder();

        scheduler.add_callback(&a_cb, 0).unwrap();
        drop(a);
        drop(a_cb);

        frames.run_frame(16);
        assert!(scheduler.is_empty());
        assert!(!frames.has_pending());
    }

    #[test]
    fn test_scale_elapsed() {
        let (_frames, scheduler) = scheduler();
        assert_eq!(scheduler.scale_elapsed(16), 16);

        scheduler.set_duration_scale(2.0);
        assert_eq!(scheduler.scale_elapsed(16), 8);

        scheduler.set_duration_scale(0.5);
        assert_eq!(scheduler.scale_elapsed(16), 32);

        scheduler.set_duration_scale(0.0);
        assert_eq!(scheduler.scale_elapsed(16), i32::MAX as i64);

        scheduler.set_duration_scale(-1.0);
        assert_eq!(scheduler.duration_scale(), 0.0);
    }

    #[test]
    fn test_duration_scale_subscription_follows_registry() {
        let frames = Rc::new(FrameQueue::new());
        let setting = Rc::new(DurationScaleSetting::new(2.0));
        let scheduler = AnimationScheduler::builder(frames.clone())
            .clock(frames.clone())
            .duration_scale_source(setting.clone())
            .build();
        let (_a, a_cb) = recorder();

        assert!(!scheduler.is_subscribed_to_duration_scale());

        scheduler.add_callback(&a_cb, 0).unwrap();
        assert!(scheduler.is_subscribed_to_duration_scale());
        assert_eq!(scheduler.duration_scale(), 2.0);
        assert_eq!(setting.subscriber_count(), 1);

        setting.set(0.5);
        assert_eq!(scheduler.duration_scale(), 0.5);

        scheduler.remove_callback(&a_cb).unwrap();
        assert!(!scheduler.is_subscribed_to_duration_scale());
        assert_eq!(setting.subscriber_count(), 0);

        scheduler.add_callback(&a_cb, 0).unwrap();
        assert_eq!(setting.subscriber_count(), 1);
        drop(scheduler);
        assert_eq!(setting.subscriber_count(), 0);
    }
}
