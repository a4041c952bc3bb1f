//! Integration tests for scheduler dispatch and the duration scale
//!
//! These tests verify that:
//! - Many animations share a single frame request per frame
//! - The duration scale slows down, speeds up or skips animations
//! - The scale subscription is held only while animations run

use rebound_animation::{
    AnimationFrameCallback, AnimationScheduler, FloatValueHolder, SpringAnimation, SpringConfig,
    SpringForce,
};
use rebound_platform::{DurationScaleSetting, FrameQueue, ManualClock};
use std::cell::RefCell;
use std::rc::Rc;

fn scaled_setup(scale: f32) -> (Rc<FrameQueue>, Rc<DurationScaleSetting>, AnimationScheduler) {
    let frames = Rc::new(FrameQueue::new());
    let setting = Rc::new(DurationScaleSetting::new(scale));
    let scheduler = AnimationScheduler::builder(frames.clone())
        .clock(frames.clone())
        .duration_scale_source(setting.clone())
        .build();
    (frames, setting, scheduler)
}

fn spring_to(
    scheduler: &AnimationScheduler,
    holder: &FloatValueHolder,
    target: f32,
) -> SpringAnimation {
    let animation = SpringAnimation::from_value_holder(scheduler, holder);
    animation.set_spring(SpringForce::from_config(target, SpringConfig::new(1500.0, 1.0)).unwrap());
    animation
}

/// Several running animations cost one frame request
#[test]
fn test_animations_share_frame_request() {
    let (frames, _setting, scheduler) = scaled_setup(1.0);
    let holders: Vec<FloatValueHolder> = (0..3).map(|_| FloatValueHolder::new(0.0)).collect();
    let animations: Vec<SpringAnimation> = holders
        .iter()
        .enumerate()
        .map(|(i, holder)| spring_to(&scheduler, holder, 10.0 * (i + 1) as f32))
        .collect();

    for animation in &animations {
        animation.start().unwrap();
    }
    assert_eq!(scheduler.callback_count(), 3);
    assert_eq!(frames.pending_count(), 1);

    frames.run_frame(16);
    frames.run_frame(32);
    assert_eq!(frames.pending_count(), 1);
    assert!(holders.iter().all(|holder| holder.value() > 0.0));
}

/// Scale 0 resolves the animation on the next integrating frame
#[test]
fn test_zero_duration_scale_finishes_immediately() {
    let (frames, _setting, scheduler) = scaled_setup(0.0);
    let holder = FloatValueHolder::new(0.0);
    let animation = spring_to(&scheduler, &holder, 100.0);

    animation.start().unwrap();
    assert_eq!(scheduler.duration_scale(), 0.0);

    frames.run_frame(16);
    assert!(animation.is_running());

    frames.run_frame(32);
    assert_eq!(holder.value(), 100.0);
    assert!(animation.velocity().is_finite());
    assert!(!animation.is_running());
}

/// A scale of 2 plays animations at half speed
#[test]
fn test_duration_scale_slows_animation() {
    let (frames, _setting, scheduler) = scaled_setup(2.0);
    let (normal_frames, _normal_setting, normal_scheduler) = scaled_setup(1.0);

    let slow = FloatValueHolder::new(0.0);
    let reference = FloatValueHolder::new(0.0);
    let slow_animation = spring_to(&scheduler, &slow, 100.0);
    let reference_animation = spring_to(&normal_scheduler, &reference, 100.0);
    slow_animation.start().unwrap();
    reference_animation.start().unwrap();

    // 32 ms at half speed matches 16 ms at normal speed
    frames.run_frame(0);
    frames.run_frame(32);
    normal_frames.run_frame(0);
    normal_frames.run_frame(16);

    assert!((slow.value() - reference.value()).abs() < 1e-4);
}

/// Scale changes reach running animations; idle schedulers do not listen
#[test]
fn test_scale_subscription_lifecycle() {
    let (frames, setting, scheduler) = scaled_setup(1.0);
    let holder = FloatValueHolder::new(0.0);
    let animation = spring_to(&scheduler, &holder, 100.0);

    assert_eq!(setting.subscriber_count(), 0);
    animation.start().unwrap();
    assert_eq!(setting.subscriber_count(), 1);
    assert!(scheduler.is_subscribed_to_duration_scale());

    frames.run_frame(16);
    setting.set(0.0);
    assert_eq!(scheduler.duration_scale(), 0.0);

    frames.run_frame(32);
    assert!(!animation.is_running());
    assert_eq!(setting.subscriber_count(), 0);
    assert!(!scheduler.is_subscribed_to_duration_scale());

    // Changes while idle are picked up on the next start
    setting.set(1.0);
    animation.animate_to_final_position(0.0).unwrap();
    assert_eq!(scheduler.duration_scale(), 1.0);
}

#[derive(Default)]
struct Ticks(RefCell<Vec<i64>>);

impl AnimationFrameCallback for Ticks {
    fn do_animation_frame(&self, frame_time: i64) {
        self.0.borrow_mut().push(frame_time);
    }
}

/// Delayed callbacks wait on the scheduler clock, not on frame times
#[test]
fn test_delay_uses_scheduler_clock() {
    let frames = Rc::new(FrameQueue::new());
    let clock = Rc::new(ManualClock::new(1_000));
    let scheduler = AnimationScheduler::builder(frames.clone())
        .clock(clock.clone())
        .build();

    let ticks = Rc::new(Ticks::default());
    let callback: Rc<dyn AnimationFrameCallback> = ticks.clone();
    scheduler.add_callback(&callback, 100).unwrap();

    frames.run_frame(1);
    clock.advance(100);
    frames.run_frame(2);
    clock.advance(1);
    frames.run_frame(3);
    frames.run_frame(4);

    assert_eq!(*ticks.0.borrow(), vec![3, 4]);

    scheduler.remove_callback(&callback).unwrap();
    frames.run_frame(5);
    assert!(!frames.has_pending());
}
