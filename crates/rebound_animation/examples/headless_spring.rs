//! Headless Spring Demo
//!
//! Drives a spring animation from a simulated 60 Hz event loop:
//! - A card slides from 0 to 300 with the `snappy` preset
//! - Halfway through, it is retargeted to 120 without losing velocity
//! - The global duration scale is then set to 0 and the next run jumps
//!   straight to its end
//!
//! Run with: RUST_LOG=debug cargo run -p rebound_animation --example headless_spring

use rebound_animation::{
    AnimationScheduler, FloatValueHolder, Result, SpringAnimation, SpringConfig, SpringForce,
};
use rebound_platform::{DurationScaleSetting, FrameQueue, ManualClock};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

const FRAME_MS: i64 = 16;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let frames = Rc::new(FrameQueue::new());
    let clock = Rc::new(ManualClock::new(0));
    let duration_scale = Rc::new(DurationScaleSetting::default());
    let scheduler = AnimationScheduler::builder(frames.clone())
        .clock(clock.clone())
        .duration_scale_source(duration_scale.clone())
        .build();

    let offset = FloatValueHolder::new(0.0);
    let animation = SpringAnimation::from_value_holder(&scheduler, &offset);
    animation.set_spring(SpringForce::from_config(300.0, SpringConfig::snappy())?);
    animation.add_end_listener(|_, canceled, value, _| {
        tracing::info!(canceled, value, "card came to rest");
    });
    animation.add_update_listener(|_, value, velocity| {
        println!("{value:>9.3} {velocity:>10.3}");
    })?;

    animation.start()?;
    let mut frame = 0;
    while frames.has_pending() {
        frame += 1;
        clock.advance(FRAME_MS);
        frames.run_frame(clock_time(frame));

        if frame == 10 {
            tracing::info!("retargeting to 120");
            animation.animate_to_final_position(120.0)?;
        }
    }
    tracing::info!(frames = frame, value = offset.value(), "first run done");

    duration_scale.set(0.0);
    animation.animate_to_final_position(0.0)?;
    let mut skipped = 0;
    while frames.has_pending() {
        skipped += 1;
        frame += 1;
        clock.advance(FRAME_MS);
        frames.run_frame(clock_time(frame));
    }
    tracing::info!(frames = skipped, value = offset.value(), "run with animations off");

    Ok(())
}

fn clock_time(frame: i64) -> i64 {
    frame * FRAME_MS
}
