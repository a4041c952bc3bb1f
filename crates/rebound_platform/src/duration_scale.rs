//! Global animation duration scale
//!
//! Accessibility and developer settings can slow animations down, speed them
//! up, or turn them off entirely (scale `0`). Schedulers subscribe while they
//! have work and unsubscribe when they go idle.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle for an active duration scale subscription
    pub struct ScaleSubscription;
}

/// Listener notified with the new scale whenever it changes
pub type ScaleListener = Rc<dyn Fn(f32)>;

/// Provider of the global duration scale
pub trait DurationScaleSource {
    /// Current scale (1.0 = normal speed)
    fn duration_scale(&self) -> f32;

    /// Start receiving change notifications
    fn subscribe(&self, listener: ScaleListener) -> ScaleSubscription;

    /// Stop receiving change notifications
    ///
    /// Returns `false` if the subscription was unknown.
    fn unsubscribe(&self, subscription: ScaleSubscription) -> bool;
}

/// In-process duration scale setting
pub struct DurationScaleSetting {
    scale: Cell<f32>,
    listeners: RefCell<SlotMap<ScaleSubscription, ScaleListener>>,
}

impl DurationScaleSetting {
    pub fn new(scale: f32) -> Self {
        Self {
            scale: Cell::new(sanitize(scale).unwrap_or(1.0)),
            listeners: RefCell::new(SlotMap::with_key()),
        }
    }

    /// Change the scale and notify subscribers
    ///
    /// Negative and non-finite scales are ignored.
    pub fn set(&self, scale: f32) {
        let Some(scale) = sanitize(scale) else {
            tracing::warn!(scale, "Ignoring invalid duration scale");
            return;
        };
        if self.scale.replace(scale) == scale {
            return;
        }

        tracing::debug!(scale, "Duration scale changed");

        // Listeners may unsubscribe while being notified
        let listeners: Vec<ScaleListener> = self.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(scale);
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl Default for DurationScaleSetting {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl DurationScaleSource for DurationScaleSetting {
    fn duration_scale(&self) -> f32 {
        self.scale.get()
    }

    fn subscribe(&self, listener: ScaleListener) -> ScaleSubscription {
        self.listeners.borrow_mut().insert(listener)
    }

    fn unsubscribe(&self, subscription: ScaleSubscription) -> bool {
        self.listeners.borrow_mut().remove(subscription).is_some()
    }
}

fn sanitize(scale: f32) -> Option<f32> {
    (scale.is_finite() && scale >= 0.0).then_some(scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_follow_changes() {
        let setting = DurationScaleSetting::default();
        let seen = Rc::new(Cell::new(1.0f32));

        let seen_clone = seen.clone();
        let subscription = setting.subscribe(Rc::new(move |scale| seen_clone.set(scale)));
        assert_eq!(setting.subscriber_count(), 1);

        setting.set(0.5);
        assert_eq!(seen.get(), 0.5);
        assert_eq!(setting.duration_scale(), 0.5);

        assert!(setting.unsubscribe(subscription));
        assert!(!setting.unsubscribe(subscription));

        setting.set(3.0);
        assert_eq!(seen.get(), 0.5);
        assert_eq!(setting.duration_scale(), 3.0);
    }

    #[test]
    fn test_zero_scale_is_accepted() {
        let setting = DurationScaleSetting::default();
        setting.set(0.0);
        assert_eq!(setting.duration_scale(), 0.0);
    }

    #[test]
    fn test_invalid_scales_are_ignored() {
        let setting = DurationScaleSetting::new(2.0);
        setting.set(-1.0);
        setting.set(f32::NAN);
        setting.set(f32::INFINITY);
        assert_eq!(setting.duration_scale(), 2.0);

        assert_eq!(DurationScaleSetting::new(f32::NAN).duration_scale(), 1.0);
    }

    #[test]
    fn test_listener_can_unsubscribe_itself() {
        let setting = Rc::new(DurationScaleSetting::default());
        let subscription = Rc::new(Cell::new(None));

        let setting_clone = setting.clone();
        let subscription_clone = subscription.clone();
        let id = setting.subscribe(Rc::new(move |_| {
            if let Some(id) = subscription_clone.get() {
                setting_clone.unsubscribe(id);
            }
        }));
        subscription.set(Some(id));

        setting.set(0.25);
        assert_eq!(setting.subscriber_count(), 0);
    }
}
