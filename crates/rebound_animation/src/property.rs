//! Animatable float properties
//!
//! The engine never looks inside the animated object. It reads and writes one
//! `f32` through a [`FloatProperty`] accessor, and uses the property's
//! [`PropertyKind`] to pick a sensible default for the smallest change worth
//! animating.

use std::cell::Cell;
use std::rc::Rc;

/// One pixel
pub const MIN_VISIBLE_CHANGE_PIXELS: f32 = 1.0;
/// A tenth of a degree
pub const MIN_VISIBLE_CHANGE_ROTATION_DEGREES: f32 = 1.0 / 10.0;
/// One step of an 8-bit alpha channel
pub const MIN_VISIBLE_CHANGE_ALPHA: f32 = 1.0 / 256.0;
pub const MIN_VISIBLE_CHANGE_SCALE: f32 = 1.0 / 500.0;

/// Equilibrium position threshold as a fraction of the minimum visible change
pub const THRESHOLD_MULTIPLIER: f32 = 0.75;

/// Unit a property is measured in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropertyKind {
    #[default]
    Pixels,
    RotationDegrees,
    Alpha,
    Scale,
}

impl PropertyKind {
    /// Default minimum visible change for values of this kind
    pub const fn min_visible_change(self) -> f32 {
        match self {
            PropertyKind::Pixels => MIN_VISIBLE_CHANGE_PIXELS,
            PropertyKind::RotationDegrees => MIN_VISIBLE_CHANGE_ROTATION_DEGREES,
            PropertyKind::Alpha => MIN_VISIBLE_CHANGE_ALPHA,
            PropertyKind::Scale => MIN_VISIBLE_CHANGE_SCALE,
        }
    }
}

/// Accessor for one float channel of a target object
///
/// Targets are shared (`Rc<T>`), so setters take `&T` and rely on interior
/// mutability in the target.
pub trait FloatProperty<T: ?Sized> {
    fn name(&self) -> &str;
    fn get(&self, target: &T) -> f32;
    fn set(&self, target: &T, value: f32);

    fn kind(&self) -> PropertyKind {
        PropertyKind::Pixels
    }
}

/// Property built from a getter and a setter closure
pub struct FnProperty<T: ?Sized> {
    name: String,
    kind: PropertyKind,
    getter: Box<dyn Fn(&T) -> f32>,
    setter: Box<dyn Fn(&T, f32)>,
}

impl<T: ?Sized> FnProperty<T> {
    pub fn new(
        name: impl Into<String>,
        getter: impl Fn(&T) -> f32 + 'static,
        setter: impl Fn(&T, f32) + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Pixels,
            getter: Box::new(getter),
            setter: Box::new(setter),
        }
    }

    pub fn with_kind(mut self, kind: PropertyKind) -> Self {
        self.kind = kind;
        self
    }
}

impl<T: ?Sized> FloatProperty<T> for FnProperty<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, target: &T) -> f32 {
        (self.getter)(target)
    }

    fn set(&self, target: &T, value: f32) {
        (self.setter)(target, value)
    }

    fn kind(&self) -> PropertyKind {
        self.kind
    }
}

/// Standard transform and appearance channels of a view
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewProperty {
    X,
    Y,
    ScaleX,
    ScaleY,
    Rotation,
    RotationX,
    RotationY,
    Alpha,
    /// Whole pixels only; fractional values are truncated on write
    ScrollX,
}

impl ViewProperty {
    pub const ALL: [ViewProperty; 9] = [
        ViewProperty::X,
        ViewProperty::Y,
        ViewProperty::ScaleX,
        ViewProperty::ScaleY,
        ViewProperty::Rotation,
        ViewProperty::RotationX,
        ViewProperty::RotationY,
        ViewProperty::Alpha,
        ViewProperty::ScrollX,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewProperty::X => "x",
            ViewProperty::Y => "y",
            ViewProperty::ScaleX => "scaleX",
            ViewProperty::ScaleY => "scaleY",
            ViewProperty::Rotation => "rotation",
            ViewProperty::RotationX => "rotationX",
            ViewProperty::RotationY => "rotationY",
            ViewProperty::Alpha => "alpha",
            ViewProperty::ScrollX => "scrollX",
        }
    }
}

/// Object exposing the [`ViewProperty`] channels
pub trait ViewTarget {
    fn view_property(&self, property: ViewProperty) -> f32;
    fn set_view_property(&self, property: ViewProperty, value: f32);
}

impl<T: ViewTarget + ?Sized> FloatProperty<T> for ViewProperty {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn get(&self, target: &T) -> f32 {
        target.view_property(*self)
    }

    fn set(&self, target: &T, value: f32) {
        let value = match self {
            ViewProperty::ScrollX => value.trunc(),
            _ => value,
        };
        target.set_view_property(*self, value);
    }

    fn kind(&self) -> PropertyKind {
        match self {
            ViewProperty::Rotation | ViewProperty::RotationX | ViewProperty::RotationY => {
                PropertyKind::RotationDegrees
            }
            ViewProperty::Alpha => PropertyKind::Alpha,
            ViewProperty::ScaleX | ViewProperty::ScaleY => PropertyKind::Scale,
            ViewProperty::X | ViewProperty::Y | ViewProperty::ScrollX => PropertyKind::Pixels,
        }
    }
}

/// Free-standing animatable value
///
/// Clones share the same cell, so the creator keeps reading the value while an
/// animation writes it.
#[derive(Clone, Debug, Default)]
pub struct FloatValueHolder {
    value: Rc<Cell<f32>>,
}

impl FloatValueHolder {
    pub fn new(value: f32) -> Self {
        Self {
            value: Rc::new(Cell::new(value)),
        }
    }

    pub fn value(&self) -> f32 {
        self.value.get()
    }

    pub fn set_value(&self, value: f32) {
        self.value.set(value);
    }
}

/// Accessor used for [`FloatValueHolder`] targets
pub(crate) struct HeldValue;

impl FloatProperty<FloatValueHolder> for HeldValue {
    fn name(&self) -> &str {
        "FloatValueHolder"
    }

    fn get(&self, target: &FloatValueHolder) -> f32 {
        target.value()
    }

    fn set(&self, target: &FloatValueHolder, value: f32) {
        target.set_value(value);
    }
}

/// Property bound to its target, with the target type erased
pub(crate) trait PropertyAccess {
    fn name(&self) -> &str;
    fn get(&self) -> f32;
    fn set(&self, value: f32);
    fn kind(&self) -> PropertyKind;
}

pub(crate) struct BoundProperty<T: ?Sized, P> {
    target: Rc<T>,
    property: P,
}

impl<T: ?Sized, P> BoundProperty<T, P> {
    pub(crate) fn new(target: Rc<T>, property: P) -> Self {
        Self { target, property }
    }
}

impl<T: ?Sized, P: FloatProperty<T>> PropertyAccess for BoundProperty<T, P> {
    fn name(&self) -> &str {
        self.property.name()
    }

    fn get(&self) -> f32 {
        self.property.get(&self.target)
    }

    fn set(&self, value: f32) {
        self.property.set(&self.target, value)
    }

    fn kind(&self) -> PropertyKind {
        self.property.kind()
    }
}
