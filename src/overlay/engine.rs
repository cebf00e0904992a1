//! Overlay construction.
//!
//! Builds a replacement object that is referentially distinct from the
//! original but indistinguishable from it for every non-overridden key:
//! descriptors are copied verbatim (getters and setters included), the
//! prototype chain keeps its depth, and the reported constructor identity
//! matches. Overridden keys always resolve to static values with any
//! inherited accessor semantics stripped.

use std::rc::Rc;

use tracing::trace;

use crate::masker::{label, mask};
use crate::overlay::object::{
    NativeFunction, ObjectRef, PropertyDescriptor, PropertyHost, Value, VirtualObject,
};

/// Declarative recipe for an overlay: the original object, the override map,
/// and an optional reported type name for container-like host types whose
/// stringification tag differs from a plain object.
pub struct OverlayDescriptor {
    original: ObjectRef,
    overrides: Vec<(String, Value)>,
    reported_type_name: Option<String>,
}

impl OverlayDescriptor {
    pub fn new(original: &ObjectRef) -> Self {
        Self {
            original: Rc::clone(original),
            overrides: Vec::new(),
            reported_type_name: None,
        }
    }

    /// Override a single key. Later entries win over earlier ones.
    pub fn override_key(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        self.overrides.retain(|(existing, _)| *existing != key);
        self.overrides.push((key, value));
        self
    }

    /// Override every key in `map`.
    pub fn overrides(mut self, map: impl IntoIterator<Item = (String, Value)>) -> Self {
        for (key, value) in map {
            self = self.override_key(key, value);
        }
        self
    }

    /// Report the overlay as an instance of `name` (e.g. `"PluginArray"`).
    pub fn reported_type_name(mut self, name: impl Into<String>) -> Self {
        self.reported_type_name = Some(name.into());
        self
    }

    pub fn build(self) -> ObjectRef {
        overlay(
            &self.original,
            &self.overrides,
            self.reported_type_name.as_deref(),
        )
    }
}

/// Build an overlay of `original` with the given overrides.
///
/// Guarantees:
/// - the result is referentially distinct from `original`;
/// - reading any non-overridden key behaves identically to reading it on the
///   original, side-effecting getters included;
/// - reading an overridden key yields the literal override value with no
///   residual accessor behavior;
/// - the prototype chain is one fresh link on top of the original's
///   prototype, so ancestor-type checks still hold while the overlay itself
///   is a new identity;
/// - `constructor` reports the original constructor's name as native code.
///
/// A key absent from the original is simply added as a fresh value property;
/// nothing here can fail.
pub fn overlay(
    original: &ObjectRef,
    overrides: &[(String, Value)],
    reported_type_name: Option<&str>,
) -> ObjectRef {
    let source = original.borrow();

    // Fresh prototype link on top of the original's prototype. Never the
    // original itself: that would alias its own-property set into the chain.
    let prototype = VirtualObject::with_prototype("Object", source.prototype());

    let constructor = mask(
        NativeFunction::new(&source.constructor_name(), |_| Value::Undefined),
        None,
    );
    let replacement = VirtualObject::construct(&constructor, prototype);

    {
        let mut target = replacement.borrow_mut();

        if let Some(name) = reported_type_name {
            target.set_string_tag(label(name, true));
        }

        // Verbatim copy of every own descriptor not being overridden.
        for key in source.own_property_names() {
            if overrides.iter().any(|(k, _)| *k == key) {
                continue;
            }
            if let Some(descriptor) = source.own_descriptor(&key) {
                target.define_property(&key, descriptor);
            }
        }

        for (key, value) in overrides {
            let descriptor = resolve_override(source.own_descriptor(key), value.clone());
            target.define_property(key, descriptor);
        }
    }

    trace!(
        kind = %source.constructor_name(),
        overrides = overrides.len(),
        "built object overlay"
    );

    replacement
}

/// Resolve an override against the original's own descriptor for the same
/// key, if any.
///
/// An existing descriptor keeps its attribute flags but loses any getter or
/// setter: overrides are always static values, never recomputed. A missing
/// descriptor starts from the writable/enumerable/configurable default.
pub fn resolve_override(existing: Option<PropertyDescriptor>, value: Value) -> PropertyDescriptor {
    let mut descriptor = match existing {
        Some(mut descriptor) => {
            descriptor.strip_accessors();
            descriptor
        }
        None => PropertyDescriptor::data(Value::Undefined),
    };
    descriptor.value = Some(value);
    descriptor
}
