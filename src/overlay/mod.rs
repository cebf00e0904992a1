//! Identity-preserving object overlays.
//!
//! An overlay is a replacement object that behaves like an original object
//! except for an explicit set of overridden properties. Everything else is
//! preserved bit-for-bit: unmodified own-property descriptors (including
//! side-effecting getters), prototype chain shape, and reported type identity.
//!
//! The engine operates over the [`PropertyHost`] capability interface rather
//! than any specific object system; [`VirtualObject`] is the in-memory
//! implementation standing in for the page's object graph.
//!
//! # Example
//!
//! ```rust
//! use envmask::overlay::{OverlayDescriptor, Value, VirtualObject, get_property};
//!
//! let navigator = VirtualObject::new("Navigator");
//! navigator.borrow_mut().set("platform", Value::str("Linux x86_64"));
//! navigator.borrow_mut().set("appName", Value::str("Netscape"));
//!
//! let patched = OverlayDescriptor::new(&navigator)
//!     .override_key("platform", Value::str("Win32"))
//!     .build();
//!
//! assert_eq!(get_property(&patched, "platform"), Value::str("Win32"));
//! assert_eq!(get_property(&patched, "appName"), Value::str("Netscape"));
//! ```

mod engine;
mod object;

pub use engine::{overlay, resolve_override, OverlayDescriptor};
pub use object::{
    get_property, FunctionRef, Getter, NativeFunction, ObjectRef, PropertyDescriptor,
    PropertyHost, Setter, Value,
};
pub use object::VirtualObject;
