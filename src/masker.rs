//! Native-identity masking for injected callables.
//!
//! Page scripts probe injected helpers by stringifying them: a genuine platform
//! function reports `"function name() { [native code] }"`, while anything built
//! by an automation layer reports its actual source. This module rewrites a
//! callable's self-description so every inspection path yields the native form,
//! including inspection of the stringifier itself.
//!
//! The self-referential pin of the original pattern
//! (`toString.toString = toString.toString`) is modeled as a closed table: a
//! stringifier's own metadata entry points to one shared "native toString"
//! label rather than to itself as a live function reference, so the recursion
//! terminates by construction.
//!
//! # Example
//!
//! ```rust
//! use envmask::masker::{label, mask};
//! use envmask::overlay::{NativeFunction, Value};
//!
//! let java_enabled = NativeFunction::new("javaEnabled", |_| Value::Bool(true));
//! let java_enabled = mask(java_enabled, None);
//!
//! assert_eq!(
//!     java_enabled.to_display_string(),
//!     "function javaEnabled() { [native code] }"
//! );
//!
//! let tag = label("PluginArray", true);
//! assert_eq!(tag.render(), "[object PluginArray]");
//! assert_eq!(tag.own_to_string().render(), "function toString() { [native code] }");
//! ```

use once_cell::sync::Lazy;

use crate::overlay::FunctionRef;

/// The shared "native toString" stringifier every masked surface points to.
///
/// Its own `own_to_string` resolves back to itself, closing the table.
static NATIVE_TO_STRING: Lazy<Stringifier> = Lazy::new(|| Stringifier {
    label: NativeLabel {
        display_name: "toString".to_string(),
        object_form: false,
    },
});

/// What a masked surface reports about itself when stringified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeLabel {
    /// Name rendered into the native-code or object-tag form.
    pub display_name: String,
    /// `true` renders `"[object <name>]"`, `false` the function form.
    pub object_form: bool,
}

/// A reusable stringification function for a masked surface.
///
/// `render` produces the spoofed self-description; `own_to_string` is the
/// stringifier's own stringification, pinned to the shared native `toString`
/// entry so no inspection depth reveals the masking layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stringifier {
    label: NativeLabel,
}

impl Stringifier {
    /// The label this stringifier renders.
    pub fn label(&self) -> &NativeLabel {
        &self.label
    }

    /// Render the spoofed self-description.
    pub fn render(&self) -> String {
        if self.label.object_form {
            format!("[object {}]", self.label.display_name)
        } else {
            format!("function {}() {{ [native code] }}", self.label.display_name)
        }
    }

    /// The stringifier's own stringification entry.
    ///
    /// Always the shared native `toString` stringifier; calling `own_to_string`
    /// on the result yields the same entry again, so the pin holds at every
    /// inspection depth.
    pub fn own_to_string(&self) -> &'static Stringifier {
        &NATIVE_TO_STRING
    }
}

/// Produce a stringifier for `name`.
///
/// With `as_object` false the native-function form is rendered, with `true`
/// the `"[object <name>]"` tag used for spoofed host-type instances.
pub fn label(name: &str, as_object: bool) -> Stringifier {
    Stringifier {
        label: NativeLabel {
            display_name: name.to_string(),
            object_form: as_object,
        },
    }
}

/// Rebrand `callable` so stringification reports it as platform-native code.
///
/// `name` defaults to the callable's intrinsic name. Only the callable's
/// reported metadata changes; invocation behavior is untouched.
pub fn mask(callable: FunctionRef, name: Option<&str>) -> FunctionRef {
    let display = match name {
        Some(name) => {
            callable.set_name(name);
            name.to_string()
        }
        None => callable.name(),
    };
    callable.set_source(label(&display, false));
    callable
}
