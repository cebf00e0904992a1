//! Integration tests for the overlay engine and native-function masking
//!
//! Exercises the identity guarantees end to end: referentially fresh
//! replacements, verbatim descriptor copies, static overrides, and native
//! self-description of every injected callable.

use std::cell::RefCell;
use std::rc::Rc;

use envmask::masker::mask;
use envmask::overlay::{
    get_property, overlay, NativeFunction, OverlayDescriptor, PropertyDescriptor, PropertyHost,
    Value, VirtualObject,
};

fn sample_navigator() -> envmask::ObjectRef {
    let proto = VirtualObject::new("Navigator");
    let navigator = VirtualObject::with_prototype("Navigator", Some(proto));
    {
        let mut nav = navigator.borrow_mut();
        nav.set("userAgent", Value::str("Mozilla/5.0 (X11; Linux x86_64)"));
        nav.set("platform", Value::str("Linux x86_64"));
        nav.set("language", Value::str("en-US"));
        nav.define_property(
            "appCodeName",
            PropertyDescriptor::read_only(Value::str("Mozilla")),
        );
    }
    navigator
}

#[test]
fn navigator_spoof_end_to_end() {
    let original = sample_navigator();
    let hits = Rc::new(RefCell::new(0));
    {
        let counter = Rc::clone(&hits);
        original.borrow_mut().define_property(
            "onLine",
            PropertyDescriptor::accessor(
                Some(Rc::new(move || {
                    *counter.borrow_mut() += 1;
                    Value::Bool(true)
                })),
                None,
            ),
        );
    }

    let patched = OverlayDescriptor::new(&original)
        .override_key("userAgent", Value::str("Mozilla/5.0 (Windows NT 10.0)"))
        .override_key("platform", Value::str("Win32"))
        .build();

    // Fresh identity, patched values, untouched original.
    assert!(!Rc::ptr_eq(&original, &patched));
    assert_eq!(
        get_property(&patched, "userAgent"),
        Value::str("Mozilla/5.0 (Windows NT 10.0)")
    );
    assert_eq!(
        get_property(&original, "platform"),
        Value::str("Linux x86_64")
    );

    // Untouched keys behave identically, live getter included.
    assert_eq!(get_property(&patched, "language"), Value::str("en-US"));
    assert_eq!(get_property(&patched, "onLine"), Value::Bool(true));
    assert_eq!(*hits.borrow(), 1);

    // The constructor reports the original type as native code.
    let constructor = patched.borrow().constructor().expect("constructor");
    assert_eq!(
        constructor.to_display_string(),
        "function Navigator() { [native code] }"
    );
    assert_eq!(patched.borrow().constructor_name(), "Navigator");
}

#[test]
fn read_only_descriptor_flags_survive_the_copy() {
    let original = sample_navigator();
    let patched = overlay(&original, &[], None);
    let descriptor = patched
        .borrow()
        .own_descriptor("appCodeName")
        .expect("descriptor");
    assert!(!descriptor.writable);
    assert!(!descriptor.configurable);
    assert_eq!(descriptor.read(), Value::str("Mozilla"));
}

#[test]
fn overridden_accessor_never_runs_again() {
    let hits = Rc::new(RefCell::new(0));
    let original = sample_navigator();
    {
        let counter = Rc::clone(&hits);
        original.borrow_mut().define_property(
            "webdriver",
            PropertyDescriptor::accessor(
                Some(Rc::new(move || {
                    *counter.borrow_mut() += 1;
                    Value::Bool(true)
                })),
                None,
            ),
        );
    }

    let patched = overlay(
        &original,
        &[("webdriver".to_string(), Value::Bool(false))],
        None,
    );
    assert_eq!(get_property(&patched, "webdriver"), Value::Bool(false));
    assert_eq!(get_property(&patched, "webdriver"), Value::Bool(false));
    assert_eq!(*hits.borrow(), 0);
}

#[test]
fn stacked_overlays_compose() {
    let original = sample_navigator();
    let first = overlay(
        &original,
        &[("platform".to_string(), Value::str("MacIntel"))],
        None,
    );
    let second = overlay(
        &first,
        &[("language".to_string(), Value::str("de-DE"))],
        None,
    );

    assert_eq!(get_property(&second, "platform"), Value::str("MacIntel"));
    assert_eq!(get_property(&second, "language"), Value::str("de-DE"));
    assert_eq!(
        second.borrow().prototype_chain_len(),
        original.borrow().prototype_chain_len() + 2
    );
    // Ancestor membership still holds through both layers.
    let ancestor = original.borrow().prototype().expect("prototype");
    assert!(second.borrow().has_prototype(&ancestor));
}

#[test]
fn container_overlay_reports_its_host_type() {
    let plugins = VirtualObject::new("PluginArray");
    plugins.borrow_mut().set("length", Value::Number(0.0));

    let entry = VirtualObject::new("Plugin");
    entry.borrow_mut().set("name", Value::str("Shockwave Flash"));

    let patched = OverlayDescriptor::new(&plugins)
        .override_key("Shockwave Flash", Value::Object(Rc::clone(&entry)))
        .override_key("0", Value::Object(entry))
        .override_key("length", Value::Number(1.0))
        .reported_type_name("PluginArray")
        .build();

    assert_eq!(patched.borrow().to_display_string(), "[object PluginArray]");
    assert_eq!(get_property(&patched, "length"), Value::Number(1.0));
    let by_name = get_property(&patched, "Shockwave Flash");
    let by_index = get_property(&patched, "0");
    assert_eq!(by_name, by_index);
}

#[test]
fn masked_callable_is_native_all_the_way_down() {
    let probe = mask(
        NativeFunction::new("javaEnabled", |_| Value::Bool(true)),
        None,
    );

    assert_eq!(probe.call(&[]), Value::Bool(true));
    assert_eq!(
        probe.to_display_string(),
        "function javaEnabled() { [native code] }"
    );

    // Stringifying the stringifier itself keeps reporting native code, and
    // the chain is closed rather than infinite.
    let source = probe.source().expect("masked source");
    let own = source.own_to_string();
    assert_eq!(own.render(), "function toString() { [native code] }");
    assert!(std::ptr::eq(own, own.own_to_string()));
}

#[test]
fn masking_can_rename_the_callable() {
    let renamed = mask(
        NativeFunction::new("anonymous", |_| Value::Undefined),
        Some("getBattery"),
    );
    assert_eq!(renamed.name(), "getBattery");
    assert_eq!(
        renamed.to_display_string(),
        "function getBattery() { [native code] }"
    );
}
