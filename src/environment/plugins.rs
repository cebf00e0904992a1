//! Plugin and media capability spoofs.
//!
//! Headless engines ship without Flash, Java or media codecs, and probes
//! check all three. Each spoof here rebuilds the relevant surface through the
//! overlay engine so the advertised capability is indistinguishable from a
//! real one: container objects report their host types, injected callables
//! describe themselves as native code.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::masker::mask;
use crate::overlay::{
    get_property, FunctionRef, NativeFunction, ObjectRef, OverlayDescriptor, Value, VirtualObject,
};

pub const FLASH_MIME_TYPE: &str = "application/x-shockwave-flash";
pub const FLASH_PLUGIN_NAME: &str = "Shockwave Flash";

/// Identity of the Flash plugin to advertise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashPlugin {
    pub version: String,
    pub description: String,
    pub filename: String,
}

impl FlashPlugin {
    pub fn windows() -> Self {
        Self {
            version: "WIN 20,0,0,185".to_string(),
            description: "Shockwave Flash 20.0 r0".to_string(),
            filename: "NPSWF32.dll".to_string(),
        }
    }

    pub fn linux() -> Self {
        Self {
            version: "LNX 20,0,0,185".to_string(),
            description: "Shockwave Flash 20.0 r0".to_string(),
            filename: "libpepflashplayer.so".to_string(),
        }
    }

    pub fn mac() -> Self {
        Self {
            version: "MAC 20,0,0,185".to_string(),
            description: "Shockwave Flash 20.0 r0".to_string(),
            filename: "Shockwave Flash.Plugin".to_string(),
        }
    }
}

/// Advertise a Flash plugin on `window.navigator`.
///
/// Builds the mime type and plugin entries with their mutual references
/// (`mime.enabledPlugin` points back at the plugin, `plugin[0]` at the mime
/// type), then overlays `mimeTypes`, `plugins` and finally `navigator` itself
/// so the containers keep their reported host types. Elements created for
/// `<object>` and `<embed>` tags additionally carry [`flash_get_variable`],
/// so a movie-level version probe gets an answer too.
pub fn spoof_flash(window: &ObjectRef, flash: &FlashPlugin) {
    let navigator = match get_property(window, "navigator") {
        Value::Object(navigator) => navigator,
        _ => return,
    };

    let mime = VirtualObject::new("MimeType");
    let plugin = VirtualObject::new("Plugin");
    {
        let mut entry = mime.borrow_mut();
        entry.set("type", Value::str(FLASH_MIME_TYPE));
        entry.set("suffixes", Value::str("swf"));
        entry.set("description", Value::str(&flash.description));
        entry.set("enabledPlugin", Value::Object(Rc::clone(&plugin)));
    }
    {
        let mut entry = plugin.borrow_mut();
        entry.set("name", Value::str(FLASH_PLUGIN_NAME));
        entry.set("description", Value::str(&flash.description));
        entry.set("filename", Value::str(&flash.filename));
        entry.set("length", Value::Number(1.0));
        entry.set("0", Value::Object(Rc::clone(&mime)));
    }

    let mime_types = container(&navigator, "mimeTypes", "MimeTypeArray");
    let mime_types = OverlayDescriptor::new(&mime_types)
        .override_key(FLASH_MIME_TYPE, Value::Object(Rc::clone(&mime)))
        .override_key("0", Value::Object(mime))
        .override_key("length", Value::Number(1.0))
        .reported_type_name("MimeTypeArray")
        .build();

    let plugins = container(&navigator, "plugins", "PluginArray");
    let plugins = OverlayDescriptor::new(&plugins)
        .override_key(FLASH_PLUGIN_NAME, Value::Object(Rc::clone(&plugin)))
        .override_key("0", Value::Object(plugin))
        .override_key("length", Value::Number(1.0))
        .reported_type_name("PluginArray")
        .build();

    let navigator = OverlayDescriptor::new(&navigator)
        .override_key("mimeTypes", Value::Object(mime_types))
        .override_key("plugins", Value::Object(plugins))
        .build();
    window.borrow_mut().set("navigator", Value::Object(navigator));

    if let Value::Object(document) = get_property(window, "document") {
        attach_get_variable(&document, flash);
    }

    debug!(version = %flash.version, "flash plugin advertised");
}

/// The `GetVariable` callable a Flash probe invokes on an embedded movie.
/// Answers the `$version` query with the configured version string.
pub fn flash_get_variable(flash: &FlashPlugin) -> FunctionRef {
    let version = flash.version.clone();
    mask(
        NativeFunction::new("GetVariable", move |args| {
            match args.first().and_then(Value::as_str) {
                Some("$version") => Value::str(version.clone()),
                _ => Value::Undefined,
            }
        }),
        None,
    )
}

/// Hand `GetVariable` to the elements a Flash probe instantiates.
///
/// Wraps `document.createElement` so `<object>` and `<embed>` elements carry
/// the masked callable; other tags pass through untouched.
fn attach_get_variable(document: &ObjectRef, flash: &FlashPlugin) {
    let original = match get_property(document, "createElement") {
        Value::Function(create) => create,
        _ => return,
    };
    let flash = flash.clone();
    let wrapped = mask(
        NativeFunction::new("createElement", move |args| {
            let element = original.call(args);
            let tag = args.first().and_then(Value::as_str).unwrap_or("");
            if matches!(tag, "object" | "embed") {
                if let Value::Object(element) = &element {
                    element
                        .borrow_mut()
                        .set("GetVariable", Value::Function(flash_get_variable(&flash)));
                }
            }
            element
        }),
        None,
    );
    document
        .borrow_mut()
        .set("createElement", Value::Function(wrapped));
}

/// Make `navigator.javaEnabled()` report a working Java plugin.
pub fn spoof_java(window: &ObjectRef) {
    let navigator = match get_property(window, "navigator") {
        Value::Object(navigator) => navigator,
        _ => return,
    };
    let java_enabled = mask(
        NativeFunction::new("javaEnabled", |_| Value::Bool(true)),
        None,
    );
    let navigator = OverlayDescriptor::new(&navigator)
        .override_key("javaEnabled", Value::Function(java_enabled))
        .build();
    window.borrow_mut().set("navigator", Value::Object(navigator));
    debug!("java plugin advertised");
}

/// Make `<video>` and `<audio>` elements claim codec support.
///
/// Replaces `document.createElement` with a masked wrapper that delegates to
/// the original and, for media tags, attaches a masked `canPlayType`
/// answering `"probably"`.
pub fn spoof_html5_media(document: &ObjectRef) {
    let original = match get_property(document, "createElement") {
        Value::Function(create) => create,
        _ => return,
    };

    let wrapped = mask(
        NativeFunction::new("createElement", move |args| {
            let element = original.call(args);
            let tag = args.first().and_then(Value::as_str).unwrap_or("");
            if matches!(tag, "video" | "audio") {
                if let Value::Object(element) = &element {
                    let can_play = mask(
                        NativeFunction::new("canPlayType", |_| Value::str("probably")),
                        None,
                    );
                    element
                        .borrow_mut()
                        .set("canPlayType", Value::Function(can_play));
                }
            }
            element
        }),
        None,
    );
    document
        .borrow_mut()
        .set("createElement", Value::Function(wrapped));
    debug!("html5 media capability advertised");
}

/// An existing container property on `navigator`, or a fresh one when the
/// page graph never defined it.
fn container(navigator: &ObjectRef, key: &str, type_name: &str) -> ObjectRef {
    match get_property(navigator, key) {
        Value::Object(existing) => existing,
        _ => VirtualObject::new(type_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_window() -> ObjectRef {
        let window = VirtualObject::new("Window");
        let navigator = VirtualObject::new("Navigator");
        navigator.borrow_mut().set(
            "mimeTypes",
            Value::Object(VirtualObject::new("MimeTypeArray")),
        );
        navigator
            .borrow_mut()
            .set("plugins", Value::Object(VirtualObject::new("PluginArray")));
        window
            .borrow_mut()
            .set("navigator", Value::Object(navigator));
        window
    }

    #[test]
    fn flash_entries_reference_each_other() {
        let window = blank_window();
        spoof_flash(&window, &FlashPlugin::linux());

        let navigator = get_property(&window, "navigator");
        let navigator = navigator.as_object().expect("navigator");
        let plugins = get_property(navigator, "plugins");
        let plugins = plugins.as_object().expect("plugins");
        let plugin = get_property(plugins, FLASH_PLUGIN_NAME);
        let plugin = plugin.as_object().expect("plugin entry");
        let mime = get_property(plugin, "0");
        let mime = mime.as_object().expect("mime entry");

        assert_eq!(get_property(mime, "suffixes"), Value::str("swf"));
        let back = get_property(mime, "enabledPlugin");
        assert_eq!(back, Value::Object(Rc::clone(plugin)));
        assert_eq!(get_property(plugins, "length"), Value::Number(1.0));
    }

    #[test]
    fn flash_containers_report_host_types() {
        let window = blank_window();
        spoof_flash(&window, &FlashPlugin::windows());

        let navigator = get_property(&window, "navigator");
        let navigator = navigator.as_object().expect("navigator");
        let mime_types = get_property(navigator, "mimeTypes");
        assert_eq!(mime_types.to_display_string(), "[object MimeTypeArray]");
        let plugins = get_property(navigator, "plugins");
        assert_eq!(plugins.to_display_string(), "[object PluginArray]");
    }

    #[test]
    fn get_variable_answers_the_version_probe() {
        let flash = FlashPlugin::windows();
        let probe = flash_get_variable(&flash);
        assert_eq!(
            probe.call(&[Value::str("$version")]),
            Value::str("WIN 20,0,0,185")
        );
        assert_eq!(probe.call(&[Value::str("$other")]), Value::Undefined);
        assert_eq!(
            probe.to_display_string(),
            "function GetVariable() { [native code] }"
        );
    }

    #[test]
    fn created_flash_elements_answer_the_version_probe() {
        let window = blank_window();
        let document = VirtualObject::new("HTMLDocument");
        document.borrow_mut().set(
            "createElement",
            Value::Function(NativeFunction::new("createElement", |args| {
                let tag = args.first().and_then(Value::as_str).unwrap_or("");
                Value::Object(VirtualObject::new(match tag {
                    "object" => "HTMLObjectElement",
                    "embed" => "HTMLEmbedElement",
                    _ => "HTMLElement",
                }))
            })),
        );
        window
            .borrow_mut()
            .set("document", Value::Object(Rc::clone(&document)));

        spoof_flash(&window, &FlashPlugin::windows());

        let create = get_property(&document, "createElement");
        let create = create.as_function().expect("createElement");
        for tag in ["object", "embed"] {
            let element = create.call(&[Value::str(tag)]);
            let element = element.as_object().expect("flash element");
            let probe = get_property(element, "GetVariable");
            let probe = probe.as_function().expect("GetVariable");
            assert_eq!(
                probe.call(&[Value::str("$version")]),
                Value::str("WIN 20,0,0,185")
            );
            assert_eq!(
                probe.to_display_string(),
                "function GetVariable() { [native code] }"
            );
        }

        let div = create.call(&[Value::str("div")]);
        let div = div.as_object().expect("plain element");
        assert_eq!(get_property(div, "GetVariable"), Value::Undefined);
    }

    #[test]
    fn java_enabled_is_native_and_true() {
        let window = blank_window();
        spoof_java(&window);
        let navigator = get_property(&window, "navigator");
        let navigator = navigator.as_object().expect("navigator");
        let probe = get_property(navigator, "javaEnabled");
        let probe = probe.as_function().expect("javaEnabled");
        assert_eq!(probe.call(&[]), Value::Bool(true));
        assert_eq!(
            probe.to_display_string(),
            "function javaEnabled() { [native code] }"
        );
    }

    #[test]
    fn media_elements_claim_codec_support() {
        let document = VirtualObject::new("HTMLDocument");
        let create = NativeFunction::new("createElement", |args| {
            let tag = args.first().and_then(Value::as_str).unwrap_or("");
            let element = VirtualObject::new(match tag {
                "video" => "HTMLVideoElement",
                "audio" => "HTMLAudioElement",
                _ => "HTMLElement",
            });
            Value::Object(element)
        });
        document
            .borrow_mut()
            .set("createElement", Value::Function(create));

        spoof_html5_media(&document);

        let wrapped = get_property(&document, "createElement");
        let wrapped = wrapped.as_function().expect("createElement");
        assert_eq!(
            wrapped.to_display_string(),
            "function createElement() { [native code] }"
        );

        let video = wrapped.call(&[Value::str("video")]);
        let video = video.as_object().expect("video element");
        let can_play = get_property(video, "canPlayType");
        let can_play = can_play.as_function().expect("canPlayType");
        assert_eq!(can_play.call(&[Value::str("video/mp4")]), Value::str("probably"));

        let div = wrapped.call(&[Value::str("div")]);
        let div = div.as_object().expect("plain element");
        assert_eq!(get_property(div, "canPlayType"), Value::Undefined);
    }
}
