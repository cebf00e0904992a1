//! JavaScript emission for hosts that apply the spoofs inside a real page.
//!
//! The in-memory engine in [`crate::overlay`] defines the semantics; this
//! module renders the same operations as an injectable script for embedders
//! that drive an actual browser page. Scripts MUST be injected before any
//! page script runs, or probes can capture the pristine objects first.

use std::collections::HashMap;

use crate::config::PageSettings;
use crate::environment::{FlashPlugin, ScreenGeometry};

/// Shared runtime helpers every emitted snippet relies on: a native-function
/// masker and the overlay constructor. Mirrors the in-memory engine: fresh
/// identity, verbatim descriptor copy, static override values, pinned
/// native stringification.
const RUNTIME_HELPERS: &str = r#"
    var __nativeToString = function() { return 'function toString() { [native code] }'; };
    __nativeToString.toString = __nativeToString;

    function __maskNative(fn, name) {
        if (name) {
            try { Object.defineProperty(fn, 'name', { value: name }); } catch (e) {}
        }
        var rendered = 'function ' + (name || fn.name || '') + '() { [native code] }';
        fn.toString = function() { return rendered; };
        fn.toString.toString = __nativeToString;
        return fn;
    }

    function __overlay(original, overrides, typeName) {
        var replacement = Object.create(Object.getPrototypeOf(original));
        Object.getOwnPropertyNames(original).forEach(function(key) {
            if (Object.prototype.hasOwnProperty.call(overrides, key)) { return; }
            var descriptor = Object.getOwnPropertyDescriptor(original, key);
            try { Object.defineProperty(replacement, key, descriptor); } catch (e) {}
        });
        Object.keys(overrides).forEach(function(key) {
            var descriptor = Object.getOwnPropertyDescriptor(original, key) ||
                { writable: true, enumerable: true, configurable: true };
            delete descriptor.get;
            delete descriptor.set;
            descriptor.value = overrides[key];
            try { Object.defineProperty(replacement, key, descriptor); } catch (e) {}
        });
        var ctorName = (original.constructor && original.constructor.name) || 'Object';
        replacement.constructor = __maskNative(function() {}, ctorName);
        if (typeName) {
            replacement.toString = __maskNative(function() {
                return '[object ' + typeName + ']';
            }, 'toString');
        }
        return replacement;
    }
"#;

/// Escape a string for embedding inside a double-quoted JS literal.
pub fn escape_js_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            other => out.push(other),
        }
    }
    out
}

fn overrides_json(overrides: &HashMap<String, serde_json::Value>) -> String {
    serde_json::to_string(&overrides).unwrap_or_else(|_| "{}".to_string())
}

/// Snippet replacing `target` with an overlay carrying `overrides`.
pub fn overlay_script(
    target: &str,
    overrides: &HashMap<String, serde_json::Value>,
    reported_type_name: Option<&str>,
) -> String {
    let type_name = match reported_type_name {
        Some(name) => format!("\"{}\"", escape_js_string(name)),
        None => "null".to_string(),
    };
    format!(
        "    {target} = __overlay({target}, {overrides}, {type_name});\n",
        target = target,
        overrides = overrides_json(overrides),
        type_name = type_name,
    )
}

/// Snippet applying a generated screen geometry plus any explicit overrides.
pub fn screen_script(
    geometry: &ScreenGeometry,
    extra: &HashMap<String, serde_json::Value>,
) -> String {
    let mut overrides: HashMap<String, serde_json::Value> = HashMap::new();
    for (key, value) in geometry.screen_overrides() {
        if let Some(number) = value.as_number() {
            overrides.insert(key, serde_json::json!(number as i64));
        }
    }
    for (key, value) in extra {
        overrides.insert(key.clone(), value.clone());
    }

    let mut script = overlay_script("window.screen", &overrides, None);
    for (key, value) in geometry.window_props() {
        if let Some(number) = value.as_number() {
            script.push_str(&format!("    window.{} = {};\n", key, number as i64));
        }
    }
    script
}

/// Snippet advertising a Flash plugin on `navigator`. Also hangs the masked
/// `GetVariable` off the object/embed element prototypes so a movie-level
/// `$version` probe gets an answer.
pub fn flash_script(flash: &FlashPlugin) -> String {
    format!(
        r#"    (function() {{
        var mime = {{ type: "application/x-shockwave-flash", suffixes: "swf",
                     description: "{description}" }};
        var plugin = {{ name: "Shockwave Flash", description: "{description}",
                       filename: "{filename}", length: 1, 0: mime }};
        mime.enabledPlugin = plugin;
        var mimeTypes = __overlay(navigator.mimeTypes,
            {{ "application/x-shockwave-flash": mime, 0: mime, length: 1 }}, "MimeTypeArray");
        var plugins = __overlay(navigator.plugins,
            {{ "Shockwave Flash": plugin, 0: plugin, length: 1 }}, "PluginArray");
        window.navigator = __overlay(navigator, {{ mimeTypes: mimeTypes, plugins: plugins }}, null);
        var getVariable = __maskNative(function(name) {{
            return name === '$version' ? "{version}" : undefined;
        }}, 'GetVariable');
        ['HTMLObjectElement', 'HTMLEmbedElement'].forEach(function(host) {{
            if (window[host]) {{ window[host].prototype.GetVariable = getVariable; }}
        }});
    }})();
"#,
        description = escape_js_string(&flash.description),
        filename = escape_js_string(&flash.filename),
        version = escape_js_string(&flash.version),
    )
}

/// Snippet making `navigator.javaEnabled()` report a working plugin.
pub fn java_script() -> String {
    concat!(
        "    window.navigator = __overlay(navigator,\n",
        "        { javaEnabled: __maskNative(function() { return true; }, 'javaEnabled') }, null);\n",
    )
    .to_string()
}

/// Snippet making created media elements claim codec support.
pub fn media_script() -> String {
    concat!(
        "    (function() {\n",
        "        var createElement = document.createElement;\n",
        "        document.createElement = __maskNative(function(tag) {\n",
        "            var element = createElement.apply(document, arguments);\n",
        "            if (tag === 'video' || tag === 'audio') {\n",
        "                element.canPlayType = __maskNative(function() {\n",
        "                    return 'probably';\n",
        "                }, 'canPlayType');\n",
        "            }\n",
        "            return element;\n",
        "        }, 'createElement');\n",
        "    })();\n",
    )
    .to_string()
}

/// Snippet replacing the page `Date` with one reporting `offset_minutes`
/// west of UTC. Local getters and `getTimezoneOffset` answer under the
/// configured offset; UTC getters and `getTime` are untouched.
pub fn clock_script(offset_minutes: i32) -> String {
    format!(
        r#"    (function() {{
        var RealDate = Date;
        var OFFSET = {offset};
        function shifted(date) {{
            return new RealDate(date.getTime() +
                (date.getTimezoneOffset() - OFFSET) * 60000);
        }}
        function VirtualDate() {{
            var date = arguments.length === 0
                ? new RealDate()
                : new (Function.prototype.bind.apply(RealDate,
                    [null].concat([].slice.call(arguments))))();
            date.getTimezoneOffset = __maskNative(function() {{
                return OFFSET;
            }}, 'getTimezoneOffset');
            ['FullYear', 'Month', 'Date', 'Day', 'Hours', 'Minutes'].forEach(function(field) {{
                var utcGetter = RealDate.prototype['getUTC' + field];
                date['get' + field] = __maskNative(function() {{
                    return utcGetter.call(shifted(this));
                }}, 'get' + field);
            }});
            return date;
        }}
        VirtualDate.now = __maskNative(function() {{ return RealDate.now(); }}, 'now');
        VirtualDate.parse = RealDate.parse;
        VirtualDate.UTC = RealDate.UTC;
        VirtualDate.prototype = RealDate.prototype;
        window.Date = __maskNative(VirtualDate, 'Date');
    }})();
"#,
        offset = offset_minutes,
    )
}

/// Snippet removing the automation markers from `window`.
pub fn marker_removal_script(markers: &[String]) -> String {
    let mut script = String::new();
    for marker in markers {
        script.push_str(&format!(
            "    try {{ delete window[\"{}\"]; }} catch (e) {{}}\n",
            escape_js_string(marker)
        ));
    }
    script
}

/// The full initialization script for one page: every spoof the settings
/// enable, wrapped in a single IIFE with the runtime helpers.
pub fn environment_init_script(settings: &PageSettings, geometry: &ScreenGeometry) -> String {
    let mut body = String::new();

    body.push_str(&screen_script(geometry, &settings.screen_overrides));
    if !settings.navigator_overrides.is_empty() {
        body.push_str(&overlay_script(
            "window.navigator",
            &settings.navigator_overrides,
            None,
        ));
    }
    if let Some(flash) = &settings.flash_plugin {
        body.push_str(&flash_script(flash));
    }
    if settings.java_plugin_spoof {
        body.push_str(&java_script());
    }
    if settings.html5_media_spoof {
        body.push_str(&media_script());
    }
    if let Some(offset) = settings.timezone_offset_minutes {
        body.push_str(&clock_script(offset));
    }
    body.push_str(&marker_removal_script(&settings.automation_markers));

    format!("(function() {{\n'use strict';\n{}\n{}}})();\n", RUNTIME_HELPERS, body)
}
