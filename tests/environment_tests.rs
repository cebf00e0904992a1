//! Integration tests for the page environment
//!
//! Full-stack scenarios: a configured environment initialized in one pass,
//! the spoofed surface it presents afterwards, and the script emission for
//! real-page embedders.

use std::rc::Rc;

use envmask::clock::VirtualClock;
use envmask::config::PageSettings;
use envmask::environment::{FlashPlugin, PageEnvironment, FLASH_PLUGIN_NAME};
use envmask::inject;
use envmask::overlay::{get_property, Value};

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[test]
fn configured_environment_presents_a_coherent_fingerprint() {
    init_tracing();
    let settings = PageSettings::default()
        .with_screen_size(1920, 1080)
        .with_navigator_override("userAgent", serde_json::json!("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"))
        .with_navigator_override("platform", serde_json::json!("Win32"))
        .with_flash_plugin(FlashPlugin::windows());

    let mut env = PageEnvironment::new(settings).unwrap();
    env.on_environment_init();

    let navigator = env.navigator().expect("navigator");
    assert_eq!(
        get_property(&navigator, "platform"),
        Value::str("Win32")
    );
    assert_eq!(
        get_property(&navigator, "userAgent"),
        Value::str("Mozilla/5.0 (Windows NT 10.0; Win64; x64)")
    );
    // Defaults the overrides never named still read through.
    assert_eq!(get_property(&navigator, "appName"), Value::str("Netscape"));

    // The advertised Flash plugin is reachable both ways.
    let plugins = get_property(&navigator, "plugins");
    let plugins = plugins.as_object().expect("plugins");
    assert_eq!(plugins.borrow().to_display_string(), "[object PluginArray]");
    let plugin = get_property(plugins, FLASH_PLUGIN_NAME);
    let plugin = plugin.as_object().expect("plugin");
    assert_eq!(
        get_property(plugin, "filename"),
        Value::str("NPSWF32.dll")
    );

    // Screen metrics agree with the requested resolution.
    let screen = &env.page().screen;
    assert_eq!(get_property(screen, "width"), Value::Number(1920.0));
    assert_eq!(get_property(screen, "height"), Value::Number(1080.0));
    let avail = get_property(screen, "availHeight").as_number().unwrap();
    assert!(avail < 1080.0);

    // Automation markers are gone.
    assert_eq!(
        get_property(&env.page().window, "_phantom"),
        Value::Undefined
    );
    assert_eq!(
        get_property(&env.page().window, "callPhantom"),
        Value::Undefined
    );
}

#[test]
fn flash_version_probe_reaches_created_elements() {
    let settings = PageSettings::default().with_flash_plugin(FlashPlugin::windows());
    let mut env = PageEnvironment::new(settings).unwrap();
    env.on_environment_init();

    let create = get_property(&env.page().document, "createElement");
    let create = create.as_function().expect("createElement");
    let element = create.call(&[Value::str("object")]);
    let element = element.as_object().expect("object element");
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

#[test]
fn timezone_setting_installs_the_virtual_clock() {
    // The only test in this binary using the process-global clock slot.
    init_tracing();
    let settings = PageSettings::default().with_timezone_offset(-540); // UTC+9
    let mut env = PageEnvironment::new(settings).unwrap();
    assert!(env.clock().is_none());

    env.on_environment_init();

    let clock = env.clock().expect("installed clock");
    assert!(clock.is_installed());
    assert_eq!(clock.timezone_offset_minutes(), -540);
    let global = VirtualClock::installed().expect("global slot");
    assert_eq!(global.timezone_offset_minutes(), -540);
    assert_eq!(global.date_from_millis(0).get_hours(), 9);

    VirtualClock::uninstall();
}

#[test]
fn lifecycle_events_flow_through_to_the_exchange() {
    use envmask::correlator::{LoadOutcome, RequestMeta, ResponseMeta, ResponseStage};

    let mut env = PageEnvironment::new(PageSettings::default()).unwrap();
    env.on_environment_init();

    env.on_navigation_requested("https://news.test/", false);
    env.on_outgoing_request(&RequestMeta::get("https://news.test/"));
    env.on_response_received(&ResponseMeta::new(
        "https://news.test/",
        ResponseStage::Start,
        200,
    ));
    env.on_load_finished(LoadOutcome::Success);

    let exchange = env.http_exchange();
    assert_eq!(exchange.request.unwrap().url, "https://news.test/");
    assert_eq!(exchange.response.as_received().unwrap().status_code, 200);
}

#[test]
fn request_observer_sees_traffic_until_removed() {
    use envmask::correlator::RequestMeta;
    use std::cell::RefCell;

    let mut env = PageEnvironment::new(PageSettings::default()).unwrap();
    let count = Rc::new(RefCell::new(0));
    let seen = Rc::clone(&count);
    let handle = env.add_request_observer(Rc::new(move |_request: &RequestMeta| {
        *seen.borrow_mut() += 1;
    }));

    env.on_outgoing_request(&RequestMeta::get("https://a.test/one"));
    env.on_outgoing_request(&RequestMeta::get("https://a.test/two"));
    assert_eq!(*count.borrow(), 2);

    assert!(env.remove_request_observer(handle));
    env.on_outgoing_request(&RequestMeta::get("https://a.test/three"));
    assert_eq!(*count.borrow(), 2);
}

#[test]
fn emitted_script_mirrors_the_settings() {
    let settings = PageSettings::default()
        .with_navigator_override("platform", serde_json::json!("Win32"))
        .with_flash_plugin(FlashPlugin::mac())
        .with_timezone_offset(300);

    let mut rng = rand::thread_rng();
    let geometry = envmask::environment::ScreenGeometry::for_size(1440, 900, &mut rng);
    let script = inject::environment_init_script(&settings, &geometry);

    assert!(script.starts_with("(function() {"));
    assert!(script.contains(r#""platform":"Win32""#));
    assert!(script.contains("Shockwave Flash.Plugin"));
    assert!(script.contains("var OFFSET = 300;"));
    assert!(script.contains(r#""width":1440"#));
    assert!(script.contains("delete window[\"callPhantom\"]"));
}
