//! The spoofed page environment.
//!
//! [`PageEnvironment`] owns everything one page needs to present a
//! convincing fingerprint: the modeled page object graph, the navigation
//! correlator, outgoing-request observers, and the optional virtual clock.
//! The host drives it through lifecycle callbacks; `on_environment_init`
//! applies every configured spoof in one pass, before any page script can
//! observe the pristine state.

pub mod plugins;
pub mod registry;
pub mod screen;

pub use plugins::{
    flash_get_variable, spoof_flash, spoof_html5_media, spoof_java, FlashPlugin, FLASH_MIME_TYPE,
    FLASH_PLUGIN_NAME,
};
pub use registry::{CallbackHandle, CallbackRegistry};
pub use screen::{ScreenGeometry, SCREEN_RESOLUTIONS};

use std::rc::Rc;

use tracing::debug;
use uuid::Uuid;

use crate::clock::VirtualClock;
use crate::config::{ConfigError, PageSettings};
use crate::correlator::{
    HttpExchange, LoadOutcome, NavigationCorrelator, RequestMeta, ResponseMeta,
};
use crate::masker::mask;
use crate::overlay::{
    get_property, overlay, NativeFunction, ObjectRef, PropertyHost, Value, VirtualObject,
};

/// Observer invoked for every outgoing request the host reports.
pub type RequestObserver = Rc<dyn Fn(&RequestMeta)>;

/// The page object graph the spoofs operate on.
pub struct PageObjects {
    pub window: ObjectRef,
    pub screen: ObjectRef,
    pub document: ObjectRef,
}

impl PageObjects {
    /// A pristine graph the way a fresh headless page exposes it: default
    /// navigator and screen metrics, empty plugin containers, and the
    /// automation markers still present.
    pub fn blank() -> Self {
        let navigator_proto = VirtualObject::new("Navigator");
        let navigator = VirtualObject::with_prototype("Navigator", Some(navigator_proto));
        {
            let mut nav = navigator.borrow_mut();
            nav.set(
                "userAgent",
                Value::str(
                    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/538.1 (KHTML, like Gecko) Safari/538.1",
                ),
            );
            nav.set("appName", Value::str("Netscape"));
            nav.set("appCodeName", Value::str("Mozilla"));
            nav.set("platform", Value::str("Linux x86_64"));
            nav.set("language", Value::str("en-US"));
            nav.set("cookieEnabled", Value::Bool(true));
            nav.set("onLine", Value::Bool(true));
            nav.set(
                "plugins",
                Value::Object(empty_container("PluginArray")),
            );
            nav.set(
                "mimeTypes",
                Value::Object(empty_container("MimeTypeArray")),
            );
            // A headless engine honestly reports no Java.
            nav.set(
                "javaEnabled",
                Value::Function(mask(
                    NativeFunction::new("javaEnabled", |_| Value::Bool(false)),
                    None,
                )),
            );
        }

        let screen = VirtualObject::new("Screen");
        {
            let mut scr = screen.borrow_mut();
            scr.set("width", Value::Number(1024.0));
            scr.set("height", Value::Number(768.0));
            scr.set("availWidth", Value::Number(1024.0));
            scr.set("availHeight", Value::Number(768.0));
            scr.set("availLeft", Value::Number(0.0));
            scr.set("availTop", Value::Number(0.0));
            scr.set("colorDepth", Value::Number(24.0));
            scr.set("pixelDepth", Value::Number(24.0));
        }

        let document = VirtualObject::new("HTMLDocument");
        document.borrow_mut().set(
            "createElement",
            Value::Function(mask(
                NativeFunction::new("createElement", |args| {
                    let tag = args.first().and_then(Value::as_str).unwrap_or("");
                    Value::Object(VirtualObject::new(element_type_name(tag)))
                }),
                None,
            )),
        );

        let window = VirtualObject::new("Window");
        {
            let mut win = window.borrow_mut();
            win.set("navigator", Value::Object(navigator));
            win.set("screen", Value::Object(Rc::clone(&screen)));
            win.set("document", Value::Object(Rc::clone(&document)));
            // Markers automation hosts leave behind; removed at init.
            win.set("_phantom", Value::Bool(true));
            win.set(
                "callPhantom",
                Value::Function(NativeFunction::new("callPhantom", |_| Value::Undefined)),
            );
        }

        Self {
            window,
            screen,
            document,
        }
    }
}

fn empty_container(type_name: &str) -> ObjectRef {
    let container = VirtualObject::new(type_name);
    container.borrow_mut().set("length", Value::Number(0.0));
    container
}

fn element_type_name(tag: &str) -> &'static str {
    match tag {
        "video" => "HTMLVideoElement",
        "audio" => "HTMLAudioElement",
        "object" => "HTMLObjectElement",
        "embed" => "HTMLEmbedElement",
        "canvas" => "HTMLCanvasElement",
        "div" => "HTMLDivElement",
        _ => "HTMLElement",
    }
}

/// One page's spoofed environment and its lifecycle state.
pub struct PageEnvironment {
    id: Uuid,
    settings: PageSettings,
    page: PageObjects,
    correlator: NavigationCorrelator,
    request_observers: CallbackRegistry<RequestObserver>,
    clock: Option<VirtualClock>,
    geometry: Option<ScreenGeometry>,
    initialized: bool,
}

impl PageEnvironment {
    /// Environment over a pristine page graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings fail validation.
    pub fn new(settings: PageSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            settings,
            page: PageObjects::blank(),
            correlator: NavigationCorrelator::new(),
            request_observers: CallbackRegistry::new(),
            clock: None,
            geometry: None,
            initialized: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &PageSettings {
        &self.settings
    }

    pub fn page(&self) -> &PageObjects {
        &self.page
    }

    /// The clock installed for this environment, if timezone spoofing is
    /// configured and initialization has run.
    pub fn clock(&self) -> Option<&VirtualClock> {
        self.clock.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Apply every configured spoof to the page graph.
    ///
    /// Repeated calls rebuild the overlays from a pristine graph and replace
    /// the previous install, so re-entrant host callbacks can never stack
    /// overlays. The screen geometry is drawn once and reused, keeping the
    /// presented fingerprint identical across calls.
    pub fn on_environment_init(&mut self) {
        if self.initialized {
            self.page = PageObjects::blank();
        }

        let geometry = match self.geometry.clone() {
            Some(geometry) => geometry,
            None => {
                let mut rng = rand::thread_rng();
                let geometry = match self.settings.screen_size {
                    Some((width, height)) => ScreenGeometry::for_size(width, height, &mut rng),
                    None => ScreenGeometry::generate(&mut rng),
                };
                self.geometry = Some(geometry.clone());
                geometry
            }
        };

        // Generated geometry first, explicit overrides on top.
        let mut screen_overrides = geometry.screen_overrides();
        for (key, json) in &self.settings.screen_overrides {
            screen_overrides.retain(|(k, _)| k != key);
            screen_overrides.push((key.clone(), Value::from_json(json)));
        }
        let screen = overlay(&self.page.screen, &screen_overrides, None);
        self.page.screen = Rc::clone(&screen);
        {
            let mut win = self.page.window.borrow_mut();
            win.set("screen", Value::Object(screen));
            for (key, value) in geometry.window_props() {
                win.set(&key, value);
            }
        }

        if !self.settings.navigator_overrides.is_empty() {
            if let Value::Object(navigator) = get_property(&self.page.window, "navigator") {
                let overrides: Vec<(String, Value)> = self
                    .settings
                    .navigator_overrides
                    .iter()
                    .map(|(key, json)| (key.clone(), Value::from_json(json)))
                    .collect();
                let patched = overlay(&navigator, &overrides, None);
                self.page
                    .window
                    .borrow_mut()
                    .set("navigator", Value::Object(patched));
            }
        }

        if let Some(flash) = self.settings.flash_plugin.clone() {
            spoof_flash(&self.page.window, &flash);
        }
        if self.settings.java_plugin_spoof {
            spoof_java(&self.page.window);
        }
        if self.settings.html5_media_spoof {
            spoof_html5_media(&self.page.document);
        }

        if let Some(offset) = self.settings.timezone_offset_minutes {
            let clock = VirtualClock::new(offset);
            clock.install();
            self.clock = Some(clock);
        }

        {
            let mut win = self.page.window.borrow_mut();
            for marker in &self.settings.automation_markers {
                win.delete_property(marker);
            }
        }

        self.initialized = true;
        debug!(id = %self.id, "page environment initialized");
    }

    /// The current `window.navigator`, after any overlays.
    pub fn navigator(&self) -> Option<ObjectRef> {
        get_property(&self.page.window, "navigator")
            .as_object()
            .cloned()
    }

    /// Register an observer for outgoing requests. Observers run before the
    /// correlator sees the request.
    pub fn add_request_observer(&mut self, observer: RequestObserver) -> CallbackHandle {
        self.request_observers.add(observer)
    }

    pub fn remove_request_observer(&mut self, handle: CallbackHandle) -> bool {
        self.request_observers.remove(handle)
    }

    // Host lifecycle callbacks. Each forwards to the correlator; outgoing
    // requests additionally fan out to the registered observers.

    pub fn on_navigation_requested(&mut self, url: &str, is_blank_placeholder: bool) {
        self.correlator.on_navigation_requested(url, is_blank_placeholder);
    }

    pub fn on_outgoing_request(&mut self, request: &RequestMeta) {
        for observer in self.request_observers.snapshot() {
            observer(request);
        }
        self.correlator.on_outgoing_request(request);
    }

    pub fn on_response_received(&mut self, response: &ResponseMeta) {
        self.correlator.on_response_received(response);
    }

    pub fn on_load_finished(&mut self, outcome: LoadOutcome) {
        self.correlator.on_load_finished(outcome);
    }

    /// Snapshot of the tracked top-level exchange.
    pub fn http_exchange(&self) -> HttpExchange {
        self.correlator.exchange().clone()
    }

    pub fn correlator(&self) -> &NavigationCorrelator {
        &self.correlator
    }
}
