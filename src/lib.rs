//! # envmask
//!
//! A detection-resistant environment masking library for browser automation
//! hosts, written in Rust.
//!
//! envmask models the page-facing surface an automated browser exposes and
//! rewrites it so fingerprinting probes cannot tell the environment from a
//! real desktop browser: object overlays that preserve identity semantics,
//! native-function masking, a virtual clock with timezone control, and
//! request/response correlation for top-level navigations.
//!
//! ## Features
//!
//! - **Object Overlay Engine**: referentially fresh replacements that copy
//!   every non-overridden descriptor verbatim, getters included
//! - **Native Function Masking**: injected callables stringify as native
//!   code, transitively through their own `toString`
//! - **Virtual Clock**: frozen or free-running time with a configurable
//!   timezone offset and the full legacy date API
//! - **Navigation Correlation**: pairs the primary request with its first
//!   response and survives load failures
//! - **Script Emission**: the same spoofs rendered as injectable JavaScript
//! - **Flexible Configuration**: TOML/JSON files and environment variables
//!
//! ## Quick Start
//!
//! ```rust
//! use envmask::{config::PageSettings, environment::PageEnvironment};
//!
//! let settings = PageSettings::default()
//!     .with_screen_size(1920, 1080)
//!     .with_navigator_override("platform", serde_json::json!("Win32"));
//!
//! let mut env = PageEnvironment::new(settings).unwrap();
//! env.on_environment_init();
//! ```
//!
//! ## Module Overview
//!
//! - [`overlay`]: the object model and identity-preserving overlay engine
//! - [`masker`]: native-function stringification masking
//! - [`clock`]: the virtual clock and its date instances
//! - [`correlator`]: top-level navigation request/response pairing
//! - [`environment`]: per-page environment tying the spoofs together
//! - [`inject`]: JavaScript emission for real-page embedders
//! - [`config`]: configuration loading and management
//!
//! ## Configuration
//!
//! Configuration follows a precedence chain:
//! 1. Default values
//! 2. Configuration file (TOML/JSON)
//! 3. Environment variables (`ENVMASK_*`)
//!
//! See [`config::PageSettings`] for all available options.

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Full version string with name
pub const FULL_VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Module Exports
// ============================================================================

/// Virtual clock with timezone offset control and date instances.
pub mod clock;

/// Configuration management for loading settings from files and env.
pub mod config;

/// Request/response correlation for top-level navigations.
pub mod correlator;

/// Per-page spoofed environment: page graph, spoofs, lifecycle.
pub mod environment;

/// JavaScript emission for hosts driving a real page.
pub mod inject;

/// Native-function identity masking.
pub mod masker;

/// Object model and the identity-preserving overlay engine.
pub mod overlay;

// ============================================================================
// Re-exports for Convenience
// ============================================================================

// Overlay types
pub use overlay::{
    get_property, overlay, FunctionRef, NativeFunction, ObjectRef, OverlayDescriptor,
    PropertyDescriptor, PropertyHost, Value, VirtualObject,
};

// Masker types
pub use masker::{label, mask, Stringifier};

// Clock types
pub use clock::{VirtualClock, VirtualDate};

// Correlator types
pub use correlator::{
    HttpExchange, LoadOutcome, NavigationCorrelator, RequestMeta, ResponseCapture, ResponseMeta,
    ResponseSlot, ResponseStage,
};

// Environment types
pub use environment::{
    CallbackHandle, CallbackRegistry, FlashPlugin, PageEnvironment, PageObjects, ScreenGeometry,
};

// Config types
pub use config::{ConfigError, PageSettings};

// ============================================================================
// Prelude Module
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```rust
/// use envmask::prelude::*;
/// ```
pub mod prelude {
    pub use crate::clock::{VirtualClock, VirtualDate};
    pub use crate::config::PageSettings;
    pub use crate::correlator::{LoadOutcome, NavigationCorrelator, RequestMeta, ResponseMeta};
    pub use crate::environment::{FlashPlugin, PageEnvironment, ScreenGeometry};
    pub use crate::overlay::{get_property, overlay, Value, VirtualObject};
    pub use crate::{FULL_VERSION, NAME, VERSION};
}
