//! Configuration module for envmask.
//!
//! This module provides configuration management for spoofed page
//! environments, including:
//! - Loading settings from files (TOML/JSON)
//! - Environment variable overrides
//! - Validation and defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use envmask::config::PageSettings;
//!
//! // Create with defaults
//! let settings = PageSettings::default();
//!
//! // Load from a specific file
//! let settings = PageSettings::from_file("page.toml").unwrap();
//!
//! // Override with environment variables
//! let settings = settings.merge_with_env();
//! ```

mod settings;

pub use settings::{ConfigError, PageSettings};
