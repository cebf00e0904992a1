//! Page environment settings and configuration management.
//!
//! This module provides the configurable surface of a spoofed page
//! environment, supporting multiple configuration sources with proper
//! precedence.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::environment::FlashPlugin;

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),

    /// Failed to serialize TOML configuration.
    #[error("Failed to serialize TOML configuration: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// Failed to parse JSON configuration.
    #[error("Failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Unsupported file format.
    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

/// Per-page environment settings.
///
/// Settings can be loaded from files or environment variables, or built up
/// with the `with_*` methods.
///
/// # Configuration Precedence
///
/// Settings are applied in the following order (later sources override earlier):
/// 1. Default values
/// 2. Configuration file (TOML or JSON)
/// 3. Environment variables
///
/// # Example
///
/// ```rust
/// use envmask::config::PageSettings;
///
/// let settings = PageSettings::default()
///     .with_screen_size(1920, 1080)
///     .with_timezone_offset(-120);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSettings {
    /// Timeout for page resources in milliseconds.
    #[serde(default = "default_resource_timeout_ms")]
    pub resource_timeout_ms: u64,

    /// Whether page scripting is enabled.
    #[serde(default = "default_true")]
    pub scripting_enabled: bool,

    /// Whether image loading is enabled.
    #[serde(default = "default_true")]
    pub images_enabled: bool,

    /// Static values replacing `navigator` properties.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub navigator_overrides: HashMap<String, serde_json::Value>,

    /// Static values replacing `screen` properties. When set, these win over
    /// the generated geometry.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub screen_overrides: HashMap<String, serde_json::Value>,

    /// Explicit screen resolution. When absent, a resolution is drawn from
    /// the popularity table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_size: Option<(u32, u32)>,

    /// Timezone offset in minutes west of UTC. When set, the virtual clock
    /// is installed with this offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone_offset_minutes: Option<i32>,

    /// Flash plugin identity to advertise. When absent, no Flash spoof is
    /// applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash_plugin: Option<FlashPlugin>,

    /// Advertise a working Java plugin.
    #[serde(default = "default_true")]
    pub java_plugin_spoof: bool,

    /// Make media elements claim codec support.
    #[serde(default = "default_true")]
    pub html5_media_spoof: bool,

    /// Window properties removed during initialization so automation is not
    /// directly detectable.
    #[serde(default = "default_automation_markers")]
    pub automation_markers: Vec<String>,
}

// Default value functions for serde
fn default_resource_timeout_ms() -> u64 {
    60000
}

fn default_true() -> bool {
    true
}

fn default_automation_markers() -> Vec<String> {
    vec!["_phantom".to_string(), "callPhantom".to_string()]
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            resource_timeout_ms: default_resource_timeout_ms(),
            scripting_enabled: true,
            images_enabled: true,
            navigator_overrides: HashMap::new(),
            screen_overrides: HashMap::new(),
            screen_size: None,
            timezone_offset_minutes: None,
            flash_plugin: None,
            java_plugin_spoof: true,
            html5_media_spoof: true,
            automation_markers: default_automation_markers(),
        }
    }
}

impl PageSettings {
    /// Creates a new PageSettings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a configuration file.
    ///
    /// Supports both TOML and JSON formats, detected by file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "toml" => Self::from_toml_str(&content),
            "json" => Self::from_json_str(&content),
            ext => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    /// Parses settings from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parses settings from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Saves settings to a configuration file.
    ///
    /// The format is determined by the file extension.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let content = match extension.as_str() {
            "toml" => toml::to_string_pretty(self)?,
            "json" => serde_json::to_string_pretty(self)?,
            ext => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
        };

        fs::write(path, content)?;
        Ok(())
    }

    /// Merges current settings with environment variable overrides.
    ///
    /// Environment variables are prefixed with `ENVMASK_` and use uppercase
    /// names with underscores. For example:
    /// - `ENVMASK_RESOURCE_TIMEOUT_MS`
    /// - `ENVMASK_TIMEZONE_OFFSET_MINUTES`
    /// - `ENVMASK_SCREEN_SIZE` (as `WIDTHxHEIGHT`)
    pub fn merge_with_env(mut self) -> Self {
        if let Ok(val) = env::var("ENVMASK_RESOURCE_TIMEOUT_MS") {
            if let Ok(timeout) = val.parse() {
                self.resource_timeout_ms = timeout;
            }
        }

        if let Ok(val) = env::var("ENVMASK_SCRIPTING_ENABLED") {
            self.scripting_enabled = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = env::var("ENVMASK_IMAGES_ENABLED") {
            self.images_enabled = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = env::var("ENVMASK_TIMEZONE_OFFSET_MINUTES") {
            if let Ok(offset) = val.parse() {
                self.timezone_offset_minutes = Some(offset);
            }
        }

        if let Ok(val) = env::var("ENVMASK_SCREEN_SIZE") {
            if let Some((width, height)) = val.split_once('x') {
                if let (Ok(width), Ok(height)) = (width.parse(), height.parse()) {
                    self.screen_size = Some((width, height));
                }
            }
        }

        if let Ok(val) = env::var("ENVMASK_JAVA_PLUGIN_SPOOF") {
            self.java_plugin_spoof = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = env::var("ENVMASK_HTML5_MEDIA_SPOOF") {
            self.html5_media_spoof = val.to_lowercase() == "true" || val == "1";
        }

        self
    }

    /// Validates all settings.
    ///
    /// # Errors
    ///
    /// Returns an error if any setting is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resource_timeout_ms < 1000 {
            return Err(ConfigError::ValidationError(
                "Resource timeout must be at least 1000ms".to_string(),
            ));
        }
        if self.resource_timeout_ms > 600000 {
            return Err(ConfigError::ValidationError(
                "Resource timeout cannot exceed 600000ms (10 minutes)".to_string(),
            ));
        }

        // Real zones span UTC+14 to UTC-12 (offset is minutes west).
        if let Some(offset) = self.timezone_offset_minutes {
            if !(-840..=720).contains(&offset) {
                return Err(ConfigError::ValidationError(format!(
                    "Timezone offset {} is outside the valid range -840..=720 minutes",
                    offset
                )));
            }
        }

        if let Some((width, height)) = self.screen_size {
            if width < 300 || height < 300 {
                return Err(ConfigError::ValidationError(
                    "Screen dimensions must be at least 300 pixels".to_string(),
                ));
            }
            if width > 7680 || height > 4320 {
                return Err(ConfigError::ValidationError(
                    "Screen dimensions cannot exceed 7680x4320 (8K)".to_string(),
                ));
            }
        }

        for marker in &self.automation_markers {
            if marker.is_empty() {
                return Err(ConfigError::ValidationError(
                    "Automation marker names cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    // Builder-style methods for convenient configuration

    /// Sets the resource timeout in milliseconds.
    pub fn with_resource_timeout(mut self, timeout_ms: u64) -> Self {
        self.resource_timeout_ms = timeout_ms;
        self
    }

    /// Overrides a single `navigator` property.
    pub fn with_navigator_override(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.navigator_overrides.insert(key.into(), value);
        self
    }

    /// Overrides a single `screen` property.
    pub fn with_screen_override(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.screen_overrides.insert(key.into(), value);
        self
    }

    /// Sets an explicit screen resolution.
    pub fn with_screen_size(mut self, width: u32, height: u32) -> Self {
        self.screen_size = Some((width, height));
        self
    }

    /// Sets the timezone offset in minutes west of UTC.
    pub fn with_timezone_offset(mut self, minutes: i32) -> Self {
        self.timezone_offset_minutes = Some(minutes);
        self
    }

    /// Sets the Flash plugin identity to advertise.
    pub fn with_flash_plugin(mut self, plugin: FlashPlugin) -> Self {
        self.flash_plugin = Some(plugin);
        self
    }

    /// Enables or disables the Java plugin spoof.
    pub fn with_java_plugin_spoof(mut self, enabled: bool) -> Self {
        self.java_plugin_spoof = enabled;
        self
    }

    /// Enables or disables the HTML5 media spoof.
    pub fn with_html5_media_spoof(mut self, enabled: bool) -> Self {
        self.html5_media_spoof = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = PageSettings::default();
        assert_eq!(settings.resource_timeout_ms, 60000);
        assert!(settings.scripting_enabled);
        assert!(settings.images_enabled);
        assert!(settings.navigator_overrides.is_empty());
        assert!(settings.screen_size.is_none());
        assert!(settings.timezone_offset_minutes.is_none());
        assert!(settings.flash_plugin.is_none());
        assert_eq!(settings.automation_markers, vec!["_phantom", "callPhantom"]);
    }

    #[test]
    fn test_builder_methods() {
        let settings = PageSettings::default()
            .with_resource_timeout(30000)
            .with_navigator_override("platform", serde_json::json!("Win32"))
            .with_screen_size(1920, 1080)
            .with_timezone_offset(-120)
            .with_flash_plugin(FlashPlugin::windows())
            .with_java_plugin_spoof(false);

        assert_eq!(settings.resource_timeout_ms, 30000);
        assert_eq!(
            settings.navigator_overrides.get("platform"),
            Some(&serde_json::json!("Win32"))
        );
        assert_eq!(settings.screen_size, Some((1920, 1080)));
        assert_eq!(settings.timezone_offset_minutes, Some(-120));
        assert!(!settings.java_plugin_spoof);
        assert!(settings.html5_media_spoof);
    }

    #[test]
    fn test_validation_valid_settings() {
        let settings = PageSettings::default();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_short_timeout() {
        let settings = PageSettings::default().with_resource_timeout(100);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_impossible_timezone() {
        let settings = PageSettings::default().with_timezone_offset(2000);
        assert!(settings.validate().is_err());
        let settings = PageSettings::default().with_timezone_offset(-840);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_tiny_screen() {
        let settings = PageSettings::default().with_screen_size(100, 100);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let settings = PageSettings::default()
            .with_screen_size(1366, 768)
            .with_timezone_offset(300);
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed = PageSettings::from_toml_str(&toml_str).unwrap();

        assert_eq!(parsed.screen_size, Some((1366, 768)));
        assert_eq!(parsed.timezone_offset_minutes, Some(300));
        assert_eq!(parsed.resource_timeout_ms, settings.resource_timeout_ms);
    }

    #[test]
    fn test_json_parsing_with_overrides() {
        let parsed = PageSettings::from_json_str(
            r#"{
                "navigator_overrides": {
                    "userAgent": "Mozilla/5.0 (Windows NT 10.0; Win64; x64)",
                    "platform": "Win32"
                },
                "flash_plugin": {
                    "version": "WIN 20,0,0,185",
                    "description": "Shockwave Flash 20.0 r0",
                    "filename": "NPSWF32.dll"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(parsed.navigator_overrides.len(), 2);
        assert_eq!(parsed.flash_plugin, Some(FlashPlugin::windows()));
        // Unset fields keep their defaults.
        assert_eq!(parsed.resource_timeout_ms, 60000);
        assert!(parsed.java_plugin_spoof);
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.toml");
        let settings = PageSettings::default().with_timezone_offset(-60);
        settings.to_file(&path).unwrap();

        let loaded = PageSettings::from_file(&path).unwrap();
        assert_eq!(loaded.timezone_offset_minutes, Some(-60));

        let bad = dir.path().join("page.yaml");
        fs::write(&bad, "resource_timeout_ms: 1000").unwrap();
        assert!(matches!(
            PageSettings::from_file(&bad),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
