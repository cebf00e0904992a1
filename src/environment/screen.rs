//! Screen geometry generation.
//!
//! Produces a consistent set of `screen` and `window` metrics for a spoofed
//! display: resolutions drawn from a real-world popularity table, with the
//! available area reduced by an OS taskbar and the viewport reduced by
//! browser chrome and a scrollbar, so the numbers relate to each other the
//! way they would on an actual desktop.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::overlay::Value;

/// Desktop resolutions weighted by observed popularity (percent share).
pub const SCREEN_RESOLUTIONS: &[((u32, u32), u32)] = &[
    ((1024, 768), 4),
    ((1280, 800), 5),
    ((1280, 1024), 7),
    ((1360, 768), 2),
    ((1366, 768), 33),
    ((1440, 900), 7),
    ((1600, 900), 6),
    ((1680, 1050), 4),
    ((1920, 1080), 16),
    ((1920, 1200), 3),
];

const COLOR_DEPTH: u32 = 24;
const OS_TASKBAR_HEIGHTS: &[u32] = &[30, 32, 40];
const BROWSER_CHROME_HEIGHTS: &[u32] = &[90, 100, 105];
const SCROLLBAR_WIDTHS: &[u32] = &[17, 20];

const MIN_DIMENSION: u32 = 300;

/// Complete display geometry for one spoofed environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenGeometry {
    pub width: u32,
    pub height: u32,
    pub color_depth: u32,
    pub avail_width: u32,
    pub avail_height: u32,
    pub avail_left: u32,
    pub avail_top: u32,
    pub outer_width: u32,
    pub outer_height: u32,
    pub inner_width: u32,
    pub inner_height: u32,
    pub screen_x: u32,
    pub screen_y: u32,
}

impl ScreenGeometry {
    /// Geometry for a randomly drawn popular resolution.
    pub fn generate(rng: &mut impl Rng) -> Self {
        let ((width, height), _) = SCREEN_RESOLUTIONS
            .choose_weighted(rng, |entry| entry.1)
            .copied()
            .unwrap_or(((1366, 768), 0));
        Self::for_size(width, height, rng)
    }

    /// Geometry for an explicit resolution. Dimensions are clamped to a
    /// plausible minimum; taskbar and chrome deductions are still drawn.
    pub fn for_size(width: u32, height: u32, rng: &mut impl Rng) -> Self {
        let width = width.max(MIN_DIMENSION);
        let height = height.max(MIN_DIMENSION);

        let taskbar = *OS_TASKBAR_HEIGHTS.choose(rng).unwrap_or(&30);
        let chrome = *BROWSER_CHROME_HEIGHTS.choose(rng).unwrap_or(&90);
        let scrollbar = *SCROLLBAR_WIDTHS.choose(rng).unwrap_or(&17);

        let avail_height = height.saturating_sub(taskbar);
        let outer_width = width;
        let outer_height = avail_height;

        Self {
            width,
            height,
            color_depth: COLOR_DEPTH,
            avail_width: width,
            avail_height,
            avail_left: 0,
            avail_top: taskbar,
            outer_width,
            outer_height,
            inner_width: outer_width.saturating_sub(scrollbar),
            inner_height: outer_height.saturating_sub(chrome),
            screen_x: 0,
            screen_y: taskbar,
        }
    }

    /// Override map for the `screen` object overlay.
    pub fn screen_overrides(&self) -> Vec<(String, Value)> {
        vec![
            ("width".to_string(), Value::Number(self.width.into())),
            ("height".to_string(), Value::Number(self.height.into())),
            (
                "availWidth".to_string(),
                Value::Number(self.avail_width.into()),
            ),
            (
                "availHeight".to_string(),
                Value::Number(self.avail_height.into()),
            ),
            (
                "availLeft".to_string(),
                Value::Number(self.avail_left.into()),
            ),
            ("availTop".to_string(), Value::Number(self.avail_top.into())),
            (
                "colorDepth".to_string(),
                Value::Number(self.color_depth.into()),
            ),
            (
                "pixelDepth".to_string(),
                Value::Number(self.color_depth.into()),
            ),
        ]
    }

    /// Properties assigned directly onto the `window` object.
    pub fn window_props(&self) -> Vec<(String, Value)> {
        vec![
            (
                "outerWidth".to_string(),
                Value::Number(self.outer_width.into()),
            ),
            (
                "outerHeight".to_string(),
                Value::Number(self.outer_height.into()),
            ),
            (
                "innerWidth".to_string(),
                Value::Number(self.inner_width.into()),
            ),
            (
                "innerHeight".to_string(),
                Value::Number(self.inner_height.into()),
            ),
            ("screenX".to_string(), Value::Number(self.screen_x.into())),
            ("screenY".to_string(), Value::Number(self.screen_y.into())),
        ]
    }
}
