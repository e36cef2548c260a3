//! Rendition width selection.

use crate::config::ViewerConfig;
use crate::models::{Size, ThumbnailWidth};

/// Maps a display box to the rendition width to request.
///
/// Requests snap up to the next breakpoint so that nearby window sizes share
/// cached renditions.
#[derive(Debug, Clone)]
pub struct ThumbnailWidthCalculator {
    breakpoints: Vec<u32>,
}

impl ThumbnailWidthCalculator {
    pub fn new(mut breakpoints: Vec<u32>) -> Self {
        breakpoints.retain(|w| *w > 0);
        breakpoints.sort_unstable();
        breakpoints.dedup();
        Self { breakpoints }
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(config.width_breakpoints.clone())
    }

    /// Width for a box `css_width` CSS pixels wide at `ratio` device pixels per CSS pixel.
    pub fn calculate(&self, css_width: u32, ratio: f64) -> ThumbnailWidth {
        let ratio = if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 };
        let needed = (css_width as f64 * ratio).ceil() as u32;
        let real = self
            .breakpoints
            .iter()
            .copied()
            .find(|w| *w >= needed)
            .unwrap_or(needed);

        ThumbnailWidth {
            css: css_width,
            real,
        }
    }

    /// Width for an image shaped like `sample` fitted into `bounds`.
    ///
    /// Images relatively taller than the box are limited by its height.
    pub fn calculate_for_box(&self, bounds: Size, sample: Size, ratio: f64) -> ThumbnailWidth {
        let css_width = if sample.width > 0 && sample.aspect() > bounds.aspect() {
            (bounds.height as f64 / sample.aspect()).floor() as u32
        } else {
            bounds.width
        };
        self.calculate(css_width, ratio)
    }
}

impl Default for ThumbnailWidthCalculator {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}
