//! When and how to show the on-page preview while the sharp image loads.

use crate::models::Size;

/// Above this blowup the preview is too degraded to be worth showing.
pub const MAX_BLOWUP: f64 = 11.0;

/// Above this blowup the preview is shown blurred.
pub const BLUR_BLOWUP: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaceholderPlan {
    pub display: Size,
    pub blurred: bool,
    pub blowup: f64,
}

/// Decide how to show a preview of `native` size for an item whose original
/// is `original`, in a box `display_width` CSS pixels wide.
///
/// Items smaller than the box are shown at their original size; larger ones
/// fill the box width with the preview's aspect ratio. Returns `None` when
/// the preview should not be shown at all.
pub fn plan_placeholder(native: Size, original: Size, display_width: u32) -> Option<PlaceholderPlan> {
    if native.width == 0 || display_width == 0 {
        return None;
    }

    let display = if original.width > 0 && original.width < display_width {
        original
    } else {
        Size::new(
            display_width,
            (display_width as f64 * native.aspect()).round() as u32,
        )
    };

    let blowup = display.width as f64 / native.width as f64;
    if blowup > MAX_BLOWUP {
        return None;
    }

    Some(PlaceholderPlan {
        display,
        blurred: blowup > BLUR_BLOWUP,
        blowup,
    })
}
