//! Collaborators the session drives but does not implement.
//!
//! Rendering, geometry and the location bar live on the host side. The
//! controller only issues calls through these traits.

use crate::error::FetchError;
use crate::models::{DecodedImage, ItemRecord, MetadataBundle, Placeholder, Size};

/// Which half of an item load failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Metadata,
    Thumbnail,
}

/// The overlay panel.
pub trait Presenter: Send {
    /// The viewer chrome becomes visible.
    fn open(&mut self);

    fn close(&mut self);

    /// Show the on-page preview scaled to `display`, blurred or not.
    fn show_placeholder(&mut self, placeholder: &Placeholder, display: Size, blurred: bool);

    /// Show the full rendition at `display`.
    fn show_sharp(&mut self, image: &DecodedImage, display: Size);

    /// Animate from the blurred placeholder to the sharp image.
    fn unblur(&mut self);

    /// Advisory load progress in `0..=1`.
    fn set_progress(&mut self, fraction: f32);

    fn update_controls(&mut self, has_next: bool, has_prev: bool);

    fn show_metadata(&mut self, item: &ItemRecord, bundle: &MetadataBundle);

    /// Terminal error state for the current item.
    fn show_error(&mut self, item: &ItemRecord, stage: LoadStage, error: &FetchError);

    /// One-time intro animation of the metadata panel.
    fn reveal_metadata(&mut self);

    /// The page has been scrolled away from the top (or back to it).
    fn set_scrolled(&mut self, scrolled: bool);

    fn enter_fullscreen(&mut self);

    fn exit_fullscreen(&mut self);

    /// Box available for `item` in CSS pixels.
    fn display_box(&self, item: &ItemRecord, fullscreen: bool) -> Size;

    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }
}

/// The browser location fragment.
///
/// Hosts forward fragment change notifications to
/// `NavigationBridge::on_fragment_change`.
pub trait Location: Send {
    fn fragment(&self) -> String;

    fn set_fragment(&mut self, fragment: &str);
}
