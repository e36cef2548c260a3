use std::sync::Arc;

use image::DynamicImage;

use super::item::Size;

/// A resolved rendition of an item for one requested width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailDescriptor {
    pub url: String,
    pub size: Size,
}

/// Decoded pixels of a rendition URL.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub url: String,
    pub image: Arc<DynamicImage>,
}

impl DecodedImage {
    pub fn new(url: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            url: url.into(),
            image: Arc::new(image),
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

/// A descriptor together with its decoded image.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub descriptor: Arc<ThumbnailDescriptor>,
    pub image: Arc<DecodedImage>,
}

/// Display width in CSS pixels and the rendition width to request for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailWidth {
    pub css: u32,
    pub real: u32,
}
