//! Size-dependent loading: rendition descriptors and decoded images.
//!
//! - Descriptors are cached per `(item, requested width)`, exact widths only
//! - Images are cached per URL, so widths that resolve to the same rendition
//!   share one download
//! - Download progress is published per URL for progress indicators

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, trace};

use super::cache::{Pending, ResourceCache};
use super::response::first_page;
use super::FetchProvider;
use crate::error::{FetchError, FetchResult};
use crate::models::{DecodedImage, ItemHandle, Size, Thumbnail, ThumbnailDescriptor};
use crate::transport::{ApiRequest, FetchTransport, ProgressSender};

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    missing: Option<Value>,
    #[serde(default)]
    imagerepository: Option<String>,
    #[serde(default)]
    imageinfo: Vec<RawThumbInfo>,
}

#[derive(Debug, Deserialize)]
struct RawThumbInfo {
    thumburl: Option<String>,
    thumbwidth: Option<u32>,
    thumbheight: Option<u32>,
}

/// Key of a rendition descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenditionKey {
    pub handle: ItemHandle,
    pub width: u32,
}

pub struct ThumbnailInfoProvider {
    transport: Arc<dyn FetchTransport>,
    cache: ResourceCache<RenditionKey, ThumbnailDescriptor>,
}

impl ThumbnailInfoProvider {
    pub fn new(transport: Arc<dyn FetchTransport>) -> Self {
        Self {
            transport,
            cache: ResourceCache::new("thumbnail-info"),
        }
    }

    pub fn cache(&self) -> &ResourceCache<RenditionKey, ThumbnailDescriptor> {
        &self.cache
    }
}

impl FetchProvider<RenditionKey, ThumbnailDescriptor> for ThumbnailInfoProvider {
    fn get(&self, key: &RenditionKey) -> Pending<ThumbnailDescriptor> {
        let transport = Arc::clone(&self.transport);
        self.cache.get_or_fetch(key.clone(), move |key| async move {
            let request = ApiRequest::query()
                .param("prop", "imageinfo")
                .param("titles", key.handle.db_key())
                .param("iiprop", "url")
                .param("iiurlwidth", key.width.to_string())
                .param("format", "json");
            let doc = transport.request(request).await?;
            parse_descriptor(&key, &doc)
        })
    }

    fn forget_failure(&self, key: &RenditionKey) -> bool {
        self.cache.invalidate_failed(key)
    }
}

pub(crate) fn parse_descriptor(key: &RenditionKey, doc: &Value) -> FetchResult<ThumbnailDescriptor> {
    let page = RawPage::deserialize(first_page(doc)?)?;

    let Some(info) = page.imageinfo.first() else {
        if page.missing.is_some() && page.imagerepository.as_deref() == Some("") {
            return Err(FetchError::NotFound(key.handle.db_key()));
        }
        return Err(FetchError::unknown(format!(
            "no rendition for {} at {}px",
            key.handle.db_key(),
            key.width
        )));
    };

    match (&info.thumburl, info.thumbwidth, info.thumbheight) {
        (Some(url), Some(width), Some(height)) => Ok(ThumbnailDescriptor {
            url: url.clone(),
            size: Size::new(width, height),
        }),
        _ => Err(FetchError::malformed(format!(
            "rendition of {} lacks url or size",
            key.handle.db_key()
        ))),
    }
}

pub struct ImageProvider {
    transport: Arc<dyn FetchTransport>,
    cache: ResourceCache<String, DecodedImage>,
    progress: Mutex<HashMap<String, watch::Receiver<f32>>>,
}

impl ImageProvider {
    pub fn new(transport: Arc<dyn FetchTransport>) -> Self {
        Self {
            transport,
            cache: ResourceCache::new("image"),
            progress: Mutex::new(HashMap::new()),
        }
    }

    /// Progress of the download behind `url`, if one was started.
    pub fn progress(&self, url: &str) -> Option<watch::Receiver<f32>> {
        self.progress.lock().get(url).cloned()
    }

    pub fn cache(&self) -> &ResourceCache<String, DecodedImage> {
        &self.cache
    }
}

impl FetchProvider<String, DecodedImage> for ImageProvider {
    fn get(&self, url: &String) -> Pending<DecodedImage> {
        let transport = Arc::clone(&self.transport);
        let (sender, receiver) = ProgressSender::channel();
        let mut started = false;

        let pending = self.cache.get_or_fetch(url.clone(), |url| {
            started = true;
            async move {
                let bytes = transport.download(&url, sender.clone()).await?;
                trace!(%url, bytes = bytes.len(), "Downloaded rendition");

                let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
                    .await
                    .map_err(|err| FetchError::unknown(format!("decode task failed: {err}")))??;
                sender.report(1.0);

                debug!(%url, width = image.width(), height = image.height(), "Decoded rendition");
                Ok(DecodedImage::new(url, image))
            }
        });

        if started {
            self.progress.lock().insert(url.clone(), receiver);
        }
        pending
    }

    fn forget_failure(&self, url: &String) -> bool {
        let dropped = self.cache.invalidate_failed(url);
        if dropped {
            self.progress.lock().remove(url);
        }
        dropped
    }
}

/// Descriptor lookup chained into the image load.
pub struct ThumbnailProvider {
    pub info: ThumbnailInfoProvider,
    pub images: ImageProvider,
}

impl ThumbnailProvider {
    pub fn new(transport: Arc<dyn FetchTransport>) -> Self {
        Self {
            info: ThumbnailInfoProvider::new(Arc::clone(&transport)),
            images: ImageProvider::new(transport),
        }
    }

    pub fn descriptor(&self, handle: &ItemHandle, width: u32) -> Pending<ThumbnailDescriptor> {
        self.info.get(&RenditionKey {
            handle: handle.clone(),
            width,
        })
    }

    pub fn image(&self, url: &str) -> Pending<DecodedImage> {
        self.images.get(&url.to_string())
    }

    /// Resolve the rendition for `width`, then load its image.
    pub async fn fetch_thumbnail(&self, handle: &ItemHandle, width: u32) -> FetchResult<Thumbnail> {
        let descriptor = self.descriptor(handle, width).wait().await?;
        let image = self.image(&descriptor.url).wait().await?;
        Ok(Thumbnail { descriptor, image })
    }

    /// Drop failed descriptor entries of `handle` at any width.
    pub fn forget_failures(&self, handle: &ItemHandle) -> usize {
        self.info
            .cache()
            .invalidate_failed_where(|key| &key.handle == handle)
    }

    pub fn forget_image_failure(&self, url: &str) -> bool {
        self.images.forget_failure(&url.to_string())
    }

    /// Drop a failed image load behind the cached rendition of `handle` at `width`.
    pub fn forget_rendition_failure(&self, handle: &ItemHandle, width: u32) -> bool {
        let key = RenditionKey {
            handle: handle.clone(),
            width,
        };
        match self.info.cache().lookup(&key).and_then(|pending| pending.peek()) {
            Some(Ok(descriptor)) => self.forget_image_failure(&descriptor.url),
            _ => false,
        }
    }
}
