//! Item metadata: dimensions, license, authorship, location, categories.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use super::cache::{Pending, ResourceCache};
use super::response::{first_page, scalar_text, strip_html};
use super::FetchProvider;
use crate::error::{FetchError, FetchResult};
use crate::models::{GeoLocation, ItemHandle, ItemInfo, Size};
use crate::transport::{ApiRequest, FetchTransport};

/// Properties requested for every item.
const IIPROP: &str = "timestamp|user|url|size|mime|mediatype|extmetadata";

/// Extended metadata fields the model is built from.
const EXTMETADATA_FILTER: &str = "DateTime|DateTimeOriginal|ImageDescription|License|Credit|Artist|GPSLatitude|GPSLongitude|Categories|Permission";

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    missing: Option<Value>,
    #[serde(default)]
    imagerepository: Option<String>,
    #[serde(default)]
    imageinfo: Vec<RawImageInfo>,
}

#[derive(Debug, Deserialize)]
struct RawImageInfo {
    timestamp: Option<String>,
    user: Option<String>,
    size: Option<u64>,
    width: Option<u32>,
    height: Option<u32>,
    url: Option<String>,
    descriptionurl: Option<String>,
    mime: Option<String>,
    mediatype: Option<String>,
    #[serde(default)]
    extmetadata: HashMap<String, RawExtField>,
}

#[derive(Debug, Deserialize)]
struct RawExtField {
    #[serde(default)]
    value: Value,
}

impl RawImageInfo {
    fn ext(&self, field: &str) -> Option<String> {
        self.extmetadata.get(field).and_then(|f| scalar_text(&f.value))
    }

    fn ext_f64(&self, field: &str) -> Option<f64> {
        self.ext(field).and_then(|v| v.parse::<f64>().ok())
    }
}

pub struct ItemInfoProvider {
    transport: Arc<dyn FetchTransport>,
    language: String,
    cache: ResourceCache<ItemHandle, ItemInfo>,
}

impl ItemInfoProvider {
    pub fn new(transport: Arc<dyn FetchTransport>, language: impl Into<String>) -> Self {
        Self {
            transport,
            language: language.into(),
            cache: ResourceCache::new("item-info"),
        }
    }

    fn request_for(&self, handle: &ItemHandle) -> ApiRequest {
        ApiRequest::query()
            .param("prop", "imageinfo")
            .param("titles", handle.db_key())
            .param("iiprop", IIPROP)
            .param("iiextmetadatafilter", EXTMETADATA_FILTER)
            .param("iiextmetadatalanguage", self.language.as_str())
            .param("format", "json")
    }

    pub fn cache(&self) -> &ResourceCache<ItemHandle, ItemInfo> {
        &self.cache
    }
}

impl FetchProvider<ItemHandle, ItemInfo> for ItemInfoProvider {
    fn get(&self, handle: &ItemHandle) -> Pending<ItemInfo> {
        let transport = Arc::clone(&self.transport);
        let request = self.request_for(handle);
        self.cache.get_or_fetch(handle.clone(), move |handle| async move {
            let doc = transport.request(request).await?;
            parse_item_info(&handle, &doc)
        })
    }

    fn forget_failure(&self, handle: &ItemHandle) -> bool {
        self.cache.invalidate_failed(handle)
    }
}

/// Build an `ItemInfo` from an `imageinfo` query response.
pub(crate) fn parse_item_info(handle: &ItemHandle, doc: &Value) -> FetchResult<ItemInfo> {
    let page = RawPage::deserialize(first_page(doc)?)?;

    let Some(info) = page.imageinfo.first() else {
        if page.missing.is_some() && page.imagerepository.as_deref() == Some("") {
            return Err(FetchError::NotFound(handle.db_key()));
        }
        return Err(FetchError::unknown(format!(
            "no imageinfo for {}",
            handle.db_key()
        )));
    };

    let (Some(width), Some(height), Some(url)) = (info.width, info.height, info.url.clone())
    else {
        return Err(FetchError::malformed(format!(
            "imageinfo for {} lacks size or url",
            handle.db_key()
        )));
    };

    let location = match (info.ext_f64("GPSLatitude"), info.ext_f64("GPSLongitude")) {
        (Some(latitude), Some(longitude)) => Some(GeoLocation {
            latitude,
            longitude,
        }),
        _ => None,
    };

    let categories = info
        .ext("Categories")
        .map(|raw| {
            raw.split('|')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    trace!(item = %handle, width, height, "Parsed item info");

    Ok(ItemInfo {
        handle: handle.clone(),
        size_bytes: info.size.unwrap_or(0),
        dimensions: Size::new(width, height),
        mime_type: info.mime.clone(),
        media_type: info.mediatype.clone(),
        url,
        description_url: info.descriptionurl.clone(),
        repository: page.imagerepository.clone().unwrap_or_default(),
        last_uploader: info.user.clone().filter(|u| !u.is_empty()),
        upload_timestamp: info.timestamp.clone(),
        creation_time: info.ext("DateTimeOriginal").map(|v| strip_html(&v)),
        description: info.ext("ImageDescription"),
        source: info.ext("Credit"),
        author: info.ext("Artist"),
        license: info.ext("License"),
        permission: info.ext("Permission"),
        location,
        categories,
    })
}
