//! Size-independent metadata snapshots.
//!
//! All of these are immutable once built and shared behind `Arc` by the
//! provider caches.

use std::sync::Arc;

use super::item::{ItemHandle, Size};

/// Metadata of one item as reported by its repository.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemInfo {
    pub handle: ItemHandle,
    pub size_bytes: u64,
    pub dimensions: Size,
    pub mime_type: Option<String>,
    pub media_type: Option<String>,
    pub url: String,
    pub description_url: Option<String>,
    /// Key of the repository the item lives in (e.g. `local`, `shared`).
    pub repository: String,
    pub last_uploader: Option<String>,
    pub upload_timestamp: Option<String>,
    pub creation_time: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub permission: Option<String>,
    pub location: Option<GeoLocation>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// One file repository known to the wiki.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepositoryInfo {
    pub name: String,
    pub display_name: String,
    pub root_url: Option<String>,
    /// API endpoint for foreign repositories; `None` means the local API.
    pub api_url: Option<String>,
    pub article_path: Option<String>,
    pub server: Option<String>,
    pub is_local: bool,
}

impl RepositoryInfo {
    /// Endpoint that user lookups for this repository must go to.
    pub fn user_endpoint(&self) -> Option<&str> {
        if self.is_local {
            None
        } else {
            self.api_url.as_deref()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageScope {
    Local,
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsagePage {
    pub title: String,
    /// Wiki the page belongs to; only set for global usage.
    pub wiki: Option<String>,
    pub url: Option<String>,
}

/// Pages that embed an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageInfo {
    pub scope: UsageScope,
    pub handle: ItemHandle,
    pub pages: Vec<UsagePage>,
    /// The backend reported more results than were returned.
    pub truncated: bool,
}

impl UsageInfo {
    pub fn empty(scope: UsageScope, handle: ItemHandle) -> Self {
        Self {
            scope,
            handle,
            pages: Vec::new(),
            truncated: false,
        }
    }

    pub fn count(&self) -> usize {
        self.pages.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("male") => Self::Male,
            Some("female") => Self::Female,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploaderInfo {
    pub name: String,
    pub repository: String,
    pub gender: Gender,
}

/// Everything about an item that does not depend on the display size.
#[derive(Debug, Clone)]
pub struct MetadataBundle {
    pub item: Arc<ItemInfo>,
    /// `None` when the repository list does not mention the item's repository.
    pub repository: Option<Arc<RepositoryInfo>>,
    pub local_usage: Arc<UsageInfo>,
    pub global_usage: Arc<UsageInfo>,
    /// `None` when the item has no known uploader.
    pub uploader: Option<Arc<UploaderInfo>>,
}
