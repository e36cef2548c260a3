//! Fetch providers for the viewer.
//!
//! This module provides:
//! - `ResourceCache` - One in-flight or completed fetch per key, failures included
//! - `MetadataProviders` - Item, repository, usage and uploader info, plus the bundle fetch
//! - `ThumbnailProvider` - Rendition descriptors and decoded images

pub mod cache;
pub mod item_info;
pub mod metadata;
pub mod repository;
mod response;
pub mod thumbnail;
pub mod uploader;
pub mod usage;

pub use cache::{Pending, ResourceCache};
pub use metadata::MetadataProviders;
pub use thumbnail::ThumbnailProvider;

/// A cached fetch of `V` keyed by `K`.
///
/// Each provider composes a `ResourceCache` with the request it issues.
pub trait FetchProvider<K, V> {
    /// Handle on the cached fetch for `key`, starting it if needed.
    fn get(&self, key: &K) -> Pending<V>;

    /// Drop a cached failure for `key` so the next `get` tries again.
    fn forget_failure(&self, key: &K) -> bool;
}
