use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchResult;
use crate::models::{ItemInfo, MetadataBundle, Thumbnail, ThumbnailWidth};

/// Result of a background load, tagged with the generation it was started under.
#[derive(Debug)]
pub(crate) enum LoadEvent {
    ItemInfo {
        generation: u64,
        result: FetchResult<Arc<ItemInfo>>,
    },
    Metadata {
        generation: u64,
        result: FetchResult<MetadataBundle>,
    },
    Thumbnail {
        generation: u64,
        width: ThumbnailWidth,
        result: FetchResult<Thumbnail>,
        elapsed: Duration,
    },
    Progress {
        generation: u64,
        fraction: f32,
    },
}

impl LoadEvent {
    pub(crate) fn generation(&self) -> u64 {
        match self {
            LoadEvent::ItemInfo { generation, .. }
            | LoadEvent::Metadata { generation, .. }
            | LoadEvent::Thumbnail { generation, .. }
            | LoadEvent::Progress { generation, .. } => *generation,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            LoadEvent::ItemInfo { .. } => "item-info",
            LoadEvent::Metadata { .. } => "metadata",
            LoadEvent::Thumbnail { .. } => "thumbnail",
            LoadEvent::Progress { .. } => "progress",
        }
    }
}
