//! Aggregate of the size-independent providers.
//!
//! Dependency graph of one bundle fetch:
//!
//! ```text
//! item info ──┬──────────────┐
//! repo list ──┴─> uploader ──┤
//! local usage ───────────────┼─> bundle
//! global usage ──────────────┘
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use super::cache::Pending;
use super::item_info::ItemInfoProvider;
use super::repository::{AllRepositories, RepositoryList, RepositoryProvider};
use super::uploader::{UploaderKey, UploaderProvider};
use super::usage::UsageProvider;
use super::FetchProvider;
use crate::config::ViewerConfig;
use crate::error::{FetchError, FetchResult};
use crate::models::{ItemHandle, ItemInfo, MetadataBundle, UploaderInfo};
use crate::transport::FetchTransport;

pub struct MetadataProviders {
    pub item_info: ItemInfoProvider,
    pub repositories: RepositoryProvider,
    pub local_usage: UsageProvider,
    pub global_usage: UsageProvider,
    pub uploader: UploaderProvider,
}

impl MetadataProviders {
    pub fn new(transport: Arc<dyn FetchTransport>, config: &ViewerConfig) -> Self {
        Self {
            item_info: ItemInfoProvider::new(Arc::clone(&transport), config.language.as_str()),
            repositories: RepositoryProvider::new(Arc::clone(&transport)),
            local_usage: UsageProvider::local(Arc::clone(&transport), config.usage_limit),
            global_usage: UsageProvider::global(
                Arc::clone(&transport),
                config.usage_limit,
                config.global_usage_available,
            ),
            uploader: UploaderProvider::new(transport),
        }
    }

    /// Item info alone, shared with the bundle fetch through the cache.
    pub fn item_info(&self, handle: &ItemHandle) -> Pending<ItemInfo> {
        self.item_info.get(handle)
    }

    /// Fetch everything the metadata panel shows for `handle`.
    ///
    /// Item info, the repository list and both usage lists are requested
    /// together. The uploader lookup waits for item info and the repository
    /// list. The first failure anywhere fails the bundle straight away. An item
    /// with no known uploader leaves `uploader` empty.
    pub async fn fetch_metadata_bundle(&self, handle: &ItemHandle) -> FetchResult<MetadataBundle> {
        let item = self.item_info.get(handle);
        let repos = self.repositories.fetch();
        let local_usage = self.local_usage.get(handle);
        let global_usage = self.global_usage.get(handle);

        let uploader = {
            let item = item.clone();
            let repos = repos.clone();
            async move {
                let (item, repos) = tokio::try_join!(item.wait(), repos.wait())?;
                self.uploader_for(&item, &repos).await
            }
        };

        let (item, repos, local_usage, global_usage, uploader) = tokio::try_join!(
            item.wait(),
            repos.wait(),
            local_usage.wait(),
            global_usage.wait(),
            uploader
        )?;

        let repository = repos.get(&item.repository);
        if repository.is_none() {
            debug!(item = %handle, repository = %item.repository, "Repository not in repository list");
        }

        Ok(MetadataBundle {
            item,
            repository,
            local_usage,
            global_usage,
            uploader,
        })
    }

    async fn uploader_for(
        &self,
        item: &ItemInfo,
        repos: &RepositoryList,
    ) -> FetchResult<Option<Arc<UploaderInfo>>> {
        let Some(key) = uploader_key(item, repos) else {
            return Ok(None);
        };

        let info = self.uploader.get(&key).wait().await.map_err(|err| {
            warn!(item = %item.handle, user = %key.user, error = %err, "Uploader lookup failed");
            err
        })?;
        Ok(Some(info))
    }

    /// Drop cached failures related to `handle` so the next fetch retries them.
    pub fn forget_failures(&self, handle: &ItemHandle) -> usize {
        let mut dropped = 0;
        dropped += usize::from(self.item_info.forget_failure(handle));
        dropped += usize::from(self.repositories.forget_failure(&AllRepositories));
        dropped += usize::from(self.local_usage.forget_failure(handle));
        dropped += usize::from(self.global_usage.forget_failure(handle));
        dropped += self.forget_uploader_failure(handle);
        dropped
    }

    /// The uploader key is only known once item info and the repository list
    /// are cached, so nothing is dropped before that.
    fn forget_uploader_failure(&self, handle: &ItemHandle) -> usize {
        let item = self.item_info.cache().lookup(handle).and_then(|p| p.peek());
        let repos = self
            .repositories
            .cache()
            .lookup(&AllRepositories)
            .and_then(|p| p.peek());

        match (item, repos) {
            (Some(Ok(item)), Some(Ok(repos))) => match uploader_key(&item, &repos) {
                Some(key) => usize::from(self.uploader.forget_failure(&key)),
                None => 0,
            },
            _ => 0,
        }
    }
}

fn uploader_key(item: &ItemInfo, repos: &RepositoryList) -> Option<UploaderKey> {
    let user = item.last_uploader.as_deref()?;
    let repository = repos.get(&item.repository);
    Some(UploaderKey::new(user, &item.repository, repository.as_deref()))
}
