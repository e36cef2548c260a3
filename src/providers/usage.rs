//! Pages that use an item, on this wiki (local) or across wikis (global).

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::cache::{Pending, ResourceCache};
use super::response::{first_page, query_section};
use super::FetchProvider;
use crate::error::FetchResult;
use crate::models::{ItemHandle, UsageInfo, UsagePage, UsageScope};
use crate::transport::{ApiRequest, FetchTransport};

#[derive(Debug, Deserialize)]
struct RawUsage {
    title: String,
    #[serde(default)]
    wiki: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl From<RawUsage> for UsagePage {
    fn from(raw: RawUsage) -> Self {
        UsagePage {
            title: raw.title,
            wiki: raw.wiki,
            url: raw.url,
        }
    }
}

pub struct UsageProvider {
    transport: Arc<dyn FetchTransport>,
    scope: UsageScope,
    limit: u32,
    /// Global usage may be unavailable on a wiki; the provider then answers
    /// with an empty list without calling the transport.
    available: bool,
    cache: ResourceCache<ItemHandle, UsageInfo>,
}

impl UsageProvider {
    pub fn local(transport: Arc<dyn FetchTransport>, limit: u32) -> Self {
        Self {
            transport,
            scope: UsageScope::Local,
            limit,
            available: true,
            cache: ResourceCache::new("local-usage"),
        }
    }

    pub fn global(transport: Arc<dyn FetchTransport>, limit: u32, available: bool) -> Self {
        Self {
            transport,
            scope: UsageScope::Global,
            limit,
            available,
            cache: ResourceCache::new("global-usage"),
        }
    }

    pub fn scope(&self) -> UsageScope {
        self.scope
    }

    fn request_for(&self, handle: &ItemHandle) -> ApiRequest {
        let limit = self.limit.to_string();
        match self.scope {
            UsageScope::Local => ApiRequest::query()
                .param("list", "imageusage")
                .param("iutitle", handle.db_key())
                .param("iulimit", limit)
                .param("format", "json"),
            UsageScope::Global => ApiRequest::query()
                .param("prop", "globalusage")
                .param("titles", handle.db_key())
                .param("gulimit", limit)
                .param("format", "json"),
        }
    }

    pub fn cache(&self) -> &ResourceCache<ItemHandle, UsageInfo> {
        &self.cache
    }
}

impl FetchProvider<ItemHandle, UsageInfo> for UsageProvider {
    fn get(&self, handle: &ItemHandle) -> Pending<UsageInfo> {
        let scope = self.scope;
        if !self.available {
            return self.cache.get_or_fetch(handle.clone(), move |handle| async move {
                debug!(item = %handle, "Global usage unavailable, using empty list");
                Ok(UsageInfo::empty(scope, handle))
            });
        }

        let transport = Arc::clone(&self.transport);
        let request = self.request_for(handle);
        self.cache.get_or_fetch(handle.clone(), move |handle| async move {
            let doc = transport.request(request).await?;
            parse_usage(scope, handle, &doc)
        })
    }

    fn forget_failure(&self, handle: &ItemHandle) -> bool {
        self.cache.invalidate_failed(handle)
    }
}

pub(crate) fn parse_usage(scope: UsageScope, handle: ItemHandle, doc: &Value) -> FetchResult<UsageInfo> {
    let list = match scope {
        UsageScope::Local => query_section(doc)?.get("imageusage"),
        UsageScope::Global => first_page(doc)?.get("globalusage"),
    };

    // An item nobody uses may come back without the list member at all.
    let pages = match list {
        Some(raw) => Vec::<RawUsage>::deserialize(raw)?
            .into_iter()
            .map(UsagePage::from)
            .collect(),
        None => Vec::new(),
    };

    Ok(UsageInfo {
        scope,
        handle,
        pages,
        truncated: doc.get("continue").is_some() || doc.get("query-continue").is_some(),
    })
}
