//! File repositories known to the wiki.
//!
//! The list is the same for every item, so it is fetched once per session
//! and looked up by repository name.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::cache::{Pending, ResourceCache};
use super::response::{parse_member, query_section};
use super::FetchProvider;
use crate::error::FetchResult;
use crate::models::RepositoryInfo;
use crate::transport::{ApiRequest, FetchTransport};

#[derive(Debug, Deserialize)]
struct RawRepo {
    name: String,
    #[serde(default)]
    displayname: Option<String>,
    #[serde(default, rename = "rootUrl")]
    root_url: Option<String>,
    #[serde(default)]
    apiurl: Option<String>,
    #[serde(default)]
    articlepath: Option<String>,
    #[serde(default)]
    server: Option<String>,
    #[serde(default)]
    local: Option<Value>,
}

impl From<RawRepo> for RepositoryInfo {
    fn from(raw: RawRepo) -> Self {
        let is_local = match &raw.local {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(_) => true,
        };
        RepositoryInfo {
            display_name: raw.displayname.unwrap_or_else(|| raw.name.clone()),
            name: raw.name,
            root_url: raw.root_url,
            api_url: raw.apiurl,
            article_path: raw.articlepath,
            server: raw.server,
            is_local,
        }
    }
}

/// All repositories, indexed by name.
#[derive(Debug, Clone, Default)]
pub struct RepositoryList {
    repos: HashMap<String, Arc<RepositoryInfo>>,
}

impl RepositoryList {
    pub fn get(&self, name: &str) -> Option<Arc<RepositoryInfo>> {
        self.repos.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}

/// Key of the single repository-list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllRepositories;

pub struct RepositoryProvider {
    transport: Arc<dyn FetchTransport>,
    cache: ResourceCache<AllRepositories, RepositoryList>,
}

impl RepositoryProvider {
    pub fn new(transport: Arc<dyn FetchTransport>) -> Self {
        Self {
            transport,
            cache: ResourceCache::new("repository-info"),
        }
    }

    pub fn fetch(&self) -> Pending<RepositoryList> {
        self.get(&AllRepositories)
    }

    pub fn cache(&self) -> &ResourceCache<AllRepositories, RepositoryList> {
        &self.cache
    }
}

impl FetchProvider<AllRepositories, RepositoryList> for RepositoryProvider {
    fn get(&self, key: &AllRepositories) -> Pending<RepositoryList> {
        let transport = Arc::clone(&self.transport);
        self.cache.get_or_fetch(*key, move |_| async move {
            let request = ApiRequest::query()
                .param("meta", "filerepoinfo")
                .param("format", "json");
            let doc = transport.request(request).await?;
            parse_repository_list(&doc)
        })
    }

    fn forget_failure(&self, key: &AllRepositories) -> bool {
        self.cache.invalidate_failed(key)
    }
}

pub(crate) fn parse_repository_list(doc: &Value) -> FetchResult<RepositoryList> {
    let raw: Vec<RawRepo> = parse_member(query_section(doc)?, "repos")?;
    let repos = raw
        .into_iter()
        .map(RepositoryInfo::from)
        .map(|repo| (repo.name.clone(), Arc::new(repo)))
        .collect();
    Ok(RepositoryList { repos })
}
