//! Uploader lookups, sent to the API of the repository that hosts the item.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::cache::{Pending, ResourceCache};
use super::response::{parse_member, query_section};
use super::FetchProvider;
use crate::error::{FetchError, FetchResult};
use crate::models::{Gender, RepositoryInfo, UploaderInfo};
use crate::transport::{ApiRequest, FetchTransport};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UploaderKey {
    pub user: String,
    pub repository: String,
    /// Foreign API endpoint, or `None` for the local API.
    pub endpoint: Option<String>,
}

impl UploaderKey {
    pub fn new(user: &str, repository_name: &str, repository: Option<&RepositoryInfo>) -> Self {
        Self {
            user: user.to_string(),
            repository: repository_name.to_string(),
            endpoint: repository.and_then(|r| r.user_endpoint()).map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    missing: Option<Value>,
}

pub struct UploaderProvider {
    transport: Arc<dyn FetchTransport>,
    cache: ResourceCache<UploaderKey, UploaderInfo>,
}

impl UploaderProvider {
    pub fn new(transport: Arc<dyn FetchTransport>) -> Self {
        Self {
            transport,
            cache: ResourceCache::new("uploader-info"),
        }
    }

    pub fn cache(&self) -> &ResourceCache<UploaderKey, UploaderInfo> {
        &self.cache
    }
}

impl FetchProvider<UploaderKey, UploaderInfo> for UploaderProvider {
    fn get(&self, key: &UploaderKey) -> Pending<UploaderInfo> {
        let transport = Arc::clone(&self.transport);
        self.cache.get_or_fetch(key.clone(), move |key| async move {
            let request = ApiRequest::query()
                .endpoint(key.endpoint.as_deref())
                .param("list", "users")
                .param("ususers", key.user.as_str())
                .param("usprop", "gender")
                .param("format", "json");
            let doc = transport.request(request).await?;
            parse_uploader(&key, &doc)
        })
    }

    fn forget_failure(&self, key: &UploaderKey) -> bool {
        self.cache.invalidate_failed(key)
    }
}

pub(crate) fn parse_uploader(key: &UploaderKey, doc: &Value) -> FetchResult<UploaderInfo> {
    let users: Vec<RawUser> = parse_member(query_section(doc)?, "users")?;
    let user = users
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::malformed("users list is empty"))?;

    // Deleted or renamed accounts still get a name on the panel.
    let gender = if user.missing.is_some() {
        Gender::Unknown
    } else {
        Gender::parse(user.gender.as_deref())
    };

    Ok(UploaderInfo {
        name: user.name.unwrap_or_else(|| key.user.clone()),
        repository: key.repository.clone(),
        gender,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTransport;
    use serde_json::json;

    fn key() -> UploaderKey {
        UploaderKey {
            user: "Dylanbot11".into(),
            repository: "shared".into(),
            endpoint: Some("https://commons.example.org/w/api.php".into()),
        }
    }

    #[test]
    fn test_parse_uploader() {
        let doc = json!({ "query": { "users": [ { "userid": 5, "name": "Dylanbot11", "gender": "female" } ] } });
        let info = parse_uploader(&key(), &doc).unwrap();
        assert_eq!(info.name, "Dylanbot11");
        assert_eq!(info.gender, Gender::Female);
        assert_eq!(info.repository, "shared");
    }

    #[test]
    fn test_missing_user_has_unknown_gender() {
        let doc = json!({ "query": { "users": [ { "name": "Gone", "missing": "" } ] } });
        assert_eq!(parse_uploader(&key(), &doc).unwrap().gender, Gender::Unknown);
    }

    #[test]
    fn test_key_uses_foreign_endpoint_only() {
        let foreign = RepositoryInfo {
            name: "shared".into(),
            api_url: Some("https://commons.example.org/w/api.php".into()),
            ..Default::default()
        };
        let local = RepositoryInfo {
            name: "local".into(),
            api_url: Some("https://local.example.org/w/api.php".into()),
            is_local: true,
            ..Default::default()
        };
        assert_eq!(
            UploaderKey::new("A", "shared", Some(&foreign)).endpoint.as_deref(),
            Some("https://commons.example.org/w/api.php")
        );
        assert_eq!(UploaderKey::new("A", "local", Some(&local)).endpoint, None);
        assert_eq!(UploaderKey::new("A", "other", None).endpoint, None);
    }

    #[tokio::test]
    async fn test_request_goes_to_repository_endpoint() {
        let transport = FakeTransport::empty();
        transport.respond_with(
            &["list=users"],
            Ok(json!({ "query": { "users": [ { "name": "Dylanbot11", "gender": "male" } ] } })),
        );
        let provider = UploaderProvider::new(transport.clone());

        let info = provider.get(&key()).wait().await.unwrap();

        assert_eq!(info.gender, Gender::Male);
        let requests = transport.requests();
        assert_eq!(
            requests[0].endpoint.as_deref(),
            Some("https://commons.example.org/w/api.php")
        );
        assert_eq!(requests[0].get("ususers"), Some("Dylanbot11"));
    }
}
