//! The fetch capability the core consumes.
//!
//! The crate never performs HTTP itself. Hosts implement `FetchTransport`
//! over whatever client they have; tests script it.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::FetchResult;

/// An API query: ordered key/value parameters and an optional foreign endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ApiRequest {
    /// API URL of a foreign repository; `None` targets the local API.
    pub endpoint: Option<String>,
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    /// Start an `action=query` request.
    pub fn query() -> Self {
        Self::default().param("action", "query")
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    pub fn endpoint(mut self, endpoint: Option<&str>) -> Self {
        self.endpoint = endpoint.map(str::to_string);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(endpoint) = &self.endpoint {
            write!(f, "{endpoint}?")?;
        }
        for (i, (k, v)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

/// Reports download progress for one rendition, as a fraction in `0..=1`.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: watch::Sender<f32>,
}

impl ProgressSender {
    pub(crate) fn channel() -> (Self, watch::Receiver<f32>) {
        let (tx, rx) = watch::channel(0.0);
        (Self { tx }, rx)
    }

    /// A sender nobody listens to.
    pub fn detached() -> Self {
        Self::channel().0
    }

    pub fn report(&self, fraction: f32) {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.tx.send_replace(fraction);
    }
}

#[async_trait]
pub trait FetchTransport: Send + Sync {
    /// Run an API query and return its JSON document.
    async fn request(&self, request: ApiRequest) -> FetchResult<serde_json::Value>;

    /// Download the raw bytes behind a rendition URL.
    async fn download(&self, url: &str, progress: ProgressSender) -> FetchResult<Vec<u8>>;
}
