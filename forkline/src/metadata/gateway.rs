//! HTTP metadata resolver over public IPFS gateways

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{ContentMetadata, MetadataError, MetadataResolver};

/// Gateways tried, in order, for `ipfs://` URIs.
pub const DEFAULT_GATEWAYS: &[&str] = &[
    "https://storacha.link/ipfs/",
    "https://ipfs.io/ipfs/",
    "https://w3s.link/ipfs/",
];

const IPFS_SCHEME: &str = "ipfs://";

/// Resolves metadata URIs over HTTP.
///
/// `ipfs://<cid>/path` is rewritten against each gateway in turn until one
/// answers 2xx; `http(s)://` URIs are fetched as-is.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use forkline::metadata::{GatewayResolver, MetadataResolver};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = GatewayResolver::with_defaults(Duration::from_secs(10))?;
/// let meta = resolver.resolve("ipfs://bafy.../metadata.json").await?;
/// println!("{}", meta.name);
/// # Ok(())
/// # }
/// ```
pub struct GatewayResolver {
    client: Client,
    gateways: Vec<String>,
    attempt_timeout: Duration,
}

impl GatewayResolver {
    /// `timeout` bounds each gateway attempt, not the whole resolution.
    pub fn new(gateways: Vec<String>, timeout: Duration) -> Result<Self, MetadataError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| MetadataError::Fetch {
                url: String::new(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            gateways: gateways.into_iter().map(normalize_gateway).collect(),
            attempt_timeout: timeout,
        })
    }

    pub fn with_defaults(timeout: Duration) -> Result<Self, MetadataError> {
        Self::new(
            DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect(),
            timeout,
        )
    }

    pub fn gateways(&self) -> &[String] {
        &self.gateways
    }

    /// Every HTTP URL to try for `uri`, in order.
    pub fn candidate_urls(&self, uri: &str) -> Result<Vec<String>, MetadataError> {
        if let Some(path) = uri.strip_prefix(IPFS_SCHEME) {
            if self.gateways.is_empty() || path.is_empty() {
                return Err(MetadataError::UnsupportedUri(uri.to_string()));
            }
            return Ok(self
                .gateways
                .iter()
                .map(|gw| format!("{}{}", gw, path))
                .collect());
        }
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(vec![uri.to_string()]);
        }
        Err(MetadataError::UnsupportedUri(uri.to_string()))
    }

    async fn fetch(&self, url: &str) -> Result<String, MetadataError> {
        match tokio::time::timeout(self.attempt_timeout, self.fetch_body(url)).await {
            Ok(result) => result,
            Err(_) => Err(MetadataError::Timeout {
                url: url.to_string(),
                after_ms: self.attempt_timeout.as_millis() as u64,
            }),
        }
    }

    async fn fetch_body(&self, url: &str) -> Result<String, MetadataError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MetadataError::Fetch {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| MetadataError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

fn normalize_gateway(gateway: String) -> String {
    if gateway.ends_with('/') {
        gateway
    } else {
        format!("{}/", gateway)
    }
}

#[async_trait]
impl MetadataResolver for GatewayResolver {
    async fn resolve(&self, uri: &str) -> Result<ContentMetadata, MetadataError> {
        let mut last_err = None;
        for url in self.candidate_urls(uri)? {
            match self.fetch(&url).await {
                // A body that fails to parse is the document's fault, not the gateway's.
                Ok(body) => return ContentMetadata::from_json(&body),
                Err(e) => {
                    debug!(url = %url, error = %e, "gateway attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            MetadataError::UnsupportedUri(uri.to_string())
        }))
    }
}
