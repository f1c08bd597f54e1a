//! Content metadata documents and their resolution.
//!
//! A content item's `tokenURI` points at a JSON document in decentralized
//! storage. The document is parsed into [`ContentMetadata`] at the boundary,
//! so downstream code never handles untyped JSON.

pub mod gateway;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::TokenId;

pub use gateway::{GatewayResolver, DEFAULT_GATEWAYS};
pub use mock::MockResolver;

/// Metadata resolution error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// URI scheme is not fetchable
    #[error("Unsupported metadata URI: {0}")]
    UnsupportedUri(String),

    /// Request could not be sent or the body not read
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// A gateway attempt did not finish in time
    #[error("Timed out after {after_ms}ms fetching {url}")]
    Timeout { url: String, after_ms: u64 },

    /// Gateway answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Body is not a valid metadata document
    #[error("Invalid metadata document: {0}")]
    Parse(String),

    /// No document registered (mock resolver)
    #[error("Metadata not found: {0}")]
    NotFound(String),
}

/// Moderation flags written by admins into the metadata document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moderation {
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub reports: u32,
    #[serde(default)]
    pub flags: u32,
}

/// Parsed metadata document for one content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub contribution_type: Option<String>,
    /// Parent item for forks. Accepts numbers, decimal or `0x` hex strings and
    /// integral floats. Zero, negative and non-numeric values read as `None`.
    #[serde(default, deserialize_with = "lenient_token_id")]
    pub parent_token_id: Option<TokenId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub moderation: Moderation,
}

impl ContentMetadata {
    /// Parse and validate a metadata document.
    pub fn from_json(body: &str) -> Result<Self, MetadataError> {
        let meta: ContentMetadata =
            serde_json::from_str(body).map_err(|e| MetadataError::Parse(e.to_string()))?;
        if meta.name.trim().is_empty() {
            return Err(MetadataError::Parse("name is empty".to_string()));
        }
        Ok(meta)
    }

    pub fn is_hidden(&self) -> bool {
        self.moderation.hidden
    }
}

fn lenient_token_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<TokenId>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    let id = value.and_then(|v| match v {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(integral_f64)),
        Value::String(s) => parse_token_id_str(&s),
        _ => None,
    });
    Ok(id.filter(|id| *id > 0))
}

/// Decimal, `0x` hex, or an integral float such as `"7.0"`.
fn parse_token_id_str(raw: &str) -> Option<TokenId> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok();
    }
    raw.parse::<u64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().and_then(integral_f64))
}

fn integral_f64(f: f64) -> Option<TokenId> {
    (f.is_finite() && f.fract() == 0.0 && f > 0.0 && f < u64::MAX as f64).then_some(f as u64)
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Resolves a metadata URI to a parsed document.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve(&self, uri: &str) -> Result<ContentMetadata, MetadataError>;
}
