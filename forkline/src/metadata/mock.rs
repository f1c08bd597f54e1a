//! Mock metadata resolver for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use super::{ContentMetadata, MetadataError, MetadataResolver};
use crate::types::TokenId;

/// In-memory URI → document map.
#[derive(Default)]
pub struct MockResolver {
    documents: RwLock<HashMap<String, Result<ContentMetadata, MetadataError>>>,
    resolve_count: AtomicU32,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, uri: impl Into<String>, metadata: ContentMetadata) -> Self {
        self.documents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(uri.into(), Ok(metadata));
        self
    }

    /// Register a raw JSON body, parsed exactly as a gateway response would be.
    pub fn with_json(self, uri: impl Into<String>, body: &str) -> Self {
        self.documents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(uri.into(), ContentMetadata::from_json(body));
        self
    }

    pub fn with_failure(self, uri: impl Into<String>, error: MetadataError) -> Self {
        self.documents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(uri.into(), Err(error));
        self
    }

    pub fn resolve_count(&self) -> u32 {
        self.resolve_count.load(Ordering::SeqCst)
    }
}

/// Metadata document with just a name and optional parent.
pub fn document(name: &str, parent: Option<TokenId>) -> ContentMetadata {
    ContentMetadata {
        name: name.to_string(),
        description: None,
        image: None,
        content_type: None,
        contribution_type: None,
        parent_token_id: parent,
        moderation: Default::default(),
    }
}

#[async_trait]
impl MetadataResolver for MockResolver {
    async fn resolve(&self, uri: &str) -> Result<ContentMetadata, MetadataError> {
        self.resolve_count.fetch_add(1, Ordering::SeqCst);
        self.documents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(uri)
            .cloned()
            .unwrap_or_else(|| Err(MetadataError::NotFound(uri.to_string())))
    }
}
