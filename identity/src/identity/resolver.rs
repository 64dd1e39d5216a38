//! # DID Key Resolver
//!
//! Turns a DID into its DID Document. The resolver itself knows nothing about
//! ledgers, HTTP, or registries: the actual lookup is an injected
//! [`DidResolution`] collaborator, and successful lookups are memoized in a
//! [`DidDocumentCache`].
//!
//! ## Resolution order
//!
//! 1. Reject malformed DIDs before any I/O.
//! 2. Serve from the cache when possible.
//! 3. Otherwise ask the collaborator. Cache the document on success. On
//!    failure return the collaborator's error untouched and cache nothing.
//!
//! The collaborator is awaited with no timeout. Callers that need one wrap
//! [`DidKeyResolver::resolve_did`] in `tokio::time::timeout`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

use super::cache::DidDocumentCache;
use super::did::{is_valid_did, DidDocument};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by a resolution collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("DID not found: {0}")]
    NotFound(String),

    #[error("invalid DID document for {did}: {reason}")]
    InvalidDocument { did: String, reason: String },

    #[error("resolution backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors from [`DidKeyResolver::resolve_did`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolverError {
    #[error("invalid DID format: {0}")]
    InvalidDidFormat(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

// ---------------------------------------------------------------------------
// Collaborator
// ---------------------------------------------------------------------------

/// Looks up the DID Document for a DID.
///
/// Implementations may do network or ledger I/O. A successful result should
/// list its verification methods in a stable order.
#[async_trait]
pub trait DidResolution: Send + Sync {
    async fn resolve(&self, did: &str) -> Result<DidDocument, ResolutionError>;
}

/// In-process collaborator backed by a map of registered documents.
#[derive(Debug, Default)]
pub struct InMemoryResolver {
    documents: RwLock<HashMap<String, DidDocument>>,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `document` under its own id. Returns the previous entry.
    pub fn insert(&self, document: DidDocument) -> Option<DidDocument> {
        self.documents.write().insert(document.id.clone(), document)
    }

    pub fn remove(&self, did: &str) -> Option<DidDocument> {
        self.documents.write().remove(did)
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl FromIterator<DidDocument> for InMemoryResolver {
    fn from_iter<T: IntoIterator<Item = DidDocument>>(iter: T) -> Self {
        let resolver = Self::new();
        for document in iter {
            resolver.insert(document);
        }
        resolver
    }
}

#[async_trait]
impl DidResolution for InMemoryResolver {
    async fn resolve(&self, did: &str) -> Result<DidDocument, ResolutionError> {
        self.documents
            .read()
            .get(did)
            .cloned()
            .ok_or_else(|| ResolutionError::NotFound(did.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Cached DID resolution over an injected collaborator.
#[derive(Clone)]
pub struct DidKeyResolver {
    resolution: Arc<dyn DidResolution>,
    cache: Arc<DidDocumentCache>,
}

impl std::fmt::Debug for DidKeyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DidKeyResolver")
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl DidKeyResolver {
    /// A resolver with its own empty cache.
    pub fn new(resolution: Arc<dyn DidResolution>) -> Self {
        Self::with_cache(resolution, Arc::new(DidDocumentCache::new()))
    }

    /// A resolver that shares `cache` with whoever else holds it.
    pub fn with_cache(resolution: Arc<dyn DidResolution>, cache: Arc<DidDocumentCache>) -> Self {
        Self { resolution, cache }
    }

    pub fn cache(&self) -> &Arc<DidDocumentCache> {
        &self.cache
    }

    /// Resolve `did` to its DID Document.
    pub async fn resolve_did(&self, did: &str) -> Result<Arc<DidDocument>, ResolverError> {
        if !is_valid_did(did) {
            return Err(ResolverError::InvalidDidFormat(did.to_string()));
        }

        let resolution = Arc::clone(&self.resolution);
        self.cache
            .get_or_fetch(did, || async move {
                debug!(did, "resolving DID through collaborator");
                resolution.resolve(did).await.map_err(|e| {
                    warn!(did, error = %e, "DID resolution failed");
                    ResolverError::Resolution(e)
                })
            })
            .await
    }
}
