//! # DID Document Cache
//!
//! Resolved DID Documents, keyed by DID. The cache is an ordinary value:
//! construct it, wrap it in an `Arc`, and hand it to as many resolvers as
//! should share it. Tests get a fresh one each time.
//!
//! ## Limits
//!
//! - Unbounded. No TTL and no eviction; a process that resolves an open
//!   set of DIDs grows without limit.
//! - [`DidDocumentCache::get_or_fetch`] does not deduplicate concurrent
//!   misses. Two tasks that miss on the same DID at the same time both run
//!   their fetch, and the later insert wins.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::did::DidDocument;

/// Concurrent map from DID to its resolved document.
#[derive(Debug, Default)]
pub struct DidDocumentCache {
    entries: DashMap<String, Arc<DidDocument>>,
}

impl DidDocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, did: &str) -> Option<Arc<DidDocument>> {
        self.entries.get(did).map(|entry| Arc::clone(entry.value()))
    }

    /// Insert or replace the document for `did`.
    pub fn set(&self, did: impl Into<String>, document: Arc<DidDocument>) {
        self.entries.insert(did.into(), document);
    }

    /// Return the cached document, or run `fetch` and cache its success.
    ///
    /// Failures are returned as-is and leave the cache untouched. The map
    /// lock is never held across `fetch`.
    pub async fn get_or_fetch<F, Fut, E>(&self, did: &str, fetch: F) -> Result<Arc<DidDocument>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DidDocument, E>>,
    {
        if let Some(hit) = self.get(did) {
            debug!(did, "DID document cache hit");
            return Ok(hit);
        }

        debug!(did, "DID document cache miss");
        let document = Arc::new(fetch().await?);
        self.set(did, Arc::clone(&document));
        Ok(document)
    }

    pub fn contains(&self, did: &str) -> bool {
        self.entries.contains_key(did)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
