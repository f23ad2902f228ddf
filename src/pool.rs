//! The in-memory collection instance pool.

use std::collections::HashMap;
use std::sync::Arc;

use crate::collection::CollectionHandle;
use crate::gridfs::GridFsHandle;

/// A pooled instance. Collections and GridFS buckets share the same
/// name namespace.
#[derive(Clone)]
pub enum PooledInstance {
    /// A pooled collection handle.
    Collection(Arc<CollectionHandle>),
    /// A pooled GridFS handle, keyed by bucket prefix.
    GridFs(Arc<GridFsHandle>),
}

impl PooledInstance {
    /// Which contract the pooled instance satisfies.
    pub fn contract_name(&self) -> &'static str {
        match self {
            Self::Collection(_) => "collection",
            Self::GridFs(_) => "gridfs",
        }
    }
}

/// Pool of resolved instances, keyed by collection name or GridFS prefix.
///
/// Enabled by default. Entries are added lazily on first access; clearing
/// evicts everything but leaves pooling enabled, and disabling stops
/// lookups and inserts without evicting existing entries.
pub struct CollectionPool {
    entries: HashMap<String, PooledInstance>,
    enabled: bool,
}

impl CollectionPool {
    /// Create an enabled, empty pool.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            enabled: true,
        }
    }

    /// Whether pooling is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable pooling.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Disable pooling. Existing entries are retained.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Evict every pooled instance. Does not change the enabled flag.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Look up a pooled instance by name.
    pub fn get(&self, name: &str) -> Option<PooledInstance> {
        self.entries.get(name).cloned()
    }

    /// Whether an instance is pooled under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Pool a collection handle under its name.
    pub fn insert_collection(&mut self, name: impl Into<String>, handle: Arc<CollectionHandle>) {
        self.entries
            .insert(name.into(), PooledInstance::Collection(handle));
    }

    /// Pool a GridFS handle under its prefix.
    pub fn insert_gridfs(&mut self, prefix: impl Into<String>, handle: Arc<GridFsHandle>) {
        self.entries
            .insert(prefix.into(), PooledInstance::GridFs(handle));
    }

    /// Number of pooled instances.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CollectionPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionContext;
    use bson::Document;

    async fn test_handle(name: &str) -> Arc<CollectionHandle> {
        let options = mongodb::options::ClientOptions::parse("mongodb://localhost:27017")
            .await
            .unwrap();
        let client = mongodb::Client::with_options(options).unwrap();
        Arc::new(CollectionHandle::from_context(CollectionContext {
            database: client.database("pool_tests"),
            name: name.to_string(),
            options: Document::new(),
            match_groups: Vec::new(),
        }))
    }

    #[test]
    fn test_pool_starts_enabled_and_empty() {
        let pool = CollectionPool::new();
        assert!(pool.is_enabled());
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_insert_and_get_share_the_instance() {
        let mut pool = CollectionPool::new();
        let handle = test_handle("users").await;
        pool.insert_collection("users", Arc::clone(&handle));

        match pool.get("users") {
            Some(PooledInstance::Collection(pooled)) => {
                assert!(Arc::ptr_eq(&pooled, &handle));
            }
            _ => panic!("expected pooled collection"),
        }
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn test_disable_retains_entries() {
        let mut pool = CollectionPool::new();
        pool.insert_collection("users", test_handle("users").await);

        pool.disable();
        assert!(!pool.is_enabled());
        assert!(pool.contains("users"));

        pool.enable();
        assert!(pool.contains("users"));
    }

    #[tokio::test]
    async fn test_clear_evicts_but_keeps_enabled() {
        let mut pool = CollectionPool::new();
        pool.insert_collection("users", test_handle("users").await);

        pool.clear();
        assert!(pool.is_empty());
        assert!(pool.is_enabled());
    }
}
