//! The database facade.
//!
//! A [`Database`] holds a driver-level database handle plus the mapping
//! tables, constructor registry, and instance pool. Collection access
//! resolves names through the class map, constructs handles through the
//! registry, and pools them; everything administrative is a pass-through
//! to the driver.

use std::sync::Arc;
use std::time::Duration;

use bson::{Bson, Document, doc};
use mongodb::options::{DatabaseOptions, SelectionCriteria};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tracing::{debug, info};

use crate::collection::{CollectionContext, CollectionHandle};
use crate::concern::{ProfilerLevel, ReadPreference, TagSet, WriteConcern};
use crate::document::DocumentExt;
use crate::error::{OdmError, OdmResult};
use crate::gridfs::{GridFsContext, GridFsHandle};
use crate::mapping::{ClassDefinition, ClassMap};
use crate::pool::{CollectionPool, PooledInstance};
use crate::registry::{DEFAULT_COLLECTION_TYPE, DEFAULT_GRIDFS_TYPE, TypeRegistry};

/// Default GridFS bucket prefix.
pub const DEFAULT_GRIDFS_PREFIX: &str = "fs";

struct DatabaseState {
    inner: mongodb::Database,
    read_preference: Option<ReadPreference>,
    write_concern: Option<WriteConcern>,
}

struct Shared {
    client: mongodb::Client,
    name: String,
    default_collection_type: String,
    default_gridfs_type: String,
    state: RwLock<DatabaseState>,
    mapping: RwLock<ClassMap>,
    registry: RwLock<TypeRegistry>,
    pool: Mutex<CollectionPool>,
}

/// A database facade bound to one named database of a client.
///
/// Cloning is cheap and clones share all state, including the pool. The
/// facade adds no concurrency of its own: one handle per logical session
/// is the intended usage.
#[derive(Clone)]
pub struct Database {
    shared: Arc<Shared>,
}

impl Database {
    /// Create a facade over `name` with the built-in default types.
    pub fn new(client: mongodb::Client, name: impl Into<String>) -> Self {
        Self::with_default_types(client, name, DEFAULT_COLLECTION_TYPE, DEFAULT_GRIDFS_TYPE)
    }

    /// Create a facade with custom default type tokens for unmapped
    /// collection and GridFS lookups.
    pub fn with_default_types(
        client: mongodb::Client,
        name: impl Into<String>,
        default_collection_type: impl Into<String>,
        default_gridfs_type: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let inner = client.database(&name);
        Self {
            shared: Arc::new(Shared {
                client,
                name,
                default_collection_type: default_collection_type.into(),
                default_gridfs_type: default_gridfs_type.into(),
                state: RwLock::new(DatabaseState {
                    inner,
                    read_preference: None,
                    write_concern: None,
                }),
                mapping: RwLock::new(ClassMap::new()),
                registry: RwLock::new(TypeRegistry::with_defaults()),
                pool: Mutex::new(CollectionPool::new()),
            }),
        }
    }

    pub(crate) fn with_initial_concerns(
        client: mongodb::Client,
        name: impl Into<String>,
        read_preference: Option<ReadPreference>,
        write_concern: Option<WriteConcern>,
    ) -> Self {
        let database = Self::new(client, name);
        {
            let mut state = database.shared.state.write();
            state.read_preference = read_preference;
            state.write_concern = write_concern;
        }
        database
    }

    /// The database name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The driver client this facade was issued by.
    pub fn client(&self) -> &mongodb::Client {
        &self.shared.client
    }

    /// The driver-level database handle, for collaborators layered on
    /// top of collection access.
    pub fn mongodb_handle(&self) -> mongodb::Database {
        self.shared.state.read().inner.clone()
    }

    /// Default type token used for unmapped collection lookups.
    pub fn default_collection_type(&self) -> &str {
        &self.shared.default_collection_type
    }

    /// Default type token used for unmapped GridFS lookups.
    pub fn default_gridfs_type(&self) -> &str {
        &self.shared.default_gridfs_type
    }

    // ========================================================================
    // Mapping and registry
    // ========================================================================

    /// Map a collection name or `/pattern/` to a class definition.
    pub fn map(
        &self,
        name_or_pattern: &str,
        definition: impl Into<ClassDefinition>,
    ) -> OdmResult<()> {
        self.shared.mapping.write().map(name_or_pattern, definition)
    }

    /// Map a batch of names or patterns.
    pub fn map_all<I, N, D>(&self, entries: I) -> OdmResult<()>
    where
        I: IntoIterator<Item = (N, D)>,
        N: AsRef<str>,
        D: Into<ClassDefinition>,
    {
        self.shared.mapping.write().map_all(entries)
    }

    /// Set the namespace prefix used to synthesize type tokens for
    /// otherwise unmapped names.
    pub fn map_prefix(&self, prefix: impl Into<String>) {
        self.shared.mapping.write().map_prefix(prefix);
    }

    /// Register a collection constructor under a type token.
    pub fn register_collection_type<F>(&self, token: impl Into<String>, factory: F)
    where
        F: Fn(CollectionContext) -> OdmResult<CollectionHandle> + Send + Sync + 'static,
    {
        self.shared.registry.write().register_collection(token, factory);
    }

    /// Register a GridFS constructor under a type token.
    pub fn register_gridfs_type<F>(&self, token: impl Into<String>, factory: F)
    where
        F: Fn(GridFsContext) -> OdmResult<GridFsHandle> + Send + Sync + 'static,
    {
        self.shared.registry.write().register_gridfs(token, factory);
    }

    // ========================================================================
    // Collection access and pooling
    // ========================================================================

    /// Get a collection handle, consulting the pool first.
    pub fn collection(&self, name: &str) -> OdmResult<Arc<CollectionHandle>> {
        let default_type = self.shared.default_collection_type.clone();
        self.collection_as(name, &default_type)
    }

    /// Get a collection handle with a per-call default type token.
    pub fn collection_as(
        &self,
        name: &str,
        default_type: &str,
    ) -> OdmResult<Arc<CollectionHandle>> {
        let pooling = self.is_collection_pool_enabled();
        if pooling {
            if let Some(instance) = self.shared.pool.lock().get(name) {
                return match instance {
                    PooledInstance::Collection(handle) => Ok(handle),
                    PooledInstance::GridFs(_) => Err(OdmError::type_conformance(format!(
                        "'{}' is pooled as a gridfs bucket, not a collection",
                        name
                    ))),
                };
            }
        }

        let handle = Arc::new(self.construct_collection(name, default_type)?);
        if pooling {
            self.shared
                .pool
                .lock()
                .insert_collection(name, Arc::clone(&handle));
        }
        Ok(handle)
    }

    /// Get the default GridFS bucket (`"fs"` prefix).
    pub fn gridfs(&self) -> OdmResult<Arc<GridFsHandle>> {
        self.gridfs_with_prefix(DEFAULT_GRIDFS_PREFIX)
    }

    /// Get a GridFS bucket by prefix, consulting the pool first.
    pub fn gridfs_with_prefix(&self, prefix: &str) -> OdmResult<Arc<GridFsHandle>> {
        let default_type = self.shared.default_gridfs_type.clone();
        self.gridfs_as(prefix, &default_type)
    }

    /// Get a GridFS bucket with a per-call default type token.
    pub fn gridfs_as(&self, prefix: &str, default_type: &str) -> OdmResult<Arc<GridFsHandle>> {
        let pooling = self.is_collection_pool_enabled();
        if pooling {
            if let Some(instance) = self.shared.pool.lock().get(prefix) {
                return match instance {
                    PooledInstance::GridFs(handle) => Ok(handle),
                    PooledInstance::Collection(_) => Err(OdmError::type_conformance(format!(
                        "'{}' is pooled as a collection, not a gridfs bucket",
                        prefix
                    ))),
                };
            }
        }

        let handle = Arc::new(self.construct_gridfs(prefix, default_type)?);
        if pooling {
            self.shared
                .pool
                .lock()
                .insert_gridfs(prefix, Arc::clone(&handle));
        }
        Ok(handle)
    }

    fn construct_collection(
        &self,
        name: &str,
        default_type: &str,
    ) -> OdmResult<CollectionHandle> {
        let resolved = self.shared.mapping.read().resolve(name, default_type);
        let registry = self.shared.registry.read();
        let factory = registry.collection_factory(&resolved.type_token)?;
        debug!(collection = name, type_token = %resolved.type_token, "Constructing collection handle");
        factory(CollectionContext {
            database: self.mongodb_handle(),
            name: name.to_string(),
            options: resolved.options,
            match_groups: resolved.match_groups,
        })
    }

    fn construct_gridfs(&self, prefix: &str, default_type: &str) -> OdmResult<GridFsHandle> {
        let resolved = self.shared.mapping.read().resolve(prefix, default_type);
        let registry = self.shared.registry.read();
        let factory = registry.gridfs_factory(&resolved.type_token)?;
        debug!(prefix = prefix, type_token = %resolved.type_token, "Constructing gridfs handle");
        factory(GridFsContext {
            database: self.mongodb_handle(),
            prefix: prefix.to_string(),
            options: resolved.options,
            match_groups: resolved.match_groups,
        })
    }

    /// Evict every pooled instance. Pooling stays enabled.
    pub fn clear_collection_pool(&self) {
        debug!(database = %self.shared.name, "Clearing collection pool");
        self.shared.pool.lock().clear();
    }

    /// Enable instance pooling.
    pub fn enable_collection_pool(&self) {
        self.shared.pool.lock().enable();
    }

    /// Disable instance pooling. Existing entries are retained but no
    /// longer consulted.
    pub fn disable_collection_pool(&self) {
        self.shared.pool.lock().disable();
    }

    /// Whether instance pooling is enabled.
    pub fn is_collection_pool_enabled(&self) -> bool {
        self.shared.pool.lock().is_enabled()
    }

    // ========================================================================
    // Collection creation
    // ========================================================================

    /// Create a collection on the server and return a fresh handle.
    ///
    /// Options from the resolved class definition are merged with the
    /// caller's options, caller options taking precedence. The handle is
    /// never pooled, and a failed server call constructs nothing.
    pub async fn create_collection(
        &self,
        name: &str,
        options: Document,
    ) -> OdmResult<Arc<CollectionHandle>> {
        let default_type = self.shared.default_collection_type.clone();
        let resolved = self.shared.mapping.read().resolve(name, &default_type);
        // Eager conformance check before touching the server.
        self.shared
            .registry
            .read()
            .collection_factory(&resolved.type_token)
            .map(|_| ())?;

        let merged = merge_options(&resolved.options, options);
        let mut command = doc! { "create": name };
        command.extend(merged.clone());
        self.run_command(command).await?;
        info!(collection = name, database = %self.shared.name, "Created collection");

        let registry = self.shared.registry.read();
        let factory = registry.collection_factory(&resolved.type_token)?;
        let handle = factory(CollectionContext {
            database: self.mongodb_handle(),
            name: name.to_string(),
            options: merged,
            match_groups: resolved.match_groups,
        })?;
        Ok(Arc::new(handle))
    }

    /// Create a capped collection. At least one of `size` (bytes) or
    /// `max_elements` must be positive.
    pub async fn create_capped_collection(
        &self,
        name: &str,
        size: u64,
        max_elements: u64,
    ) -> OdmResult<Arc<CollectionHandle>> {
        self.create_collection(name, capped_options(size, max_elements)?)
            .await
    }

    // ========================================================================
    // Administrative pass-through
    // ========================================================================

    /// Run an arbitrary server command.
    pub async fn run_command(&self, command: Document) -> OdmResult<Document> {
        self.run_command_with(command, None).await
    }

    /// Run a server command with explicit selection criteria.
    pub async fn run_command_with(
        &self,
        command: Document,
        selection: Option<SelectionCriteria>,
    ) -> OdmResult<Document> {
        let inner = self.mongodb_handle();
        inner
            .run_command(command, selection)
            .await
            .map_err(OdmError::from_driver)
    }

    /// Execute JavaScript on the server and return its `retval`.
    pub async fn execute_js(&self, code: impl Into<String>, args: Vec<Bson>) -> OdmResult<Bson> {
        let command = doc! { "eval": code.into(), "args": args };
        let reply = self.run_command(command).await?;
        unwrap_eval_reply(reply)
    }

    /// Database statistics (`dbStats`).
    pub async fn stats(&self) -> OdmResult<DatabaseStats> {
        let reply = self.run_command(doc! { "dbStats": 1 }).await?;
        reply.to_struct()
    }

    /// List collection names in this database.
    pub async fn list_collection_names(&self) -> OdmResult<Vec<String>> {
        self.mongodb_handle()
            .list_collection_names(None)
            .await
            .map_err(OdmError::from_driver)
    }

    /// Drop this database on the server.
    pub async fn drop(&self) -> OdmResult<()> {
        info!(database = %self.shared.name, "Dropping database");
        self.mongodb_handle()
            .drop(None)
            .await
            .map_err(OdmError::from_driver)
    }

    // ========================================================================
    // Read preference
    // ========================================================================

    /// The read preference set on this facade, if any.
    pub fn read_preference(&self) -> Option<ReadPreference> {
        self.shared.state.read().read_preference.clone()
    }

    /// Set the read preference relayed to the driver.
    pub fn set_read_preference(&self, preference: ReadPreference) -> OdmResult<()> {
        let criteria = preference.to_criteria()?;
        debug!(mode = preference.mode.as_str(), "Setting read preference");
        let mut state = self.shared.state.write();
        self.rebuild_inner(&mut state, Some(criteria), None);
        state.read_preference = Some(preference);
        Ok(())
    }

    /// Route reads to the primary only.
    pub fn read_primary(&self) -> OdmResult<()> {
        self.set_read_preference(ReadPreference::primary())
    }

    /// Prefer the primary, fall back to secondaries.
    pub fn read_primary_preferred(&self, tag_sets: Vec<TagSet>) -> OdmResult<()> {
        self.set_read_preference(ReadPreference::primary_preferred().with_tag_sets(tag_sets))
    }

    /// Route reads to secondaries only.
    pub fn read_secondary(&self, tag_sets: Vec<TagSet>) -> OdmResult<()> {
        self.set_read_preference(ReadPreference::secondary().with_tag_sets(tag_sets))
    }

    /// Prefer secondaries, fall back to the primary.
    pub fn read_secondary_preferred(&self, tag_sets: Vec<TagSet>) -> OdmResult<()> {
        self.set_read_preference(ReadPreference::secondary_preferred().with_tag_sets(tag_sets))
    }

    /// Route reads to the nearest member.
    pub fn read_nearest(&self, tag_sets: Vec<TagSet>) -> OdmResult<()> {
        self.set_read_preference(ReadPreference::nearest().with_tag_sets(tag_sets))
    }

    // ========================================================================
    // Write concern
    // ========================================================================

    /// The write concern set on this facade, if any.
    pub fn write_concern(&self) -> Option<WriteConcern> {
        self.shared.state.read().write_concern.clone()
    }

    /// Set the write concern relayed to the driver.
    pub fn set_write_concern(&self, concern: WriteConcern) -> OdmResult<()> {
        concern.validate()?;
        let driver = concern.to_driver();
        let mut state = self.shared.state.write();
        self.rebuild_inner(&mut state, None, Some(driver));
        state.write_concern = Some(concern);
        Ok(())
    }

    /// Shortcut for unacknowledged writes (level 0).
    pub fn set_unacknowledged_write_concern(
        &self,
        timeout: impl Into<Option<Duration>>,
    ) -> OdmResult<()> {
        let mut concern = WriteConcern::unacknowledged();
        if let Some(timeout) = timeout.into() {
            concern = concern.with_timeout(timeout);
        }
        self.set_write_concern(concern)
    }

    /// Shortcut for majority-acknowledged writes.
    pub fn set_majority_write_concern(
        &self,
        timeout: impl Into<Option<Duration>>,
    ) -> OdmResult<()> {
        let mut concern = WriteConcern::majority();
        if let Some(timeout) = timeout.into() {
            concern = concern.with_timeout(timeout);
        }
        self.set_write_concern(concern)
    }

    fn rebuild_inner(
        &self,
        state: &mut DatabaseState,
        selection: Option<SelectionCriteria>,
        concern: Option<mongodb::options::WriteConcern>,
    ) {
        let mut options = DatabaseOptions::default();
        options.selection_criteria = selection.or_else(|| state.inner.selection_criteria().cloned());
        options.write_concern = concern.or_else(|| state.inner.write_concern().cloned());
        options.read_concern = state.inner.read_concern().cloned();
        state.inner = self
            .shared
            .client
            .database_with_options(&self.shared.name, options);
    }

    // ========================================================================
    // Profiler
    // ========================================================================

    /// Set the profiler level, optionally updating the slow-query
    /// threshold in milliseconds.
    pub async fn set_profiler_level(
        &self,
        level: ProfilerLevel,
        slow_ms: impl Into<Option<i32>>,
    ) -> OdmResult<()> {
        let mut command = doc! { "profile": level.as_i32() };
        if let Some(threshold) = slow_ms.into() {
            command.insert("slowms", threshold);
        }
        self.run_command(command).await?;
        Ok(())
    }

    /// Current profiler level and slow-query threshold.
    pub async fn profiler_status(&self) -> OdmResult<ProfilerStatus> {
        let reply = self.run_command(doc! { "profile": -1 }).await?;
        ProfilerStatus::from_reply(&reply)
    }

    /// Current profiler level.
    pub async fn profiler_level(&self) -> OdmResult<ProfilerLevel> {
        Ok(self.profiler_status().await?.level)
    }

    /// Current slow-query threshold in milliseconds.
    pub async fn profiler_slow_ms(&self) -> OdmResult<i32> {
        Ok(self.profiler_status().await?.slow_ms)
    }

    /// Turn profiling off.
    pub async fn disable_profiler(&self) -> OdmResult<()> {
        self.set_profiler_level(ProfilerLevel::Off, None).await
    }

    /// Profile only operations slower than `slow_ms` milliseconds.
    pub async fn profile_slow_queries(&self, slow_ms: i32) -> OdmResult<()> {
        self.set_profiler_level(ProfilerLevel::SlowOnly, slow_ms).await
    }

    /// Profile every operation.
    pub async fn profile_all_queries(&self) -> OdmResult<()> {
        self.set_profiler_level(ProfilerLevel::All, None).await
    }
}

/// A `dbStats` reply.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatabaseStats {
    /// Database name.
    pub db: String,
    /// Number of collections.
    pub collections: i64,
    /// Number of views.
    pub views: i64,
    /// Number of documents.
    pub objects: i64,
    /// Average document size in bytes.
    pub avg_obj_size: f64,
    /// Total uncompressed data size in bytes.
    pub data_size: f64,
    /// Allocated storage in bytes.
    pub storage_size: f64,
    /// Number of indexes.
    pub indexes: i64,
    /// Total index size in bytes.
    pub index_size: f64,
}

/// Profiler level and slow-query threshold as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfilerStatus {
    /// Current level.
    pub level: ProfilerLevel,
    /// Slow-query threshold in milliseconds.
    pub slow_ms: i32,
}

impl ProfilerStatus {
    fn from_reply(reply: &Document) -> OdmResult<Self> {
        let was = reply.expect_i32("was")?;
        let level = ProfilerLevel::from_i32(was)
            .ok_or_else(|| OdmError::reply(format!("unknown profiler level {}", was)))?;
        let slow_ms = reply.expect_i32("slowms")?;
        Ok(Self { level, slow_ms })
    }
}

fn merge_options(resolved: &Document, caller: Document) -> Document {
    let mut merged = resolved.clone();
    for (key, value) in caller {
        merged.insert(key, value);
    }
    merged
}

fn capped_options(size: u64, max_elements: u64) -> OdmResult<Document> {
    if size == 0 && max_elements == 0 {
        return Err(OdmError::configuration(
            "a capped collection needs a positive size or element limit",
        ));
    }
    let mut options = doc! { "capped": true };
    if size > 0 {
        options.insert("size", size as i64);
    }
    if max_elements > 0 {
        options.insert("max", max_elements as i64);
    }
    Ok(options)
}

fn command_ok(reply: &Document) -> bool {
    reply.numeric("ok") == Some(1.0)
}

fn unwrap_eval_reply(reply: Document) -> OdmResult<Bson> {
    if command_ok(&reply) {
        return Ok(reply.get("retval").cloned().unwrap_or(Bson::Null));
    }
    let code = reply.expect_i32("code").unwrap_or(0);
    let message = reply
        .expect_str("errmsg")
        .unwrap_or("server script failed")
        .to_string();
    Err(OdmError::command(code, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_options_caller_wins() {
        let resolved = doc! { "capped": true, "size": 1024_i64 };
        let merged = merge_options(&resolved, doc! { "size": 4096_i64, "max": 100_i64 });
        assert_eq!(
            merged,
            doc! { "capped": true, "size": 4096_i64, "max": 100_i64 }
        );
    }

    #[test]
    fn test_capped_options_requires_a_positive_bound() {
        let err = capped_options(0, 0).unwrap_err();
        assert!(err.is_configuration());

        let options = capped_options(0, 1024).unwrap();
        assert_eq!(options, doc! { "capped": true, "max": 1024_i64 });

        let options = capped_options(2048, 0).unwrap();
        assert_eq!(options, doc! { "capped": true, "size": 2048_i64 });
    }

    #[test]
    fn test_unwrap_eval_reply_success() {
        let reply = doc! { "ok": 1.0, "retval": 42_i32 };
        assert_eq!(unwrap_eval_reply(reply).unwrap(), Bson::Int32(42));
    }

    #[test]
    fn test_unwrap_eval_reply_null_retval() {
        let reply = doc! { "ok": 1.0 };
        assert_eq!(unwrap_eval_reply(reply).unwrap(), Bson::Null);
    }

    #[test]
    fn test_unwrap_eval_reply_failure_carries_code_and_message() {
        let reply = doc! { "ok": 0.0, "code": 11_i32, "errmsg": "boom" };
        match unwrap_eval_reply(reply).unwrap_err() {
            OdmError::Command { code, message } => {
                assert_eq!(code, 11);
                assert_eq!(message, "boom");
            }
            other => panic!("expected command error, got {:?}", other),
        }
    }

    #[test]
    fn test_command_ok_accepts_integer_ok() {
        assert!(command_ok(&doc! { "ok": 1_i32 }));
        assert!(command_ok(&doc! { "ok": 1.0 }));
        assert!(!command_ok(&doc! { "ok": 0.0 }));
        assert!(!command_ok(&doc! {}));
    }

    #[test]
    fn test_profiler_status_from_reply() {
        let reply = doc! { "was": 1_i32, "slowms": 150_i32, "ok": 1.0 };
        let status = ProfilerStatus::from_reply(&reply).unwrap();
        assert_eq!(status.level, ProfilerLevel::SlowOnly);
        assert_eq!(status.slow_ms, 150);

        let reply = doc! { "was": 9_i32, "slowms": 100_i32 };
        assert!(ProfilerStatus::from_reply(&reply).is_err());
    }
}
