//! # mongrove
//!
//! An object-document mapping facade over the official MongoDB driver.
//!
//! This crate provides:
//! - A database facade that maps collection names to registered handle
//!   types via exact, regex, and namespace-prefix rules
//! - Lazy pooling of resolved collection and GridFS instances
//! - A constructor registry keyed by type token (no reflection)
//! - Administrative pass-through: server commands, server-side scripts,
//!   read preference, write concern, statistics, and profiler control
//!
//! The wire protocol, BSON encoding, and replica routing all stay in the
//! driver; this layer resolves, constructs, pools, and forwards.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mongrove::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .uri("mongodb://localhost:27017")
//!         .database("app")
//!         .build()
//!         .await?;
//!
//!     let db = client.default_database()?;
//!
//!     // Map names to registered types; a leading '/' marks a pattern.
//!     db.register_collection_type("app.Log", |ctx| {
//!         Ok(CollectionHandle::from_context(ctx))
//!     });
//!     db.map("/^logs\\./", "app.Log")?;
//!
//!     // Resolved instances are pooled: both calls share one handle.
//!     let logs = db.collection("logs.2024")?;
//!     let same = db.collection("logs.2024")?;
//!     assert!(std::sync::Arc::ptr_eq(&logs, &same));
//!
//!     db.set_majority_write_concern(std::time::Duration::from_secs(5))?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod collection;
pub mod concern;
pub mod config;
pub mod database;
pub mod document;
pub mod error;
pub mod gridfs;
pub mod mapping;
pub mod pool;
pub mod registry;

pub use bson::{Bson, Document, doc};
pub use client::{Client, ClientBuilder};
pub use collection::{CollectionContext, CollectionHandle};
pub use concern::{AckLevel, ProfilerLevel, ReadMode, ReadPreference, TagSet, WriteConcern};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use database::{DEFAULT_GRIDFS_PREFIX, Database, DatabaseStats, ProfilerStatus};
pub use error::{OdmError, OdmResult};
pub use gridfs::{GridFsContext, GridFsHandle};
pub use mapping::{ClassDefinition, ClassMap, ResolvedClass};
pub use pool::{CollectionPool, PooledInstance};
pub use registry::{DEFAULT_COLLECTION_TYPE, DEFAULT_GRIDFS_TYPE, TypeRegistry};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::{Client, ClientBuilder};
    pub use crate::collection::{CollectionContext, CollectionHandle};
    pub use crate::concern::{
        AckLevel, ProfilerLevel, ReadMode, ReadPreference, TagSet, WriteConcern,
    };
    pub use crate::config::{ClientConfig, ClientConfigBuilder};
    pub use crate::database::{DEFAULT_GRIDFS_PREFIX, Database, DatabaseStats, ProfilerStatus};
    pub use crate::document::DocumentExt;
    pub use crate::error::{OdmError, OdmResult};
    pub use crate::gridfs::{GridFsContext, GridFsHandle};
    pub use crate::mapping::{ClassDefinition, ClassMap, ResolvedClass};
    pub use crate::registry::{DEFAULT_COLLECTION_TYPE, DEFAULT_GRIDFS_TYPE, TypeRegistry};
    pub use bson::{Bson, Document, doc};
}
