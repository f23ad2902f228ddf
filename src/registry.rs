//! The type-token constructor table.
//!
//! Resolved class tokens are looked up here instead of instantiated by
//! name: every usable token is registered with a constructor at startup,
//! and resolution fails eagerly for tokens nobody registered.

use std::collections::HashMap;

use crate::collection::{CollectionContext, CollectionHandle};
use crate::error::{OdmError, OdmResult};
use crate::gridfs::{GridFsContext, GridFsHandle};

/// Token the built-in collection constructor is registered under.
pub const DEFAULT_COLLECTION_TYPE: &str = "collection";

/// Token the built-in GridFS constructor is registered under.
pub const DEFAULT_GRIDFS_TYPE: &str = "gridfs";

/// Constructor for collection instances.
pub type CollectionFactory =
    Box<dyn Fn(CollectionContext) -> OdmResult<CollectionHandle> + Send + Sync>;

/// Constructor for GridFS instances.
pub type GridFsFactory = Box<dyn Fn(GridFsContext) -> OdmResult<GridFsHandle> + Send + Sync>;

enum Registration {
    Collection(CollectionFactory),
    GridFs(GridFsFactory),
}

impl Registration {
    fn contract_name(&self) -> &'static str {
        match self {
            Self::Collection(_) => "collection",
            Self::GridFs(_) => "gridfs",
        }
    }
}

/// Token-to-constructor table.
pub struct TypeRegistry {
    entries: HashMap<String, Registration>,
}

impl TypeRegistry {
    /// Create a registry pre-populated with the built-in constructors
    /// under [`DEFAULT_COLLECTION_TYPE`] and [`DEFAULT_GRIDFS_TYPE`].
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            entries: HashMap::new(),
        };
        registry.register_collection(DEFAULT_COLLECTION_TYPE, |ctx| {
            Ok(CollectionHandle::from_context(ctx))
        });
        registry.register_gridfs(DEFAULT_GRIDFS_TYPE, GridFsHandle::from_context);
        registry
    }

    /// Register a collection constructor under a type token. An existing
    /// registration for the token is replaced.
    pub fn register_collection<F>(&mut self, token: impl Into<String>, factory: F)
    where
        F: Fn(CollectionContext) -> OdmResult<CollectionHandle> + Send + Sync + 'static,
    {
        self.entries
            .insert(token.into(), Registration::Collection(Box::new(factory)));
    }

    /// Register a GridFS constructor under a type token.
    pub fn register_gridfs<F>(&mut self, token: impl Into<String>, factory: F)
    where
        F: Fn(GridFsContext) -> OdmResult<GridFsHandle> + Send + Sync + 'static,
    {
        self.entries
            .insert(token.into(), Registration::GridFs(Box::new(factory)));
    }

    /// Check whether a token is registered at all.
    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    /// Look up the collection constructor for a token.
    ///
    /// Fails with a resolution error for unknown tokens and a conformance
    /// error for tokens registered under the GridFS contract.
    pub fn collection_factory(&self, token: &str) -> OdmResult<&CollectionFactory> {
        match self.entries.get(token) {
            Some(Registration::Collection(factory)) => Ok(factory),
            Some(other) => Err(OdmError::type_conformance(format!(
                "type '{}' is registered as {}, not as a collection",
                token,
                other.contract_name()
            ))),
            None => Err(OdmError::type_resolution(format!(
                "no constructor registered for type '{}'",
                token
            ))),
        }
    }

    /// Look up the GridFS constructor for a token.
    pub fn gridfs_factory(&self, token: &str) -> OdmResult<&GridFsFactory> {
        match self.entries.get(token) {
            Some(Registration::GridFs(factory)) => Ok(factory),
            Some(other) => Err(OdmError::type_conformance(format!(
                "type '{}' is registered as {}, not as gridfs",
                token,
                other.contract_name()
            ))),
            None => Err(OdmError::type_resolution(format!(
                "no constructor registered for type '{}'",
                token
            ))),
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
