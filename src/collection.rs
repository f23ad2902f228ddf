//! Collection handles.

use bson::Document;

use crate::error::{OdmError, OdmResult};

/// Everything a collection constructor receives: the driver-level database
/// back-reference plus the resolved name, options, and regex captures.
#[derive(Debug, Clone)]
pub struct CollectionContext {
    /// Driver-level database the instance is bound to.
    pub database: mongodb::Database,
    /// Resolved collection name.
    pub name: String,
    /// Options carried over from the matched class definition.
    pub options: Document,
    /// Capture groups from a regex mapping, empty otherwise.
    pub match_groups: Vec<String>,
}

/// A typed handle to one collection.
///
/// The handle owns no connection of its own; it holds the driver database
/// it was resolved against and the name/options it was constructed with.
#[derive(Debug, Clone)]
pub struct CollectionHandle {
    database: mongodb::Database,
    name: String,
    options: Document,
    match_groups: Vec<String>,
    inner: mongodb::Collection<Document>,
}

impl CollectionHandle {
    /// Construct a handle from a resolution context. This is the default
    /// constructor registered under the `"collection"` token.
    pub fn from_context(ctx: CollectionContext) -> Self {
        let inner = ctx.database.collection(&ctx.name);
        Self {
            database: ctx.database,
            name: ctx.name,
            options: ctx.options,
            match_groups: ctx.match_groups,
            inner,
        }
    }

    /// The collection name the handle was constructed under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Options resolved from the class mapping.
    pub fn options(&self) -> &Document {
        &self.options
    }

    /// Regex capture groups from the mapping that matched, if any.
    pub fn match_groups(&self) -> &[String] {
        &self.match_groups
    }

    /// The raw driver collection.
    pub fn raw(&self) -> &mongodb::Collection<Document> {
        &self.inner
    }

    /// A driver collection deserializing into `T` instead of raw documents.
    pub fn typed<T>(&self) -> mongodb::Collection<T>
    where
        T: Send + Sync,
    {
        self.database.collection(&self.name)
    }

    /// The driver database this handle is bound to.
    pub fn database(&self) -> &mongodb::Database {
        &self.database
    }

    /// Drop the collection on the server.
    pub async fn drop(&self) -> OdmResult<()> {
        self.inner.drop(None).await.map_err(OdmError::from_driver)
    }
}
