//! GridFS bucket handles.
//!
//! Chunk and file mechanics stay in the driver; the handle only resolves
//! the prefix, applies construction options, and exposes the bucket.

use bson::Document;
use mongodb::gridfs::GridFsBucket;
use mongodb::options::GridFsBucketOptions;

use crate::document::DocumentExt;
use crate::error::OdmResult;

/// Everything a GridFS constructor receives.
#[derive(Debug, Clone)]
pub struct GridFsContext {
    /// Driver-level database the bucket is bound to.
    pub database: mongodb::Database,
    /// Bucket prefix, `"fs"` by default.
    pub prefix: String,
    /// Options carried over from the matched class definition.
    pub options: Document,
    /// Capture groups from a regex mapping, empty otherwise.
    pub match_groups: Vec<String>,
}

/// A handle to one GridFS bucket.
#[derive(Clone)]
pub struct GridFsHandle {
    database: mongodb::Database,
    prefix: String,
    options: Document,
    match_groups: Vec<String>,
    bucket: GridFsBucket,
}

impl GridFsHandle {
    /// Construct a handle from a resolution context. This is the default
    /// constructor registered under the `"gridfs"` token.
    ///
    /// A `chunkSizeBytes` entry in the class options is forwarded to the
    /// bucket; everything else rides along for custom constructors.
    pub fn from_context(ctx: GridFsContext) -> OdmResult<Self> {
        let mut bucket_options = GridFsBucketOptions::default();
        bucket_options.bucket_name = Some(ctx.prefix.clone());
        if let Ok(chunk_size) = ctx.options.expect_i32("chunkSizeBytes") {
            bucket_options.chunk_size_bytes = Some(chunk_size as u32);
        }

        let bucket = ctx.database.gridfs_bucket(bucket_options);
        Ok(Self {
            database: ctx.database,
            prefix: ctx.prefix,
            options: ctx.options,
            match_groups: ctx.match_groups,
            bucket,
        })
    }

    /// The bucket prefix the handle was constructed under.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Options resolved from the class mapping.
    pub fn options(&self) -> &Document {
        &self.options
    }

    /// Regex capture groups from the mapping that matched, if any.
    pub fn match_groups(&self) -> &[String] {
        &self.match_groups
    }

    /// The driver bucket.
    pub fn bucket(&self) -> &GridFsBucket {
        &self.bucket
    }

    /// The driver database this handle is bound to.
    pub fn database(&self) -> &mongodb::Database {
        &self.database
    }

    /// Name of the files metadata collection backing the bucket.
    pub fn files_collection_name(&self) -> String {
        format!("{}.files", self.prefix)
    }

    /// Name of the chunks collection backing the bucket.
    pub fn chunks_collection_name(&self) -> String {
        format!("{}.chunks", self.prefix)
    }
}
