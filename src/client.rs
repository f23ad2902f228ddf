//! Client wrapper and database facade factory.

use std::sync::Arc;

use bson::doc;
use tracing::info;

use crate::config::{ClientConfig, ClientConfigBuilder};
use crate::database::Database;
use crate::error::{OdmError, OdmResult};

/// A MongoDB client.
///
/// The driver handles connection pooling internally; this wrapper carries
/// the configuration and issues [`Database`] facades.
#[derive(Clone)]
pub struct Client {
    inner: mongodb::Client,
    config: Arc<ClientConfig>,
}

impl Client {
    /// Create a client from configuration. The driver connects lazily,
    /// so this does not touch the network.
    pub async fn connect(config: ClientConfig) -> OdmResult<Self> {
        let options = config.to_client_options().await?;

        let inner = mongodb::Client::with_options(options)
            .map_err(|e| OdmError::connection(format!("failed to create client: {}", e)))?;

        info!(uri = %config.uri, "MongoDB client created");

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// Create a builder for the client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get a database facade by name. Client-wide read preference and
    /// write concern carry over to the facade.
    pub fn database(&self, name: &str) -> Database {
        Database::with_initial_concerns(
            self.inner.clone(),
            name,
            self.config.read_preference.clone(),
            self.config.write_concern.clone(),
        )
    }

    /// Get the facade for the configured default database.
    pub fn default_database(&self) -> OdmResult<Database> {
        let name = self
            .config
            .database
            .as_deref()
            .ok_or_else(|| OdmError::configuration("no default database configured"))?;
        Ok(self.database(name))
    }

    /// The underlying driver client.
    pub fn inner(&self) -> &mongodb::Client {
        &self.inner
    }

    /// The configuration the client was created with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Check if the server is reachable by pinging it.
    pub async fn is_healthy(&self) -> bool {
        self.inner
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .is_ok()
    }

    /// List all database names on the server.
    pub async fn list_database_names(&self) -> OdmResult<Vec<String>> {
        self.inner
            .list_database_names(None, None)
            .await
            .map_err(OdmError::from_driver)
    }
}

/// Builder for [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfigBuilder,
}

impl ClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the MongoDB URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.config = self.config.uri(uri);
        self
    }

    /// Set the default database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config = self.config.database(database);
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.app_name(name);
        self
    }

    /// Set the maximum driver pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.config = self.config.max_pool_size(size);
        self
    }

    /// Set the minimum driver pool size.
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.config = self.config.min_pool_size(size);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: std::time::Duration) -> Self {
        self.config = self.config.connect_timeout(duration);
        self
    }

    /// Set the client-wide read preference.
    pub fn read_preference(mut self, preference: crate::concern::ReadPreference) -> Self {
        self.config = self.config.read_preference(preference);
        self
    }

    /// Set the client-wide write concern.
    pub fn write_concern(mut self, concern: crate::concern::WriteConcern) -> Self {
        self.config = self.config.write_concern(concern);
        self
    }

    /// Enable direct connection (bypass replica set discovery).
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.config = self.config.direct_connection(enabled);
        self
    }

    /// Build the client.
    pub async fn build(self) -> OdmResult<Client> {
        Client::connect(self.config.build()).await
    }
}
