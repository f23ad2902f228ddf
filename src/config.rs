//! Client connection configuration.

use std::time::Duration;

use mongodb::options::ClientOptions;

use crate::concern::{ReadPreference, WriteConcern};
use crate::error::{OdmError, OdmResult};

/// Connection configuration for a [`Client`](crate::client::Client).
///
/// Only the URI is required; everything else falls back to driver
/// defaults. There is no file- or environment-based configuration at
/// this layer.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// MongoDB connection URI.
    pub uri: String,
    /// Default database name for [`Client::default_database`](crate::client::Client::default_database).
    pub database: Option<String>,
    /// Application name (shown in server logs).
    pub app_name: Option<String>,
    /// Minimum driver connection pool size.
    pub min_pool_size: Option<u32>,
    /// Maximum driver connection pool size.
    pub max_pool_size: Option<u32>,
    /// Maximum idle time for driver connections.
    pub max_idle_time: Option<Duration>,
    /// Connection timeout.
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout.
    pub server_selection_timeout: Option<Duration>,
    /// Client-wide read preference.
    pub read_preference: Option<ReadPreference>,
    /// Client-wide write concern.
    pub write_concern: Option<WriteConcern>,
    /// Direct connection (bypass replica set discovery).
    pub direct_connection: Option<bool>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: None,
            app_name: Some("mongrove".to_string()),
            min_pool_size: None,
            max_pool_size: Some(10),
            max_idle_time: Some(Duration::from_secs(300)),
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            read_preference: None,
            write_concern: None,
            direct_connection: None,
        }
    }
}

impl ClientConfig {
    /// Create a configuration from a MongoDB URI.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Create a builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Convert to driver client options.
    pub async fn to_client_options(&self) -> OdmResult<ClientOptions> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| OdmError::configuration(format!("failed to parse URI: {}", e)))?;

        if let Some(ref app_name) = self.app_name {
            options.app_name = Some(app_name.clone());
        }

        if let Some(min_pool) = self.min_pool_size {
            options.min_pool_size = Some(min_pool);
        }

        if let Some(max_pool) = self.max_pool_size {
            options.max_pool_size = Some(max_pool);
        }

        if let Some(max_idle) = self.max_idle_time {
            options.max_idle_time = Some(max_idle);
        }

        if let Some(connect_timeout) = self.connect_timeout {
            options.connect_timeout = Some(connect_timeout);
        }

        if let Some(selection_timeout) = self.server_selection_timeout {
            options.server_selection_timeout = Some(selection_timeout);
        }

        if let Some(ref preference) = self.read_preference {
            options.selection_criteria = Some(preference.to_criteria()?);
        }

        if let Some(ref concern) = self.write_concern {
            concern.validate()?;
            options.write_concern = Some(concern.to_driver());
        }

        if let Some(direct) = self.direct_connection {
            options.direct_connection = Some(direct);
        }

        Ok(options)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    min_pool_size: Option<u32>,
    max_pool_size: Option<u32>,
    max_idle_time: Option<Duration>,
    connect_timeout: Option<Duration>,
    server_selection_timeout: Option<Duration>,
    read_preference: Option<ReadPreference>,
    write_concern: Option<WriteConcern>,
    direct_connection: Option<bool>,
}

impl ClientConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the MongoDB URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the default database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the minimum driver pool size.
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = Some(size);
        self
    }

    /// Set the maximum driver pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Set the maximum idle time for driver connections.
    pub fn max_idle_time(mut self, duration: Duration) -> Self {
        self.max_idle_time = Some(duration);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Set the server selection timeout.
    pub fn server_selection_timeout(mut self, duration: Duration) -> Self {
        self.server_selection_timeout = Some(duration);
        self
    }

    /// Set the client-wide read preference.
    pub fn read_preference(mut self, preference: ReadPreference) -> Self {
        self.read_preference = Some(preference);
        self
    }

    /// Set the client-wide write concern.
    pub fn write_concern(mut self, concern: WriteConcern) -> Self {
        self.write_concern = Some(concern);
        self
    }

    /// Enable direct connection (bypass replica set discovery).
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            uri: self.uri.unwrap_or(defaults.uri),
            database: self.database,
            app_name: self.app_name.or(defaults.app_name),
            min_pool_size: self.min_pool_size,
            max_pool_size: self.max_pool_size.or(defaults.max_pool_size),
            max_idle_time: self.max_idle_time.or(defaults.max_idle_time),
            connect_timeout: self.connect_timeout.or(defaults.connect_timeout),
            server_selection_timeout: self
                .server_selection_timeout
                .or(defaults.server_selection_timeout),
            read_preference: self.read_preference,
            write_concern: self.write_concern,
            direct_connection: self.direct_connection,
        }
    }
}
