//! Connection configuration.
//!
//! The connection URL and [`ConnectOptions`] are handed to the backend builder untouched.
//! Both can be read from JSON with [`StoreConfig`]:
//!
//! ```ignore
//! let config = StoreConfig::from_json_str(r#"{
//!     "url": "mongodb://localhost:27017",
//!     "database": "app",
//!     "max_pool_size": 20
//! }"#)?;
//! store.connect_with(&config).await?;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Options passed through to the backend when connecting.
///
/// Every field is optional; backends ignore the ones they have no use for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    /// Database to operate on. Backends may fall back to one named in the URL.
    pub database: Option<String>,
    /// Application name reported to the server.
    pub app_name: Option<String>,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
    pub connect_timeout_ms: Option<u64>,
    pub server_selection_timeout_ms: Option<u64>,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn with_max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn server_selection_timeout(&self) -> Option<Duration> {
        self.server_selection_timeout_ms.map(Duration::from_millis)
    }
}

/// A connection URL together with its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    #[serde(flatten)]
    pub options: ConnectOptions,
}

impl StoreConfig {
    pub fn new(url: impl Into<String>, options: ConnectOptions) -> Self {
        Self { url: url.into(), options }
    }

    pub fn from_json_str(json: &str) -> DocumentStoreResult<Self> {
        serde_json::from_str(json).map_err(|e| DocumentStoreError::Configuration(e.to_string()))
    }

    pub fn from_json_value(value: Value) -> DocumentStoreResult<Self> {
        serde_json::from_value(value).map_err(|e| DocumentStoreError::Configuration(e.to_string()))
    }
}
