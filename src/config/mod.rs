mod defaults;
mod env;
mod raw;
mod serde;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::Result;
use crate::zbx_client::{ClientBuilder, FileSessionCache, default_http_client};

use self::serde::HumantimeDuration;

/// Default location of the optional TOML configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "zbxapi.toml";

/// Validated connection settings for a Zabbix server.
#[derive(Debug, Clone)]
pub struct Config {
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    /// Allow plain `http://` endpoints.
    pub insecure: bool,
    pub http_request_timeout: Duration,
    pub http_connect_timeout: Duration,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub path: PathBuf,
    pub lifetime: Duration,
}

impl Config {
    /// Load `path` if it exists, then `ZBXAPI__*` variables, then the flat
    /// `ZBX_*` overrides.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::ConfigError`] when a source cannot be read or
    /// a required field is missing or invalid.
    pub fn from_env_and_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut raw = raw::load(path.as_ref())?;
        raw.apply_env_overrides()?;
        raw.validate_and_build()
    }

    /// Build a [`ClientBuilder`] carrying these credentials, timeouts and
    /// cache settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn client_builder(&self) -> Result<ClientBuilder> {
        let http = default_http_client(
            self.http_request_timeout,
            self.http_connect_timeout,
            !self.insecure,
        )?;
        let mut builder = ClientBuilder::new(self.url.as_str())
            .with_credentials(self.username.clone(), self.password.clone())
            .with_http_client(http)
            .require_https(!self.insecure);
        if self.cache.enabled {
            builder = builder.with_cache(Arc::new(self.file_cache()));
        }
        Ok(builder)
    }

    /// The file cache these settings describe, whether or not it is enabled.
    pub fn file_cache(&self) -> FileSessionCache {
        FileSessionCache::new()
            .with_path(self.cache.path.clone())
            .with_lifetime(self.cache.lifetime)
    }
}
