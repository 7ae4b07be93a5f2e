use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_with::serde_as;
use url::Url;

use crate::Result;
use crate::error::ConfigError;

use super::defaults::{
    default_cache_enabled, default_cache_path, default_connect_timeout, default_request_timeout,
    default_session_lifetime,
};
use super::env::{env_bool, env_duration, env_string};
use super::{CacheSettings, Config, HumantimeDuration};

pub(super) fn load(path: impl AsRef<Path>) -> std::result::Result<RawConfig, ConfigError> {
    let mut builder = ::config::Config::builder();
    let path = path.as_ref();
    builder = builder.add_source(::config::File::from(path).required(false));
    builder = builder.add_source(
        ::config::Environment::with_prefix("ZBXAPI")
            .separator("__")
            .try_parsing(true),
    );

    builder
        .build()
        .map_err(|err| ConfigError::Other(err.to_string()))?
        .try_deserialize()
        .map_err(|err| ConfigError::Parse(err.to_string()))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawConfig {
    #[serde(default)]
    zabbix: RawZabbix,
    #[serde(default)]
    http: RawHttp,
    #[serde(default)]
    cache: RawCache,
}

#[derive(Debug, Default, Deserialize)]
struct RawZabbix {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    #[serde(default)]
    insecure: bool,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct RawHttp {
    #[serde(default = "default_request_timeout")]
    #[serde_as(as = "HumantimeDuration")]
    request_timeout: Duration,
    #[serde(default = "default_connect_timeout")]
    #[serde_as(as = "HumantimeDuration")]
    connect_timeout: Duration,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct RawCache {
    #[serde(default = "default_cache_enabled")]
    enabled: bool,
    #[serde(default = "default_cache_path")]
    path: PathBuf,
    #[serde(default = "default_session_lifetime")]
    #[serde_as(as = "HumantimeDuration")]
    lifetime: Duration,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl Default for RawCache {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            path: default_cache_path(),
            lifetime: default_session_lifetime(),
        }
    }
}

impl RawConfig {
    pub(super) fn apply_env_overrides(&mut self) -> std::result::Result<(), ConfigError> {
        if let Some(url) = env_string("ZBX_URL")? {
            self.zabbix.url = Some(url);
        }
        if let Some(username) = env_string("ZBX_USERNAME")? {
            self.zabbix.username = Some(username);
        }
        if let Some(password) = env_string("ZBX_PASSWORD")? {
            self.zabbix.password = Some(password);
        }
        if let Some(insecure) = env_bool("ZBX_INSECURE")? {
            self.zabbix.insecure = insecure;
        }
        if let Some(timeout) = env_duration("ZBX_TIMEOUT")? {
            self.http.request_timeout = timeout;
        }
        if let Some(timeout) = env_duration("ZBX_CONNECT_TIMEOUT")? {
            self.http.connect_timeout = timeout;
        }
        // empty disables the cache, anything else is its path
        if let Some(path) = env_string("ZBX_SESSION_CACHE")? {
            let path = path.trim();
            self.cache.enabled = !path.is_empty();
            if !path.is_empty() {
                self.cache.path = PathBuf::from(path);
            }
        }
        if let Some(lifetime) = env_duration("ZBX_SESSION_LIFETIME")? {
            self.cache.lifetime = lifetime;
        }
        Ok(())
    }

    pub(super) fn validate_and_build(self) -> Result<Config> {
        let url_str = self.zabbix.url.ok_or(ConfigError::MissingField {
            field: "zabbix.url",
        })?;
        let url = Url::parse(url_str.trim()).map_err(|err| ConfigError::InvalidField {
            field: "zabbix.url",
            message: err.to_string(),
        })?;
        if !self.zabbix.insecure && url.scheme() != "https" {
            return Err(ConfigError::InvalidField {
                field: "zabbix.url",
                message: format!(
                    "scheme `{}` is not https; set zabbix.insecure to allow it",
                    url.scheme()
                ),
            }
            .into());
        }

        let username = self.zabbix.username.ok_or(ConfigError::MissingField {
            field: "zabbix.username",
        })?;
        if username.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "zabbix.username",
                message: "username cannot be empty".to_string(),
            }
            .into());
        }
        let password = self.zabbix.password.ok_or(ConfigError::MissingField {
            field: "zabbix.password",
        })?;

        for (field, value) in [
            ("http.request_timeout", self.http.request_timeout),
            ("http.connect_timeout", self.http.connect_timeout),
            ("cache.lifetime", self.cache.lifetime),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidField {
                    field,
                    message: "duration must be greater than zero".to_string(),
                }
                .into());
            }
        }

        Ok(Config {
            url,
            username: username.trim().to_string(),
            password: password.into(),
            insecure: self.zabbix.insecure,
            http_request_timeout: self.http.request_timeout,
            http_connect_timeout: self.http.connect_timeout,
            cache: CacheSettings {
                enabled: self.cache.enabled,
                path: self.cache.path,
                lifetime: self.cache.lifetime,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::Duration;

    use secrecy::ExposeSecret;

    use super::{RawConfig, load};
    use crate::error::{ConfigError, Error};

    fn from_toml(body: &str) -> RawConfig {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        load(file.path()).unwrap()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let raw = load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(raw.http.request_timeout, Duration::from_secs(10));
        assert_eq!(raw.http.connect_timeout, Duration::from_secs(5));
        assert!(raw.cache.enabled);
        assert_eq!(raw.cache.path, PathBuf::from("./zabbix_session"));
        assert_eq!(raw.cache.lifetime, Duration::from_secs(4 * 3600));
    }

    #[test]
    fn builds_config_from_file() {
        let raw = from_toml(
            r#"
            [zabbix]
            url = "https://zabbix.example.com/api_jsonrpc.php"
            username = " Admin "
            password = "zabbix"

            [http]
            request_timeout = "30s"

            [cache]
            enabled = false
            lifetime = "1h 30m"
            "#,
        );
        let config = raw.validate_and_build().unwrap();
        assert_eq!(config.url.host_str(), Some("zabbix.example.com"));
        assert_eq!(config.username, "Admin");
        assert_eq!(config.password.expose_secret(), "zabbix");
        assert_eq!(config.http_request_timeout, Duration::from_secs(30));
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.lifetime, Duration::from_secs(5400));
    }

    #[test]
    fn requires_url_and_username() {
        let err = RawConfig::default().validate_and_build().unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingField { field: "zabbix.url" })
        ));

        let raw = from_toml("[zabbix]\nurl = \"https://zbx.local/api_jsonrpc.php\"\n");
        assert!(matches!(
            raw.validate_and_build().unwrap_err(),
            Error::Config(ConfigError::MissingField { field: "zabbix.username" })
        ));
    }

    #[test]
    fn plain_http_needs_insecure_flag() {
        let body = "[zabbix]\nurl = \"http://zbx.local/api_jsonrpc.php\"\nusername = \"Admin\"\npassword = \"x\"\n";
        assert!(matches!(
            from_toml(body).validate_and_build().unwrap_err(),
            Error::Config(ConfigError::InvalidField { field: "zabbix.url", .. })
        ));

        let config = from_toml(&format!("{body}insecure = true\n"))
            .validate_and_build()
            .unwrap();
        assert!(config.insecure);
    }

    #[test]
    fn zero_durations_are_rejected() {
        let raw = from_toml(
            "[zabbix]\nurl = \"https://zbx.local/\"\nusername = \"Admin\"\npassword = \"x\"\n[cache]\nlifetime = \"0s\"\n",
        );
        assert!(matches!(
            raw.validate_and_build().unwrap_err(),
            Error::Config(ConfigError::InvalidField { field: "cache.lifetime", .. })
        ));
    }

    #[test]
    fn unparseable_duration_is_a_parse_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[http]\nconnect_timeout = \"soon\"\n").unwrap();
        assert!(matches!(load(file.path()), Err(ConfigError::Parse(_))));
    }
}
