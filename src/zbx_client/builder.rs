use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tracing::{debug, warn};
use url::Url;

use crate::Result;
use crate::error::{ConfigError, ZbxError};

use super::cache::SessionCache;
use super::session::{Session, default_http_client};

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Optional settings for establishing a [`Session`], validated once by
/// [`ClientBuilder::connect`].
///
/// ```no_run
/// # async fn demo() -> zbxapi::Result<()> {
/// use std::sync::Arc;
/// use zbxapi::zbx_client::{ClientBuilder, FileSessionCache};
///
/// let cache = FileSessionCache::new().with_path("/tmp/zabbix_session");
/// let session = ClientBuilder::new("https://zabbix.example.com/api_jsonrpc.php")
///     .with_cache(Arc::new(cache))
///     .with_credentials("Admin", "zabbix")
///     .connect()
///     .await?;
/// println!("connected to Zabbix {}", session.get_version().await?);
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    url: String,
    cache: Option<Arc<dyn SessionCache>>,
    credentials: Option<(String, SecretString)>,
    http: Option<reqwest::Client>,
    require_https: bool,
}

impl ClientBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cache: None,
            credentials: None,
            http: None,
            require_https: false,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<SecretString>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Use a caller-configured HTTP client; its timeout, TLS and proxy
    /// settings apply to every call.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Reject plain `http://` endpoints.
    #[must_use]
    pub fn require_https(mut self, required: bool) -> Self {
        self.require_https = required;
        self
    }

    /// Restore a live cached session if there is one, otherwise log in and
    /// cache the new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or not HTTPS when required, if
    /// no credentials were given and no cached session is usable, if version
    /// discovery or login fails, or if the new session cannot be cached.
    pub async fn connect(self) -> Result<Session> {
        let url = Url::parse(&self.url).map_err(|err| ConfigError::InvalidField {
            field: "zabbix.url",
            message: err.to_string(),
        })?;
        if self.require_https && url.scheme() != "https" {
            return Err(ZbxError::InsecureUrl {
                url: url.to_string(),
            }
            .into());
        }

        let http = match self.http {
            Some(http) => http,
            None => default_http_client(
                DEFAULT_HTTP_TIMEOUT,
                DEFAULT_CONNECT_TIMEOUT,
                self.require_https,
            )?,
        };

        if let Some(cache) = &self.cache {
            if cache.has_session().await {
                match cache.get_session().await {
                    Ok(snapshot) if snapshot.url == url => {
                        debug!(url = %url, "restored cached Zabbix session");
                        return Ok(Session::restore(snapshot, http));
                    }
                    Ok(snapshot) => {
                        warn!(
                            cached = %snapshot.url,
                            url = %url,
                            "cached session belongs to another endpoint; logging in"
                        );
                    }
                    Err(err) => warn!(error = %err, "ignoring unusable cached session"),
                }
            }
        }

        let (username, password) = self
            .credentials
            .ok_or(ZbxError::Credentials("username and password are required to log in"))?;

        let mut session = Session::unauthenticated(url, http);
        session.login(&username, &password).await?;

        if let Some(cache) = &self.cache {
            cache.save_session(&session).await?;
        }
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::ClientBuilder;
    use crate::error::{ConfigError, Error, ZbxError};

    #[tokio::test]
    async fn rejects_unparseable_url() {
        let err = ClientBuilder::new("not a url")
            .with_credentials("Admin", "zabbix")
            .connect()
            .await
            .err();
        assert!(matches!(
            err,
            Some(Error::Config(ConfigError::InvalidField { field: "zabbix.url", .. }))
        ));
    }

    #[tokio::test]
    async fn rejects_plain_http_when_https_required() {
        let err = ClientBuilder::new("http://zabbix.local/api_jsonrpc.php")
            .require_https(true)
            .with_credentials("Admin", "zabbix")
            .connect()
            .await
            .err();
        assert!(matches!(err, Some(Error::Zabbix(ZbxError::InsecureUrl { .. }))));
    }

    #[tokio::test]
    async fn requires_credentials_without_cache() {
        let err = ClientBuilder::new("http://zabbix.local/api_jsonrpc.php")
            .connect()
            .await
            .err();
        assert!(matches!(err, Some(Error::Zabbix(ZbxError::Credentials(_)))));
    }
}
