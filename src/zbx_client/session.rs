use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::sync::OnceCell;
use tracing::{debug, trace, warn};
use url::Url;

use crate::Result;
use crate::error::{Error, ZbxError};

use super::builder::ClientBuilder;
use super::cache::SessionSnapshot;
use super::rpc::{Request, Response, body_preview};
use super::wire::{lenient_string, parse_int};

pub const CONTENT_TYPE_JSON_RPC: &str = "application/json-rpc";

const VERSION_METHOD: &str = "apiinfo.version";
const LOGIN_METHOD: &str = "user.login";

/// An authenticated connection to one Zabbix JSON-RPC endpoint.
///
/// The token is bound once by login (or restored from a cache) and attached
/// to every request afterwards. The API version is discovered on first use
/// and memoized. A `Session` can be shared behind an `Arc`; it never mutates
/// after construction apart from the one-time version cell.
#[derive(Debug)]
pub struct Session {
    url: Url,
    token: SecretString,
    api_version: OnceCell<String>,
    http: reqwest::Client,
}

/// Build the HTTP client used when the caller does not inject one.
///
/// # Errors
///
/// Returns an error if the underlying HTTP client fails to build.
pub fn default_http_client(
    timeout: Duration,
    connect_timeout: Duration,
    https_only: bool,
) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(connect_timeout)
        .timeout(timeout)
        .user_agent(concat!("zbxapi/", env!("CARGO_PKG_VERSION")))
        .pool_idle_timeout(Duration::from_secs(30))
        .https_only(https_only)
        .build()
        .map_err(|source| ZbxError::Client { source }.into())
}

impl Session {
    /// Discover the API version and log in with the given credentials, using
    /// a default HTTP client and no session cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, on any transport or API error,
    /// or if the credentials are rejected.
    pub async fn connect(
        url: &str,
        username: &str,
        password: impl Into<SecretString>,
    ) -> Result<Self> {
        ClientBuilder::new(url)
            .with_credentials(username, password)
            .connect()
            .await
    }

    pub(crate) fn unauthenticated(url: Url, http: reqwest::Client) -> Self {
        Self {
            url,
            token: SecretString::from(String::new()),
            api_version: OnceCell::new(),
            http,
        }
    }

    /// Rebuild a session from cached state, attaching a fresh HTTP client.
    pub fn restore(snapshot: SessionSnapshot, http: reqwest::Client) -> Self {
        let api_version = if snapshot.api_version.is_empty() {
            OnceCell::new()
        } else {
            OnceCell::new_with(Some(snapshot.api_version))
        };
        Self {
            url: snapshot.url,
            token: SecretString::from(snapshot.token),
            api_version,
            http,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            url: self.url.clone(),
            token: self.token.expose_secret().to_string(),
            api_version: self.api_version.get().cloned().unwrap_or_default(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn auth_token(&self) -> &str {
        self.token.expose_secret()
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.expose_secret().is_empty()
    }

    /// The memoized API version, without touching the network.
    pub fn cached_version(&self) -> Option<&str> {
        self.api_version.get().map(String::as_str)
    }

    pub(crate) async fn login(&mut self, username: &str, password: &SecretString) -> Result<()> {
        self.get_version()
            .await
            .map_err(|err| wrap(err, |source| ZbxError::Version { source }))?;

        let params = json!({
            "user": username,
            "password": password.expose_secret(),
        });
        let token: String = self
            .do_request(Request::new(LOGIN_METHOD, params))
            .await
            .and_then(|response| response.bind())
            .map_err(|err| wrap(err, |source| ZbxError::Login { source }))?;

        self.token = SecretString::from(token);
        debug!(url = %self.url, "logged in to Zabbix API");
        Ok(())
    }

    /// The server's software version, fetched once with `apiinfo.version`.
    ///
    /// # Errors
    ///
    /// Propagates any transport, API or decoding error from the first call.
    pub async fn get_version(&self) -> Result<&str> {
        self.api_version
            .get_or_try_init(|| async {
                let response = self.do_request(Request::bare(VERSION_METHOD)).await?;
                response.bind::<String>()
            })
            .await
            .map(String::as_str)
    }

    /// Dispatch one request and classify the outcome.
    ///
    /// The request's auth token is overwritten with the session token, except
    /// for `apiinfo.version`. On
    /// success the response is guaranteed to carry a result payload.
    ///
    /// # Errors
    ///
    /// Returns a transport error when encoding, sending or reading fails, a
    /// decoding error for a malformed envelope and an API error when the
    /// server reports a non-zero error code.
    pub async fn do_request<P>(&self, mut request: Request<P>) -> Result<Response>
    where
        P: Serialize,
    {
        // apiinfo.version must be called without auth
        if request.method() != VERSION_METHOD {
            request.set_auth_token(self.token.expose_secret());
        }
        let method = request.method();
        let id = request.id();

        let body = serde_json::to_vec(&request).map_err(|source| ZbxError::Serialize {
            method: method.to_string(),
            source,
        })?;
        if method == LOGIN_METHOD {
            trace!(method, id, "call (credentials redacted)");
        } else {
            trace!(method, id, body = %body_preview(&body), "call");
        }

        let started = Instant::now();
        let response = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON_RPC)
            .body(body)
            .send()
            .await
            .map_err(|source| ZbxError::Request {
                method: method.to_string(),
                id,
                source,
            })?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ZbxError::Body {
                method: method.to_string(),
                id,
                source,
            })?;
        trace!(method, id, status, body = %body_preview(&bytes), "response");

        let mut response = Response::from_slice(method, status, &bytes)?;
        response.set_request_id(id);
        if let Some(echoed) = response.id() {
            if echoed != id {
                warn!(method, id, echoed, "response id does not match request id");
            }
        }
        response.err()?;
        if response.raw_result().is_none() {
            return Err(ZbxError::MissingField { field: "result" }.into());
        }

        debug!(
            method,
            id,
            latency_ms = started.elapsed().as_millis() as u64,
            "zabbix call succeeded"
        );
        Ok(response)
    }

    /// Call `method` with `params` and decode the result into `T`.
    ///
    /// # Errors
    ///
    /// Returns the first transport, API or decoding error encountered.
    pub async fn get<P, T>(&self, method: &str, params: &P) -> Result<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.do_request(Request::new(method, params)).await?.bind()
    }

    /// Run a `*.get` method with `countOutput` forced on.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` is not a JSON object, on any call error,
    /// or if the count is not numeric.
    pub async fn count<P>(&self, method: &str, params: &P) -> Result<u64>
    where
        P: Serialize + ?Sized,
    {
        #[derive(Deserialize)]
        struct Count(#[serde(deserialize_with = "lenient_string")] String);

        let encoded = serde_json::to_value(params).map_err(|source| ZbxError::Serialize {
            method: method.to_string(),
            source,
        })?;
        let mut params = match encoded {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                return Err(ZbxError::InvalidField {
                    field: "params",
                    message: "countOutput requires object parameters".to_string(),
                }
                .into());
            }
        };
        params.insert("countOutput".to_string(), Value::Bool(true));

        let Count(raw) = self.get(method, &params).await?;
        Ok(parse_int("count", &raw)?)
    }
}

fn wrap(err: Error, kind: fn(Box<ZbxError>) -> ZbxError) -> Error {
    match err {
        Error::Zabbix(inner) => kind(Box::new(inner)).into(),
        other => other,
    }
}
