use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use serde_json::value::RawValue;

use crate::Result;
use crate::error::ZbxError;

pub const JSONRPC_VERSION: &str = "2.0";

const BODY_PREVIEW_LIMIT: usize = 256;

static REQUEST_ID: AtomicU64 = AtomicU64::new(0);

fn next_request_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::Relaxed) + 1
}

/// A single JSON-RPC call.
///
/// The id is drawn from a process-wide counter when the request is built;
/// the auth token is filled in by [`Session::do_request`](super::Session::do_request)
/// at dispatch time.
#[derive(Serialize)]
#[serde(bound(serialize = "P: Serialize"))]
pub struct Request<P = Value> {
    jsonrpc: &'static str,
    method: String,
    #[serde(serialize_with = "params_or_empty")]
    params: Option<P>,
    id: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    auth: String,
}

impl<P> Request<P> {
    pub fn new(method: impl Into<String>, params: P) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params: Some(params),
            id: next_request_id(),
            auth: String::new(),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn params(&self) -> Option<&P> {
        self.params.as_ref()
    }

    pub fn auth_token(&self) -> &str {
        &self.auth
    }

    pub(super) fn set_auth_token(&mut self, token: &str) {
        token.clone_into(&mut self.auth);
    }
}

impl Request<Value> {
    /// A request without parameters; `params` goes on the wire as `{}`.
    pub fn bare(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params: None,
            id: next_request_id(),
            auth: String::new(),
        }
    }
}

impl<P: fmt::Debug> fmt::Debug for Request<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("params", &self.params)
            .field("id", &self.id)
            .field("auth", &if self.auth.is_empty() { "" } else { "[REDACTED]" })
            .finish()
    }
}

fn params_or_empty<P, S>(params: &Option<P>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    P: Serialize,
    S: Serializer,
{
    // null, None and () all go on the wire as {}
    let value = match params {
        Some(params) => serde_json::to_value(params).map_err(S::Error::custom)?,
        None => Value::Null,
    };
    match value {
        Value::Null => serializer.serialize_map(Some(0))?.end(),
        other => other.serialize(serializer),
    }
}

/// Server-reported failure embedded in a response envelope. A zero code
/// means no error.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct ApiError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "text_or_json")]
    pub data: String,
}

/// One JSON-RPC reply. The result payload is kept raw until [`Response::bind`].
#[derive(Debug, Deserialize)]
pub struct Response {
    #[serde(skip)]
    status: u16,
    #[serde(skip)]
    method: String,
    #[serde(skip)]
    request_id: Option<u64>,
    #[serde(default)]
    jsonrpc: String,
    #[serde(default)]
    result: Option<Box<RawValue>>,
    #[serde(default)]
    id: Value,
    #[serde(default, deserialize_with = "nullable_error")]
    error: ApiError,
}

impl Response {
    /// Decode an HTTP body into a response envelope for `method`.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::Envelope`] when the body is not a JSON-RPC envelope.
    pub fn from_slice(method: &str, status: u16, body: &[u8]) -> Result<Self> {
        let mut response: Self = serde_json::from_slice(body).map_err(|err| {
            let mut message = format!("{err}; body preview: ");
            message.push_str(&body_preview(body));
            ZbxError::Envelope {
                method: method.to_string(),
                status,
                message,
            }
        })?;
        response.status = status;
        method.clone_into(&mut response.method);
        Ok(response)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn jsonrpc(&self) -> &str {
        &self.jsonrpc
    }

    pub fn id(&self) -> Option<u64> {
        self.id.as_u64()
    }

    /// Tie the response to the id of the request that produced it.
    pub(super) fn set_request_id(&mut self, id: u64) {
        self.request_id = Some(id);
    }

    /// The request id when known, otherwise the echoed one.
    fn correlation_id(&self) -> u64 {
        self.request_id.or_else(|| self.id()).unwrap_or_default()
    }

    pub fn api_error(&self) -> &ApiError {
        &self.error
    }

    pub fn raw_result(&self) -> Option<&RawValue> {
        self.result.as_deref()
    }

    /// `Ok(())` exactly when the envelope's error code is zero.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::Api`] carrying the method, request id, HTTP status,
    /// message, code and detail when the code is non-zero.
    pub fn err(&self) -> Result<()> {
        if self.error.code == 0 {
            return Ok(());
        }
        Err(ZbxError::Api {
            method: self.method.clone(),
            id: self.correlation_id(),
            status: self.status,
            code: self.error.code,
            message: self.error.message.clone(),
            data: self.error.data.clone(),
        }
        .into())
    }

    /// Decode the stored result payload into `T`. The payload is not
    /// consumed, so binding again yields the same value.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::MissingField`] when the envelope carried no result
    /// and [`ZbxError::Bind`] when the payload does not match `T`.
    pub fn bind<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let raw = self
            .result
            .as_deref()
            .ok_or(ZbxError::MissingField { field: "result" })?;
        serde_json::from_str(raw.get()).map_err(|source| {
            ZbxError::Bind {
                method: self.method.clone(),
                source,
            }
            .into()
        })
    }
}

fn nullable_error<'de, D>(de: D) -> std::result::Result<ApiError, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ApiError>::deserialize(de)?.unwrap_or_default())
}

fn text_or_json<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    })
}

pub(crate) fn body_preview(body: &[u8]) -> String {
    if body.is_empty() {
        return "<empty>".to_string();
    }
    let end = body.len().min(BODY_PREVIEW_LIMIT);
    let mut preview = String::from_utf8_lossy(&body[..end]).to_string();
    if body.len() > BODY_PREVIEW_LIMIT {
        preview.push_str("...");
    }
    preview.replace('\n', "\\n")
}
