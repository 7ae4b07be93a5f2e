use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Zabbix(#[from] ZbxError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("missing required configuration field: {field}")]
    MissingField { field: &'static str },
    #[error("invalid configuration for {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
    #[error("configuration error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ZbxError {
    #[error("failed to build HTTP client")]
    Client {
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} request {id} failed: {source}")]
    Request {
        method: String,
        id: u64,
        #[source]
        source: reqwest::Error,
    },
    #[error("error reading {method} response {id}: {source}")]
    Body {
        method: String,
        id: u64,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to encode {method} request: {source}")]
    Serialize {
        method: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("error decoding JSON response envelope for {method} (HTTP {status}): {message}")]
    Envelope {
        method: String,
        status: u16,
        message: String,
    },
    #[error("error decoding {method} result: {source}")]
    Bind {
        method: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{method} request {id}: HTTP {status} {message} ({code}): {data}")]
    Api {
        method: String,
        id: u64,
        status: u16,
        code: i64,
        message: String,
        data: String,
    },
    #[error("missing field in API response: {field}")]
    MissingField { field: &'static str },
    #[error("invalid field {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
    #[error("error mapping {entity} {index} in response: {source}")]
    Mapping {
        entity: &'static str,
        index: usize,
        #[source]
        source: Box<ZbxError>,
    },
    #[error("no {entity} found matching the given search parameters")]
    NotFound { entity: &'static str },
    #[error("failed to find host id for host name {name}")]
    HostNotFound { name: String },
    #[error("failed to retrieve Zabbix API version: {source}")]
    Version {
        #[source]
        source: Box<ZbxError>,
    },
    #[error("error logging in to Zabbix API: {source}")]
    Login {
        #[source]
        source: Box<ZbxError>,
    },
    #[error("only https URLs are accepted: {url}")]
    InsecureUrl { url: String },
    #[error("missing credentials: {0}")]
    Credentials(&'static str),
    #[error("{task} task failed: {message}")]
    Task { task: &'static str, message: String },
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("session cache I/O failed for {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode cached session: {0}")]
    Decode(String),
    #[error("failed to encode session for cache: {0}")]
    Encode(String),
    #[error("no cached session available")]
    Empty,
    #[error("cached session lifetime expired")]
    Expired,
}

impl Error {
    /// Transport-class failures where a retry of an idempotent query may
    /// succeed. The library itself never retries.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Zabbix(ZbxError::Request { .. })
                | Self::Zabbix(ZbxError::Body { .. })
                | Self::Zabbix(ZbxError::Envelope { .. })
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Zabbix(ZbxError::NotFound { .. }))
    }

    /// Server-reported error code, if this is an API error.
    pub fn api_code(&self) -> Option<i64> {
        match self {
            Self::Zabbix(ZbxError::Api { code, .. }) => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ZbxError};

    #[test]
    fn api_error_renders_status_message_code_and_detail() {
        let err = ZbxError::Api {
            method: "host.get".to_string(),
            id: 4,
            status: 200,
            code: -32602,
            message: "Invalid params.".to_string(),
            data: "No permissions".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "host.get request 4: HTTP 200 Invalid params. (-32602): No permissions"
        );
    }

    #[test]
    fn mapping_error_names_entity_index_and_field() {
        let err = ZbxError::Mapping {
            entity: "Event",
            index: 3,
            source: Box::new(ZbxError::InvalidField {
                field: "clock",
                message: "invalid digit found in string".to_string(),
            }),
        };
        let text = err.to_string();
        assert!(text.contains("Event 3"));
        assert!(text.contains("clock"));
    }

    #[test]
    fn not_found_is_not_retriable() {
        let err = Error::from(ZbxError::NotFound { entity: "hosts" });
        assert!(err.is_not_found());
        assert!(!err.is_retriable());
        assert_eq!(err.api_code(), None);
    }
}
