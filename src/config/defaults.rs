use std::path::PathBuf;
use std::time::Duration;

use crate::zbx_client::builder::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_HTTP_TIMEOUT};
use crate::zbx_client::cache::{DEFAULT_CACHE_PATH, DEFAULT_SESSION_LIFETIME};

pub(super) const fn default_request_timeout() -> Duration {
    DEFAULT_HTTP_TIMEOUT
}

pub(super) const fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

pub(super) const fn default_cache_enabled() -> bool {
    true
}

pub(super) fn default_cache_path() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_PATH)
}

pub(super) const fn default_session_lifetime() -> Duration {
    DEFAULT_SESSION_LIFETIME
}
