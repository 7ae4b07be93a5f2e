//! Persisting authenticated sessions between process runs.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

use crate::Result;
use crate::error::CacheError;

use super::session::Session;

pub const DEFAULT_CACHE_PATH: &str = "./zabbix_session";
pub const DEFAULT_SESSION_LIFETIME: Duration = Duration::from_secs(4 * 60 * 60);
pub const DEFAULT_CACHE_PERMISSIONS: u32 = 0o600;

/// Wall clock used for cache expiry, swappable in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The transport-free state of a [`Session`].
#[derive(Clone, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub url: Url,
    pub token: String,
    #[serde(default)]
    pub api_version: String,
}

impl fmt::Debug for SessionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSnapshot")
            .field("url", &self.url.as_str())
            .field("token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

#[async_trait]
pub trait SessionCache: Send + Sync {
    fn set_session_lifetime(&mut self, lifetime: Duration);

    async fn save_session(&self, session: &Session) -> Result<()>;

    /// Whether a live session is stored. An expired entry is evicted.
    async fn has_session(&self) -> bool;

    async fn get_session(&self) -> Result<SessionSnapshot>;

    async fn flush(&self) -> Result<()>;
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct CachedSession {
    created_at: i64,
    session: SessionSnapshot,
}

impl CachedSession {
    fn is_expired(&self, now: DateTime<Utc>, lifetime: Duration) -> bool {
        let age = now.timestamp().saturating_sub(self.created_at);
        age > i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX)
    }
}

fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Session cache backed by a JSON file readable only by its owner.
pub struct FileSessionCache {
    path: PathBuf,
    permissions: u32,
    lifetime: Duration,
    clock: Clock,
}

impl Default for FileSessionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FileSessionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSessionCache")
            .field("path", &self.path)
            .field("permissions", &format_args!("{:o}", self.permissions))
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl FileSessionCache {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CACHE_PATH),
            permissions: DEFAULT_CACHE_PERMISSIONS,
            lifetime: DEFAULT_SESSION_LIFETIME,
            clock: system_clock(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Unix mode bits for the cache file; ignored elsewhere.
    #[must_use]
    pub fn with_permissions(mut self, mode: u32) -> Self {
        self.permissions = mode;
        self
    }

    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn read(&self) -> Result<CachedSession> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::Empty.into());
            }
            Err(err) => return Err(self.io_error(err).into()),
        };
        serde_json::from_slice(&bytes).map_err(|err| CacheError::Decode(err.to_string()).into())
    }

    /// Read the stored entry, evicting it when its lifetime has passed.
    async fn read_live(&self) -> Result<SessionSnapshot> {
        let cached = self.read().await?;
        if cached.is_expired((self.clock)(), self.lifetime) {
            debug!(path = %self.path.display(), "cached session expired; evicting");
            self.flush().await?;
            return Err(CacheError::Expired.into());
        }
        Ok(cached.session)
    }

    async fn write(&self, bytes: &[u8]) -> std::result::Result<(), std::io::Error> {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(self.permissions);

        let mut file = options.open(&self.path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        // mode() only applies on creation
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(self.permissions);
            tokio::fs::set_permissions(&self.path, perms).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SessionCache for FileSessionCache {
    fn set_session_lifetime(&mut self, lifetime: Duration) {
        self.lifetime = lifetime;
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        let cached = CachedSession {
            created_at: (self.clock)().timestamp(),
            session: session.snapshot(),
        };
        let bytes =
            serde_json::to_vec(&cached).map_err(|err| CacheError::Encode(err.to_string()))?;
        self.write(&bytes).await.map_err(|err| self.io_error(err))?;
        debug!(path = %self.path.display(), "saved Zabbix session to cache");
        Ok(())
    }

    async fn has_session(&self) -> bool {
        self.read_live().await.is_ok()
    }

    async fn get_session(&self) -> Result<SessionSnapshot> {
        self.read_live().await
    }

    async fn flush(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err).into()),
        }
    }
}

/// Session cache held in process memory.
pub struct MemorySessionCache {
    entry: Mutex<Option<CachedSession>>,
    lifetime: Duration,
    clock: Clock,
}

impl Default for MemorySessionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self {
            entry: Mutex::new(None),
            lifetime: DEFAULT_SESSION_LIFETIME,
            clock: system_clock(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn take_live(&self) -> std::result::Result<SessionSnapshot, CacheError> {
        let mut entry = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(cached) = entry.as_ref() else {
            return Err(CacheError::Empty);
        };
        if cached.is_expired((self.clock)(), self.lifetime) {
            *entry = None;
            return Err(CacheError::Expired);
        }
        Ok(cached.session.clone())
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    fn set_session_lifetime(&mut self, lifetime: Duration) {
        self.lifetime = lifetime;
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        let cached = CachedSession {
            created_at: (self.clock)().timestamp(),
            session: session.snapshot(),
        };
        *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = Some(cached);
        Ok(())
    }

    async fn has_session(&self) -> bool {
        self.take_live().is_ok()
    }

    async fn get_session(&self) -> Result<SessionSnapshot> {
        Ok(self.take_live()?)
    }

    async fn flush(&self) -> Result<()> {
        *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use tempfile::TempDir;
    use url::Url;

    use super::{Clock, FileSessionCache, MemorySessionCache, SessionCache, SessionSnapshot};
    use crate::error::{CacheError, Error};
    use crate::zbx_client::Session;

    const LIFETIME: Duration = Duration::from_secs(3600);
    const START: i64 = 1_700_000_000;

    fn fixed_clock() -> (Arc<AtomicI64>, Clock) {
        let now = Arc::new(AtomicI64::new(START));
        let handle = Arc::clone(&now);
        let clock: Clock = Arc::new(move || {
            DateTime::from_timestamp(handle.load(Ordering::SeqCst), 0).unwrap_or_default()
        });
        (now, clock)
    }

    fn session() -> Session {
        let snapshot = SessionSnapshot {
            url: Url::parse("http://zabbix.local/api_jsonrpc.php").unwrap(),
            token: "0424bd59b807674191e7d77572075f33".to_string(),
            api_version: "6.0.21".to_string(),
        };
        Session::restore(snapshot, reqwest::Client::new())
    }

    fn file_cache(dir: &TempDir, clock: Clock) -> FileSessionCache {
        let mut cache = FileSessionCache::new()
            .with_path(dir.path().join("zabbix_session"))
            .with_clock(clock);
        cache.set_session_lifetime(LIFETIME);
        cache
    }

    #[tokio::test]
    async fn file_cache_round_trips_until_lifetime_elapses() {
        let dir = TempDir::new().unwrap();
        let (now, clock) = fixed_clock();
        let cache = file_cache(&dir, clock);

        assert!(!cache.has_session().await);
        cache.save_session(&session()).await.unwrap();

        now.store(START + LIFETIME.as_secs() as i64 - 1, Ordering::SeqCst);
        assert!(cache.has_session().await);
        let restored = cache.get_session().await.unwrap();
        assert_eq!(restored.token, "0424bd59b807674191e7d77572075f33");
        assert_eq!(restored.api_version, "6.0.21");

        now.store(START + LIFETIME.as_secs() as i64 + 1, Ordering::SeqCst);
        assert!(!cache.has_session().await);
        assert!(!cache.path().exists());
    }

    #[tokio::test]
    async fn expired_file_entry_is_reported_and_evicted() {
        let dir = TempDir::new().unwrap();
        let (now, clock) = fixed_clock();
        let cache = file_cache(&dir, clock);
        cache.save_session(&session()).await.unwrap();

        now.store(START + 2 * LIFETIME.as_secs() as i64, Ordering::SeqCst);
        let err = cache.get_session().await.unwrap_err();
        assert!(matches!(err, Error::Cache(CacheError::Expired)));
        assert!(matches!(
            cache.get_session().await,
            Err(Error::Cache(CacheError::Empty))
        ));
    }

    #[tokio::test]
    async fn file_cache_uses_camel_case_container() {
        let dir = TempDir::new().unwrap();
        let (_, clock) = fixed_clock();
        let cache = file_cache(&dir, clock);
        cache.save_session(&session()).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(cache.path()).unwrap()).unwrap();
        assert_eq!(raw["createdAt"], START);
        assert_eq!(raw["session"]["apiVersion"], "6.0.21");
        assert_eq!(raw["session"]["url"], "http://zabbix.local/api_jsonrpc.php");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(cache.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn flush_removes_file_and_tolerates_absence() {
        let dir = TempDir::new().unwrap();
        let (_, clock) = fixed_clock();
        let cache = file_cache(&dir, clock);
        cache.save_session(&session()).await.unwrap();

        cache.flush().await.unwrap();
        assert!(!cache.has_session().await);
        cache.flush().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let (_, clock) = fixed_clock();
        let cache = file_cache(&dir, clock);
        std::fs::write(cache.path(), b"not json").unwrap();

        assert!(!cache.has_session().await);
        assert!(matches!(
            cache.get_session().await,
            Err(Error::Cache(CacheError::Decode(_)))
        ));
    }

    #[tokio::test]
    async fn memory_cache_honours_lifetime() {
        let (now, clock) = fixed_clock();
        let mut cache = MemorySessionCache::new().with_clock(clock);
        cache.set_session_lifetime(LIFETIME);

        cache.save_session(&session()).await.unwrap();
        assert!(cache.has_session().await);

        now.store(START + LIFETIME.as_secs() as i64 + 1, Ordering::SeqCst);
        assert!(matches!(
            cache.get_session().await,
            Err(Error::Cache(CacheError::Expired))
        ));
        assert!(!cache.has_session().await);
    }

    #[test]
    fn snapshot_debug_hides_token() {
        let rendered = format!("{:?}", session().snapshot());
        assert!(!rendered.contains("0424bd59"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
