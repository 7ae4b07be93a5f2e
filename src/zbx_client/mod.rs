//! Client for the Zabbix JSON-RPC API.

pub(crate) mod wire;

pub mod builder;
pub mod cache;
pub mod objects;
pub mod params;
pub mod rpc;
pub mod session;

pub use builder::ClientBuilder;
pub use cache::{FileSessionCache, MemorySessionCache, SessionCache, SessionSnapshot};
pub use objects::*;
pub use params::{GetParameters, HostRef, SelectQuery, SortOrder, Tag, TagFilter};
pub use rpc::{ApiError, Request, Response};
pub use session::{CONTENT_TYPE_JSON_RPC, Session, default_http_client};
