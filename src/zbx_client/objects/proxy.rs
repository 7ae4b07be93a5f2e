use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::Result;
use crate::error::ZbxError;
use crate::zbx_client::Session;
use crate::zbx_client::params::{GetParameters, HostRef, SelectQuery};
use crate::zbx_client::wire::{
    code_enum, flag_as_int, lenient_ids, lenient_string, map_rows, non_empty, parse_flag,
    parse_opt_int, parse_opt_timestamp,
};

use super::host::TlsMode;

code_enum! {
    /// Proxy operating mode, sent as `status` on Zabbix before 7.0.
    pub enum ProxyMode {
        Active = 5,
        Passive = 6,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Proxy {
    pub proxy_id: String,
    pub name: String,
    pub mode: ProxyMode,
    pub description: String,
    pub last_access: Option<DateTime<Utc>>,
    /// Addresses an active proxy may connect from.
    pub address: String,
    pub tls_connect: Option<TlsMode>,
    pub tls_accept: Option<u8>,
    pub tls_issuer: String,
    pub tls_subject: String,
    pub auto_compress: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawProxy {
    #[serde(deserialize_with = "lenient_string")]
    proxyid: String,
    #[serde(alias = "name", deserialize_with = "lenient_string")]
    host: String,
    #[serde(deserialize_with = "lenient_string")]
    status: String,
    #[serde(deserialize_with = "lenient_string")]
    description: String,
    #[serde(deserialize_with = "lenient_string")]
    lastaccess: String,
    #[serde(alias = "allowed_addresses", deserialize_with = "lenient_string")]
    proxy_address: String,
    #[serde(deserialize_with = "lenient_string")]
    tls_connect: String,
    #[serde(deserialize_with = "lenient_string")]
    tls_accept: String,
    #[serde(deserialize_with = "lenient_string")]
    tls_issuer: String,
    #[serde(deserialize_with = "lenient_string")]
    tls_subject: String,
    #[serde(deserialize_with = "lenient_string")]
    auto_compress: String,
}

impl TryFrom<RawProxy> for Proxy {
    type Error = ZbxError;

    fn try_from(raw: RawProxy) -> std::result::Result<Self, ZbxError> {
        Ok(Self {
            mode: ProxyMode::parse("status", &raw.status)?,
            last_access: parse_opt_timestamp("lastaccess", &raw.lastaccess)?,
            tls_connect: TlsMode::parse_opt("tls_connect", &raw.tls_connect)?,
            tls_accept: parse_opt_int("tls_accept", &raw.tls_accept)?,
            auto_compress: parse_flag("auto_compress", &raw.auto_compress)?,
            proxy_id: raw.proxyid,
            name: raw.host,
            description: raw.description,
            address: raw.proxy_address,
            tls_issuer: raw.tls_issuer,
            tls_subject: raw.tls_subject,
        })
    }
}

/// Parameters for `proxy.get`.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize)]
pub struct ProxyGetParams {
    #[serde(flatten)]
    pub common: GetParameters,
    #[serde(rename = "proxyids")]
    pub proxy_ids: Option<Vec<String>>,
    #[serde(rename = "selectHosts")]
    pub select_hosts: Option<SelectQuery>,
    #[serde(rename = "selectInterface")]
    pub select_interface: Option<SelectQuery>,
}

/// The interface a passive proxy listens on.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ProxyInterface {
    #[serde(rename = "useip", serialize_with = "flag_as_int")]
    pub use_ip: bool,
    pub ip: String,
    pub dns: String,
    pub port: String,
}

/// Parameters for `proxy.create`.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize)]
pub struct ProxyCreateParams {
    #[serde(rename = "host")]
    pub name: String,
    #[serde(rename = "status")]
    pub mode: ProxyMode,
    pub description: Option<String>,
    #[serde(rename = "proxy_address")]
    pub address: Option<String>,
    /// Required for passive proxies.
    pub interface: Option<ProxyInterface>,
    pub hosts: Option<Vec<HostRef>>,
}

impl ProxyCreateParams {
    pub fn active(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: ProxyMode::Active,
            description: None,
            address: None,
            interface: None,
            hosts: None,
        }
    }

    pub fn passive(name: impl Into<String>, interface: ProxyInterface) -> Self {
        Self {
            mode: ProxyMode::Passive,
            interface: Some(interface),
            ..Self::active(name)
        }
    }
}

#[derive(Deserialize)]
struct ProxyIds {
    #[serde(deserialize_with = "lenient_ids")]
    proxyids: Vec<String>,
}

impl Session {
    /// Query `proxy.get`.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::NotFound`] when nothing matches, or any call or
    /// mapping error.
    pub async fn proxies(&self, params: &ProxyGetParams) -> Result<Vec<Proxy>> {
        let rows: Vec<RawProxy> = self.get("proxy.get", params).await?;
        Ok(map_rows("Proxy", non_empty("proxies", rows)?)?)
    }

    /// Create a proxy and return the new proxy ids.
    ///
    /// # Errors
    ///
    /// Returns any call or decoding error from `proxy.create`.
    pub async fn create_proxy(&self, params: &ProxyCreateParams) -> Result<Vec<String>> {
        let created: ProxyIds = self.get("proxy.create", params).await?;
        Ok(created.proxyids)
    }

    /// Delete proxies by id and return the deleted ids.
    ///
    /// # Errors
    ///
    /// Returns any call or decoding error from `proxy.delete`.
    pub async fn delete_proxies(&self, proxy_ids: &[String]) -> Result<Vec<String>> {
        let deleted: ProxyIds = self.get("proxy.delete", proxy_ids).await?;
        Ok(deleted.proxyids)
    }
}
