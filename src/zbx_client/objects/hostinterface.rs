use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::Result;
use crate::error::ZbxError;
use crate::zbx_client::Session;
use crate::zbx_client::params::{GetParameters, SelectQuery};
use crate::zbx_client::wire::{
    code_enum, lenient_string, map_rows, non_empty, parse_flag, parse_opt_timestamp,
};

use super::host::Availability;

code_enum! {
    pub enum InterfaceType {
        Agent = 1,
        Snmp = 2,
        Ipmi = 3,
        Jmx = 4,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HostInterface {
    pub interface_id: String,
    pub host_id: String,
    pub interface_type: Option<InterfaceType>,
    /// Default interface of its type on the host.
    pub main: bool,
    /// Connect by IP rather than DNS name.
    pub use_ip: bool,
    pub ip: String,
    pub dns: String,
    pub port: String,
    pub available: Option<Availability>,
    pub error: String,
    pub errors_from: Option<DateTime<Utc>>,
}

impl HostInterface {
    pub fn address(&self) -> &str {
        if self.use_ip { &self.ip } else { &self.dns }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawHostInterface {
    #[serde(deserialize_with = "lenient_string")]
    interfaceid: String,
    #[serde(deserialize_with = "lenient_string")]
    hostid: String,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    kind: String,
    #[serde(deserialize_with = "lenient_string")]
    main: String,
    #[serde(deserialize_with = "lenient_string")]
    useip: String,
    #[serde(deserialize_with = "lenient_string")]
    ip: String,
    #[serde(deserialize_with = "lenient_string")]
    dns: String,
    #[serde(deserialize_with = "lenient_string")]
    port: String,
    #[serde(deserialize_with = "lenient_string")]
    available: String,
    #[serde(deserialize_with = "lenient_string")]
    error: String,
    #[serde(deserialize_with = "lenient_string")]
    errors_from: String,
}

impl TryFrom<RawHostInterface> for HostInterface {
    type Error = ZbxError;

    fn try_from(raw: RawHostInterface) -> std::result::Result<Self, ZbxError> {
        Ok(Self {
            interface_type: InterfaceType::parse_opt("type", &raw.kind)?,
            main: parse_flag("main", &raw.main)?,
            use_ip: parse_flag("useip", &raw.useip)?,
            available: Availability::parse_opt("available", &raw.available)?,
            errors_from: parse_opt_timestamp("errors_from", &raw.errors_from)?,
            interface_id: raw.interfaceid,
            host_id: raw.hostid,
            ip: raw.ip,
            dns: raw.dns,
            port: raw.port,
            error: raw.error,
        })
    }
}

/// Parameters for `hostinterface.get`.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize)]
pub struct HostInterfaceGetParams {
    #[serde(flatten)]
    pub common: GetParameters,
    #[serde(rename = "hostids")]
    pub host_ids: Option<Vec<String>>,
    #[serde(rename = "interfaceids")]
    pub interface_ids: Option<Vec<String>>,
    #[serde(rename = "itemids")]
    pub item_ids: Option<Vec<String>>,
    #[serde(rename = "triggerids")]
    pub trigger_ids: Option<Vec<String>>,
    #[serde(rename = "selectItems")]
    pub select_items: Option<SelectQuery>,
    #[serde(rename = "selectHosts")]
    pub select_hosts: Option<SelectQuery>,
}

impl Session {
    /// Query `hostinterface.get`.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::NotFound`] when nothing matches, or any call or
    /// mapping error.
    pub async fn host_interfaces(
        &self,
        params: &HostInterfaceGetParams,
    ) -> Result<Vec<HostInterface>> {
        let rows: Vec<RawHostInterface> = self.get("hostinterface.get", params).await?;
        Ok(map_rows("HostInterface", non_empty("host interfaces", rows)?)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{HostInterface, InterfaceType, RawHostInterface};
    use crate::error::ZbxError;
    use crate::zbx_client::wire::map_rows;

    fn decode(rows: serde_json::Value) -> Result<Vec<HostInterface>, ZbxError> {
        let rows: Vec<RawHostInterface> = serde_json::from_value(rows).unwrap();
        map_rows("HostInterface", rows)
    }

    #[test]
    fn maps_agent_interface() {
        let ifaces = decode(json!([{
            "interfaceid": "1",
            "hostid": "10084",
            "type": "1",
            "main": "1",
            "useip": "1",
            "ip": "127.0.0.1",
            "dns": "",
            "port": "10050",
            "available": "2",
            "error": "cannot connect",
            "errors_from": "1700000000"
        }]))
        .unwrap();
        let iface = &ifaces[0];
        assert_eq!(iface.interface_type, Some(InterfaceType::Agent));
        assert_eq!(iface.address(), "127.0.0.1");
        assert_eq!(iface.errors_from.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn rejects_non_boolean_main() {
        let err = decode(json!([{"interfaceid": "1", "main": "yes"}])).unwrap_err();
        assert!(matches!(err, ZbxError::Mapping { index: 0, .. }));
    }
}
