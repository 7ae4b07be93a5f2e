use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::Result;
use crate::error::ZbxError;
use crate::zbx_client::Session;
use crate::zbx_client::params::{GetParameters, SelectQuery};
use crate::zbx_client::wire::{
    code_enum, is_false, lenient_string, map_rows, non_empty, non_zero_id, parse_flag,
    parse_opt_int, parse_opt_timestamp,
};

use super::hostgroup::{Hostgroup, RawHostgroup};
use super::hostinterface::{HostInterface, RawHostInterface};
use super::usermacro::{RawUserMacro, UserMacro};

code_enum! {
    pub enum HostStatus {
        Monitored = 0,
        Unmonitored = 1,
    }
}

code_enum! {
    /// Agent or interface reachability. Removed from hosts in Zabbix 5.4.
    pub enum Availability {
        Undetermined = 0,
        Available = 1,
        Unavailable = 2,
    }
}

code_enum! {
    /// How a host or host group came to exist.
    pub enum ObjectOrigin {
        Plain = 0,
        Discovered = 4,
    }
}

code_enum! {
    pub enum InventoryMode {
        Disabled = -1,
        Manual = 0,
        Automatic = 1,
    }
}

code_enum! {
    pub enum TlsMode {
        Unencrypted = 1,
        Psk = 2,
        Certificate = 4,
    }
}

/// A monitored host. Fields the query did not select are left empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Host {
    pub host_id: String,
    pub hostname: String,
    pub display_name: String,
    pub origin: Option<ObjectOrigin>,
    pub status: Option<HostStatus>,
    pub available: Option<Availability>,
    pub description: String,
    pub inventory_mode: Option<InventoryMode>,
    pub proxy_host_id: Option<String>,
    pub in_maintenance: bool,
    pub maintenance_id: Option<String>,
    pub maintenance_from: Option<DateTime<Utc>>,
    pub tls_connect: Option<TlsMode>,
    /// Bitmask of accepted [`TlsMode`] codes.
    pub tls_accept: Option<u8>,
    pub tls_issuer: String,
    pub tls_subject: String,
    pub tls_psk_identity: String,
    pub groups: Vec<Hostgroup>,
    pub macros: Vec<UserMacro>,
    pub interfaces: Vec<HostInterface>,
}

impl Host {
    /// The visible name, falling back to the technical one.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.hostname
        } else {
            &self.display_name
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawHost {
    #[serde(deserialize_with = "lenient_string")]
    hostid: String,
    #[serde(deserialize_with = "lenient_string")]
    host: String,
    #[serde(deserialize_with = "lenient_string")]
    name: String,
    #[serde(deserialize_with = "lenient_string")]
    flags: String,
    #[serde(deserialize_with = "lenient_string")]
    status: String,
    #[serde(deserialize_with = "lenient_string")]
    available: String,
    #[serde(deserialize_with = "lenient_string")]
    description: String,
    #[serde(deserialize_with = "lenient_string")]
    inventory_mode: String,
    #[serde(alias = "proxyid", deserialize_with = "lenient_string")]
    proxy_hostid: String,
    #[serde(deserialize_with = "lenient_string")]
    maintenance_status: String,
    #[serde(deserialize_with = "lenient_string")]
    maintenanceid: String,
    #[serde(deserialize_with = "lenient_string")]
    maintenance_from: String,
    #[serde(deserialize_with = "lenient_string")]
    tls_connect: String,
    #[serde(deserialize_with = "lenient_string")]
    tls_accept: String,
    #[serde(deserialize_with = "lenient_string")]
    tls_issuer: String,
    #[serde(deserialize_with = "lenient_string")]
    tls_subject: String,
    #[serde(deserialize_with = "lenient_string")]
    tls_psk_identity: String,
    groups: Vec<RawHostgroup>,
    macros: Vec<RawUserMacro>,
    interfaces: Vec<RawHostInterface>,
}

impl TryFrom<RawHost> for Host {
    type Error = ZbxError;

    fn try_from(raw: RawHost) -> std::result::Result<Self, ZbxError> {
        Ok(Self {
            origin: ObjectOrigin::parse_opt("flags", &raw.flags)?,
            status: HostStatus::parse_opt("status", &raw.status)?,
            available: Availability::parse_opt("available", &raw.available)?,
            inventory_mode: InventoryMode::parse_opt("inventory_mode", &raw.inventory_mode)?,
            proxy_host_id: non_zero_id(raw.proxy_hostid),
            in_maintenance: parse_flag("maintenance_status", &raw.maintenance_status)?,
            maintenance_id: non_zero_id(raw.maintenanceid),
            maintenance_from: parse_opt_timestamp("maintenance_from", &raw.maintenance_from)?,
            tls_connect: TlsMode::parse_opt("tls_connect", &raw.tls_connect)?,
            tls_accept: parse_opt_int("tls_accept", &raw.tls_accept)?,
            groups: map_rows("Hostgroup", raw.groups)?,
            macros: map_rows("UserMacro", raw.macros)?,
            interfaces: map_rows("HostInterface", raw.interfaces)?,
            host_id: raw.hostid,
            hostname: raw.host,
            display_name: raw.name,
            description: raw.description,
            tls_issuer: raw.tls_issuer,
            tls_subject: raw.tls_subject,
            tls_psk_identity: raw.tls_psk_identity,
        })
    }
}

/// Parameters for `host.get`.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize)]
pub struct HostGetParams {
    #[serde(flatten)]
    pub common: GetParameters,
    #[serde(rename = "groupids")]
    pub group_ids: Option<Vec<String>>,
    #[serde(rename = "dserviceids")]
    pub discovered_service_ids: Option<Vec<String>>,
    #[serde(rename = "graphids")]
    pub graph_ids: Option<Vec<String>>,
    #[serde(rename = "hostids")]
    pub host_ids: Option<Vec<String>>,
    #[serde(rename = "httptestids")]
    pub web_check_ids: Option<Vec<String>>,
    #[serde(rename = "interfaceids")]
    pub interface_ids: Option<Vec<String>>,
    #[serde(rename = "itemids")]
    pub item_ids: Option<Vec<String>>,
    #[serde(rename = "maintenanceids")]
    pub maintenance_ids: Option<Vec<String>>,
    #[serde(rename = "proxyids")]
    pub proxy_ids: Option<Vec<String>>,
    #[serde(rename = "monitored_hosts", skip_serializing_if = "is_false")]
    pub monitored_only: bool,
    #[serde(rename = "templated_hosts", skip_serializing_if = "is_false")]
    pub include_templates: bool,
    #[serde(rename = "selectGroups")]
    pub select_groups: Option<SelectQuery>,
    #[serde(rename = "selectInterfaces")]
    pub select_interfaces: Option<SelectQuery>,
    #[serde(rename = "selectMacros")]
    pub select_macros: Option<SelectQuery>,
    #[serde(rename = "selectItems")]
    pub select_items: Option<SelectQuery>,
    #[serde(rename = "selectTriggers")]
    pub select_triggers: Option<SelectQuery>,
    #[serde(rename = "selectParentTemplates")]
    pub select_parent_templates: Option<SelectQuery>,
    #[serde(rename = "selectInventory")]
    pub select_inventory: Option<SelectQuery>,
}

impl Session {
    /// Query `host.get`.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::NotFound`] when nothing matches, or any call or
    /// mapping error.
    pub async fn hosts(&self, params: &HostGetParams) -> Result<Vec<Host>> {
        let rows: Vec<RawHost> = self.get("host.get", params).await?;
        Ok(map_rows("Host", non_empty("hosts", rows)?)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Availability, Host, HostGetParams, HostStatus, InventoryMode, RawHost};
    use crate::error::ZbxError;
    use crate::zbx_client::params::SelectQuery;
    use crate::zbx_client::wire::map_rows;

    fn decode(rows: serde_json::Value) -> Result<Vec<Host>, ZbxError> {
        let rows: Vec<RawHost> = serde_json::from_value(rows).unwrap();
        map_rows("Host", rows)
    }

    #[test]
    fn maps_full_host_row() {
        let hosts = decode(json!([{
            "hostid": "10084",
            "host": "Zabbix server",
            "name": "",
            "flags": "0",
            "status": "0",
            "available": "1",
            "inventory_mode": -1,
            "proxy_hostid": "0",
            "maintenance_status": "0",
            "maintenanceid": "0",
            "maintenance_from": "0",
            "tls_connect": "1",
            "tls_accept": "3",
            "groups": [{"groupid": "4", "name": "Zabbix servers"}],
            "macros": [{"hostmacroid": "1", "hostid": "10084", "macro": "{$A}", "value": "1"}]
        }]))
        .unwrap();

        let host = &hosts[0];
        assert_eq!(host.label(), "Zabbix server");
        assert_eq!(host.status, Some(HostStatus::Monitored));
        assert_eq!(host.available, Some(Availability::Available));
        assert_eq!(host.inventory_mode, Some(InventoryMode::Disabled));
        assert_eq!(host.proxy_host_id, None);
        assert_eq!(host.maintenance_from, None);
        assert_eq!(host.tls_accept, Some(3));
        assert_eq!(host.groups[0].name, "Zabbix servers");
        assert_eq!(host.macros[0].macro_name, "{$A}");
    }

    #[test]
    fn partial_host_rows_leave_codes_unset() {
        let hosts = decode(json!([{"hostid": "1", "host": "db", "name": "Database"}])).unwrap();
        assert_eq!(hosts[0].status, None);
        assert_eq!(hosts[0].label(), "Database");
    }

    #[test]
    fn bad_status_names_host_index() {
        let err = decode(json!([{"hostid": "1"}, {"hostid": "2", "status": "up"}])).unwrap_err();
        assert!(matches!(err, ZbxError::Mapping { entity: "Host", index: 1, .. }));
        assert!(err.to_string().contains("status"));
    }

    #[test]
    fn params_omit_unset_filters() {
        let params = HostGetParams {
            group_ids: Some(vec!["2".into()]),
            select_groups: Some(SelectQuery::Extend),
            monitored_only: true,
            ..HostGetParams::default()
        };
        assert_eq!(
            serde_json::to_value(params).unwrap(),
            json!({"groupids": ["2"], "monitored_hosts": true, "selectGroups": "extend"})
        );
    }
}
