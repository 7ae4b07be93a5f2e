use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::Result;
use crate::error::ZbxError;
use crate::zbx_client::Session;
use crate::zbx_client::params::{GetParameters, SelectQuery};
use crate::zbx_client::wire::{is_false, lenient_string, map_rows, non_empty, parse_flag};

use super::host::{Host, ObjectOrigin, RawHost};

#[derive(Clone, Debug, PartialEq)]
pub struct Hostgroup {
    pub group_id: String,
    pub name: String,
    pub origin: Option<ObjectOrigin>,
    /// Internal groups cannot be deleted.
    pub internal: bool,
    pub hosts: Vec<Host>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawHostgroup {
    #[serde(deserialize_with = "lenient_string")]
    groupid: String,
    #[serde(deserialize_with = "lenient_string")]
    name: String,
    #[serde(deserialize_with = "lenient_string")]
    flags: String,
    #[serde(deserialize_with = "lenient_string")]
    internal: String,
    hosts: Vec<RawHost>,
}

impl TryFrom<RawHostgroup> for Hostgroup {
    type Error = ZbxError;

    fn try_from(raw: RawHostgroup) -> std::result::Result<Self, ZbxError> {
        Ok(Self {
            origin: ObjectOrigin::parse_opt("flags", &raw.flags)?,
            internal: parse_flag("internal", &raw.internal)?,
            hosts: map_rows("Host", raw.hosts)?,
            group_id: raw.groupid,
            name: raw.name,
        })
    }
}

/// Parameters for `hostgroup.get`.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize)]
pub struct HostgroupGetParams {
    #[serde(flatten)]
    pub common: GetParameters,
    #[serde(rename = "graphids")]
    pub graph_ids: Option<Vec<String>>,
    #[serde(rename = "groupids")]
    pub group_ids: Option<Vec<String>>,
    #[serde(rename = "hostids")]
    pub host_ids: Option<Vec<String>>,
    #[serde(rename = "maintenanceids")]
    pub maintenance_ids: Option<Vec<String>>,
    #[serde(rename = "templateids")]
    pub template_ids: Option<Vec<String>>,
    #[serde(rename = "triggerids")]
    pub trigger_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "is_false")]
    pub monitored_hosts: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub real_hosts: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub templated_hosts: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub with_items: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub with_triggers: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub with_monitored_items: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub with_monitored_triggers: bool,
    #[serde(rename = "selectHosts")]
    pub select_hosts: Option<SelectQuery>,
    #[serde(rename = "selectTemplates")]
    pub select_templates: Option<SelectQuery>,
    #[serde(rename = "limitSelects")]
    pub limit_selects: Option<u32>,
}

impl Session {
    /// Query `hostgroup.get`.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::NotFound`] when nothing matches, or any call or
    /// mapping error.
    pub async fn hostgroups(&self, params: &HostgroupGetParams) -> Result<Vec<Hostgroup>> {
        let rows: Vec<RawHostgroup> = self.get("hostgroup.get", params).await?;
        Ok(map_rows("Hostgroup", non_empty("hostgroups", rows)?)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Hostgroup, RawHostgroup};
    use crate::zbx_client::objects::host::ObjectOrigin;
    use crate::zbx_client::wire::map_rows;

    #[test]
    fn maps_group_with_embedded_hosts() {
        let rows: Vec<RawHostgroup> = serde_json::from_value(json!([{
            "groupid": "5",
            "name": "Discovered hosts",
            "flags": "0",
            "internal": "1",
            "hosts": [{"hostid": "10084", "host": "Zabbix server"}]
        }]))
        .unwrap();
        let groups: Vec<Hostgroup> = map_rows("Hostgroup", rows).unwrap();
        assert!(groups[0].internal);
        assert_eq!(groups[0].origin, Some(ObjectOrigin::Plain));
        assert_eq!(groups[0].hosts[0].host_id, "10084");
    }
}
