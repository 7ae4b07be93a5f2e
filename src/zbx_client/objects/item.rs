use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::Result;
use crate::error::ZbxError;
use crate::zbx_client::Session;
use crate::zbx_client::params::{GetParameters, SelectQuery, TagFilter};
use crate::zbx_client::wire::{
    code_enum, is_false, lenient_string, map_rows, non_empty, parse_opt_timestamp,
};

code_enum! {
    /// Type of information an item stores; also selects the history table.
    pub enum ValueType {
        Float = 0,
        Character = 1,
        Log = 2,
        Unsigned = 3,
        Text = 4,
        Binary = 5,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub item_id: String,
    pub host_id: String,
    pub name: String,
    pub key: String,
    pub description: String,
    pub units: String,
    pub enabled: bool,
    pub value_type: ValueType,
    pub last_clock: Option<DateTime<Utc>>,
    pub last_value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawItem {
    #[serde(deserialize_with = "lenient_string")]
    itemid: String,
    #[serde(deserialize_with = "lenient_string")]
    hostid: String,
    #[serde(deserialize_with = "lenient_string")]
    name: String,
    #[serde(rename = "key_", deserialize_with = "lenient_string")]
    key: String,
    #[serde(deserialize_with = "lenient_string")]
    description: String,
    #[serde(deserialize_with = "lenient_string")]
    units: String,
    #[serde(deserialize_with = "lenient_string")]
    status: String,
    #[serde(deserialize_with = "lenient_string")]
    value_type: String,
    #[serde(deserialize_with = "lenient_string")]
    lastclock: String,
    #[serde(deserialize_with = "lenient_string")]
    lastvalue: String,
}

impl TryFrom<RawItem> for Item {
    type Error = ZbxError;

    fn try_from(raw: RawItem) -> std::result::Result<Self, ZbxError> {
        if raw.itemid.is_empty() {
            return Err(ZbxError::MissingField { field: "itemid" });
        }
        Ok(Self {
            value_type: ValueType::parse("value_type", &raw.value_type)?,
            last_clock: parse_opt_timestamp("lastclock", &raw.lastclock)?,
            enabled: matches!(raw.status.trim(), "0" | ""),
            item_id: raw.itemid,
            host_id: raw.hostid,
            name: raw.name,
            key: raw.key,
            description: raw.description,
            units: raw.units,
            last_value: raw.lastvalue,
        })
    }
}

/// Parameters for `item.get`.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize)]
pub struct ItemGetParams {
    #[serde(flatten)]
    pub common: GetParameters,
    #[serde(rename = "itemids")]
    pub item_ids: Option<Vec<String>>,
    #[serde(rename = "groupids")]
    pub group_ids: Option<Vec<String>>,
    #[serde(rename = "templateids")]
    pub template_ids: Option<Vec<String>>,
    #[serde(rename = "hostids")]
    pub host_ids: Option<Vec<String>>,
    #[serde(rename = "proxyids")]
    pub proxy_ids: Option<Vec<String>>,
    #[serde(rename = "interfaceids")]
    pub interface_ids: Option<Vec<String>>,
    #[serde(rename = "graphids")]
    pub graph_ids: Option<Vec<String>>,
    #[serde(rename = "triggerids")]
    pub trigger_ids: Option<Vec<String>>,
    #[serde(rename = "webitems", skip_serializing_if = "is_false")]
    pub web_items: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub inherited: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub templated: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub monitored: bool,
    pub group: Option<String>,
    pub host: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub with_triggers: bool,
    pub tags: Option<Vec<TagFilter>>,
    #[serde(rename = "selectHosts")]
    pub select_hosts: Option<SelectQuery>,
    #[serde(rename = "selectTriggers")]
    pub select_triggers: Option<SelectQuery>,
    #[serde(rename = "selectTags")]
    pub select_tags: Option<SelectQuery>,
}

impl Session {
    /// Query `item.get`.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::NotFound`] when nothing matches, or any call or
    /// mapping error.
    pub async fn items(&self, params: &ItemGetParams) -> Result<Vec<Item>> {
        let rows: Vec<RawItem> = self.get("item.get", params).await?;
        Ok(map_rows("Item", non_empty("items", rows)?)?)
    }
}
