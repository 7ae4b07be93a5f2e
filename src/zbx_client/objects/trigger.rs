use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::Result;
use crate::error::ZbxError;
use crate::types::Severity;
use crate::zbx_client::Session;
use crate::zbx_client::params::{GetParameters, SelectQuery, Tag, TagFilter};
use crate::zbx_client::wire::{
    code_enum, is_false, lenient_string, map_rows, non_empty, object_or_empty, parse_opt_timestamp,
    parse_severity,
};

use super::event::{Event, RawEvent, TriggerValue};
use super::host::{Host, RawHost};
use super::hostgroup::{Hostgroup, RawHostgroup};

code_enum! {
    pub enum TriggerState {
        Normal = 0,
        /// The expression could not be evaluated.
        Indeterminate = 1,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Trigger {
    pub trigger_id: String,
    pub description: String,
    pub expression: String,
    pub comments: String,
    pub url: String,
    pub enabled: bool,
    pub value: Option<TriggerValue>,
    pub state: Option<TriggerState>,
    pub severity: Option<Severity>,
    pub last_change: Option<DateTime<Utc>>,
    pub hosts: Vec<Host>,
    pub groups: Vec<Hostgroup>,
    pub tags: Vec<Tag>,
    pub last_event: Option<Event>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawTrigger {
    #[serde(deserialize_with = "lenient_string")]
    triggerid: String,
    #[serde(deserialize_with = "lenient_string")]
    description: String,
    #[serde(deserialize_with = "lenient_string")]
    expression: String,
    #[serde(deserialize_with = "lenient_string")]
    comments: String,
    #[serde(deserialize_with = "lenient_string")]
    url: String,
    #[serde(deserialize_with = "lenient_string")]
    status: String,
    #[serde(deserialize_with = "lenient_string")]
    value: String,
    #[serde(deserialize_with = "lenient_string")]
    state: String,
    #[serde(deserialize_with = "lenient_string")]
    priority: String,
    #[serde(deserialize_with = "lenient_string")]
    lastchange: String,
    hosts: Vec<RawHost>,
    groups: Vec<RawHostgroup>,
    tags: Vec<Tag>,
    #[serde(rename = "lastEvent", deserialize_with = "object_or_empty")]
    last_event: Option<RawEvent>,
}

impl TryFrom<RawTrigger> for Trigger {
    type Error = ZbxError;

    fn try_from(raw: RawTrigger) -> std::result::Result<Self, ZbxError> {
        // status 0 is "enabled", 1 is "disabled"
        let enabled = matches!(raw.status.trim(), "0" | "");
        let last_event = match raw.last_event {
            Some(event) => Some(Event::try_from(event)?),
            None => None,
        };
        let severity = if raw.priority.is_empty() {
            None
        } else {
            Some(parse_severity("priority", &raw.priority)?)
        };
        Ok(Self {
            enabled,
            value: TriggerValue::parse_opt("value", &raw.value)?,
            state: TriggerState::parse_opt("state", &raw.state)?,
            severity,
            last_change: parse_opt_timestamp("lastchange", &raw.lastchange)?,
            hosts: map_rows("Host", raw.hosts)?,
            groups: map_rows("Hostgroup", raw.groups)?,
            last_event,
            trigger_id: raw.triggerid,
            description: raw.description,
            expression: raw.expression,
            comments: raw.comments,
            url: raw.url,
            tags: raw.tags,
        })
    }
}

/// Parameters for `trigger.get`.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize)]
pub struct TriggerGetParams {
    #[serde(flatten)]
    pub common: GetParameters,
    #[serde(rename = "triggerids")]
    pub trigger_ids: Option<Vec<String>>,
    #[serde(rename = "groupids")]
    pub group_ids: Option<Vec<String>>,
    #[serde(rename = "templateids")]
    pub template_ids: Option<Vec<String>>,
    #[serde(rename = "hostids")]
    pub host_ids: Option<Vec<String>>,
    #[serde(rename = "itemids")]
    pub item_ids: Option<Vec<String>>,
    pub group: Option<String>,
    pub host: Option<String>,
    #[serde(rename = "inherited", skip_serializing_if = "is_false")]
    pub inherited_only: bool,
    #[serde(rename = "templated", skip_serializing_if = "is_false")]
    pub templated_only: bool,
    #[serde(rename = "monitored", skip_serializing_if = "is_false")]
    pub monitored_only: bool,
    #[serde(rename = "active", skip_serializing_if = "is_false")]
    pub active_only: bool,
    #[serde(rename = "maintenance")]
    pub in_maintenance: Option<bool>,
    #[serde(rename = "withUnacknowledgedEvents", skip_serializing_if = "is_false")]
    pub with_unacknowledged_events: bool,
    #[serde(rename = "withAcknowledgedEvents", skip_serializing_if = "is_false")]
    pub with_acknowledged_events: bool,
    #[serde(rename = "withLastEventUnacknowledged", skip_serializing_if = "is_false")]
    pub with_last_event_unacknowledged: bool,
    #[serde(rename = "skipDependent", skip_serializing_if = "is_false")]
    pub skip_dependent: bool,
    /// Only triggers currently in problem state or recently recovered.
    #[serde(rename = "only_true", skip_serializing_if = "is_false")]
    pub recent_problem_only: bool,
    pub min_severity: Option<Severity>,
    pub tags: Option<Vec<TagFilter>>,
    #[serde(rename = "expandComment", skip_serializing_if = "is_false")]
    pub expand_comment: bool,
    #[serde(rename = "expandDescription", skip_serializing_if = "is_false")]
    pub expand_description: bool,
    #[serde(rename = "expandExpression", skip_serializing_if = "is_false")]
    pub expand_expression: bool,
    #[serde(rename = "selectGroups")]
    pub select_groups: Option<SelectQuery>,
    #[serde(rename = "selectHosts")]
    pub select_hosts: Option<SelectQuery>,
    #[serde(rename = "selectItems")]
    pub select_items: Option<SelectQuery>,
    #[serde(rename = "selectFunctions")]
    pub select_functions: Option<SelectQuery>,
    #[serde(rename = "selectDependencies")]
    pub select_dependencies: Option<SelectQuery>,
    #[serde(rename = "selectLastEvent")]
    pub select_last_event: Option<SelectQuery>,
    #[serde(rename = "selectTags")]
    pub select_tags: Option<SelectQuery>,
}

impl Session {
    /// Query `trigger.get`.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::NotFound`] when nothing matches, or any call or
    /// mapping error.
    pub async fn triggers(&self, params: &TriggerGetParams) -> Result<Vec<Trigger>> {
        let rows: Vec<RawTrigger> = self.get("trigger.get", params).await?;
        Ok(map_rows("Trigger", non_empty("triggers", rows)?)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{RawTrigger, Trigger, TriggerGetParams, TriggerState};
    use crate::types::Severity;
    use crate::zbx_client::objects::event::TriggerValue;
    use crate::zbx_client::wire::map_rows;

    fn decode(rows: serde_json::Value) -> Vec<Trigger> {
        let rows: Vec<RawTrigger> = serde_json::from_value(rows).unwrap();
        map_rows("Trigger", rows).unwrap()
    }

    #[test]
    fn status_zero_means_enabled() {
        let triggers = decode(json!([
            {"triggerid": "1", "status": "0", "value": "1", "state": "0", "priority": "3"},
            {"triggerid": "2", "status": "1", "value": "0", "state": "1", "priority": "0"}
        ]));
        assert!(triggers[0].enabled);
        assert_eq!(triggers[0].value, Some(TriggerValue::Problem));
        assert_eq!(triggers[0].severity, Some(Severity::Average));
        assert!(!triggers[1].enabled);
        assert_eq!(triggers[1].state, Some(TriggerState::Indeterminate));
    }

    #[test]
    fn empty_last_event_array_is_absent() {
        let triggers = decode(json!([
            {"triggerid": "1", "lastEvent": []},
            {"triggerid": "2", "lastEvent": {
                "eventid": "9", "source": "0", "object": "0", "clock": "1700000000", "value": "1"
            }}
        ]));
        assert_eq!(triggers[0].last_event, None);
        assert_eq!(triggers[1].last_event.as_ref().map(|e| e.event_id.as_str()), Some("9"));
    }

    #[test]
    fn min_severity_is_sent_as_code() {
        let params = TriggerGetParams {
            min_severity: Some(Severity::High),
            recent_problem_only: true,
            ..TriggerGetParams::default()
        };
        assert_eq!(
            serde_json::to_value(params).unwrap(),
            json!({"only_true": true, "min_severity": 4})
        );
    }
}
