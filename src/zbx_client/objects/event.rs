use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::Result;
use crate::error::ZbxError;
use crate::types::Severity;
use crate::zbx_client::Session;
use crate::zbx_client::params::{GetParameters, SelectQuery, Tag};
use crate::zbx_client::wire::{
    code_enum, lenient_string, map_rows, non_empty, parse_flag, parse_int, parse_severity,
    parse_timestamp_ns,
};

use super::host::{Host, RawHost};

code_enum! {
    pub enum EventSource {
        Trigger = 0,
        Discovery = 1,
        AutoRegistration = 2,
        Internal = 3,
        Service = 4,
    }
}

code_enum! {
    pub enum EventObject {
        Trigger = 0,
        DiscoveredHost = 1,
        DiscoveredService = 2,
        AutoRegisteredHost = 3,
        Item = 4,
        LldRule = 5,
        Service = 6,
    }
}

code_enum! {
    /// Value of a trigger event, and the current value of a trigger.
    pub enum TriggerValue {
        Ok = 0,
        Problem = 1,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub event_id: String,
    pub source: EventSource,
    pub object: EventObject,
    pub object_id: String,
    pub timestamp: DateTime<Utc>,
    /// Interpretation depends on `source`; see [`Event::trigger_value`].
    pub value: i64,
    pub acknowledged: bool,
    pub name: String,
    pub severity: Option<Severity>,
    pub tags: Vec<Tag>,
    pub hosts: Vec<Host>,
}

impl Event {
    pub fn trigger_value(&self) -> Option<TriggerValue> {
        (self.source == EventSource::Trigger).then(|| TriggerValue::from_code(self.value))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawEvent {
    #[serde(deserialize_with = "lenient_string")]
    eventid: String,
    #[serde(deserialize_with = "lenient_string")]
    source: String,
    #[serde(deserialize_with = "lenient_string")]
    object: String,
    #[serde(deserialize_with = "lenient_string")]
    objectid: String,
    #[serde(deserialize_with = "lenient_string")]
    clock: String,
    #[serde(deserialize_with = "lenient_string")]
    ns: String,
    #[serde(deserialize_with = "lenient_string")]
    value: String,
    #[serde(deserialize_with = "lenient_string")]
    acknowledged: String,
    #[serde(deserialize_with = "lenient_string")]
    name: String,
    #[serde(deserialize_with = "lenient_string")]
    severity: String,
    tags: Vec<Tag>,
    hosts: Vec<RawHost>,
}

impl TryFrom<RawEvent> for Event {
    type Error = ZbxError;

    fn try_from(raw: RawEvent) -> std::result::Result<Self, ZbxError> {
        Ok(Self {
            source: EventSource::parse("source", &raw.source)?,
            object: EventObject::parse("object", &raw.object)?,
            timestamp: parse_timestamp_ns("clock", &raw.clock, &raw.ns)?,
            value: parse_int("value", &raw.value)?,
            acknowledged: parse_flag("acknowledged", &raw.acknowledged)?,
            severity: if raw.severity.is_empty() {
                None
            } else {
                Some(parse_severity("severity", &raw.severity)?)
            },
            hosts: map_rows("Host", raw.hosts)?,
            event_id: raw.eventid,
            object_id: raw.objectid,
            name: raw.name,
            tags: raw.tags,
        })
    }
}

/// Parameters for `event.get`.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize)]
pub struct EventGetParams {
    #[serde(flatten)]
    pub common: GetParameters,
    #[serde(rename = "eventids")]
    pub event_ids: Option<Vec<String>>,
    #[serde(rename = "groupids")]
    pub group_ids: Option<Vec<String>>,
    #[serde(rename = "hostids")]
    pub host_ids: Option<Vec<String>>,
    #[serde(rename = "objectids")]
    pub object_ids: Option<Vec<String>>,
    pub source: Option<EventSource>,
    pub object: Option<EventObject>,
    pub acknowledged: Option<bool>,
    pub severities: Option<Vec<Severity>>,
    #[serde(rename = "eventid_from")]
    pub min_event_id: Option<String>,
    #[serde(rename = "eventid_till")]
    pub max_event_id: Option<String>,
    pub time_from: Option<i64>,
    pub time_till: Option<i64>,
    pub value: Option<Vec<i64>>,
    #[serde(rename = "selectHosts")]
    pub select_hosts: Option<SelectQuery>,
    #[serde(rename = "selectRelatedObject")]
    pub select_related_object: Option<SelectQuery>,
    #[serde(rename = "select_alerts")]
    pub select_alerts: Option<SelectQuery>,
    #[serde(rename = "select_acknowledges")]
    pub select_acknowledges: Option<SelectQuery>,
    #[serde(rename = "selectTags")]
    pub select_tags: Option<SelectQuery>,
}

impl Session {
    /// Query `event.get`.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::NotFound`] when nothing matches, or any call or
    /// mapping error.
    pub async fn events(&self, params: &EventGetParams) -> Result<Vec<Event>> {
        let rows: Vec<RawEvent> = self.get("event.get", params).await?;
        Ok(map_rows("Event", non_empty("events", rows)?)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Event, EventGetParams, EventObject, EventSource, RawEvent, TriggerValue};
    use crate::error::ZbxError;
    use crate::types::Severity;
    use crate::zbx_client::wire::map_rows;

    fn decode(rows: serde_json::Value) -> Result<Vec<Event>, ZbxError> {
        let rows: Vec<RawEvent> = serde_json::from_value(rows).unwrap();
        map_rows("Event", rows)
    }

    #[test]
    fn maps_trigger_event_with_nanoseconds() {
        let events = decode(json!([{
            "eventid": "9",
            "source": "0",
            "object": "0",
            "objectid": "13491",
            "clock": "1700000000",
            "ns": "250",
            "value": "1",
            "acknowledged": "0",
            "name": "High CPU",
            "severity": "4",
            "tags": [{"tag": "scope", "value": "performance"}],
            "hosts": [{"hostid": "10084", "host": "web01"}]
        }]))
        .unwrap();
        let event = &events[0];
        assert_eq!(event.source, EventSource::Trigger);
        assert_eq!(event.object, EventObject::Trigger);
        assert_eq!(event.timestamp.timestamp_subsec_nanos(), 250);
        assert_eq!(event.trigger_value(), Some(TriggerValue::Problem));
        assert_eq!(event.severity, Some(Severity::High));
        assert_eq!(event.tags[0].tag, "scope");
        assert_eq!(event.hosts[0].hostname, "web01");
    }

    #[test]
    fn new_sources_do_not_fail() {
        let events = decode(json!([{
            "eventid": "1", "source": "9", "object": "0", "clock": "1", "value": "0"
        }]))
        .unwrap();
        assert_eq!(events[0].source, EventSource::Unknown(9));
        assert_eq!(events[0].trigger_value(), None);
    }

    #[test]
    fn bad_clock_reports_event_index() {
        let err = decode(json!([
            {"eventid": "1", "source": "0", "object": "0", "clock": "1", "value": "0"},
            {"eventid": "2", "source": "0", "object": "0", "clock": "never", "value": "0"}
        ]))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "error mapping Event 1 in response: invalid field clock: \
             invalid digit found in string (got \"never\")"
        );
    }

    #[test]
    fn unset_filters_are_not_sent() {
        let params = EventGetParams {
            source: Some(EventSource::Trigger),
            acknowledged: Some(false),
            ..EventGetParams::default()
        };
        assert_eq!(
            serde_json::to_value(params).unwrap(),
            json!({"source": 0, "acknowledged": false})
        );
    }
}
