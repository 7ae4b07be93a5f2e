use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::Result;
use crate::error::ZbxError;
use crate::zbx_client::Session;
use crate::zbx_client::params::GetParameters;
use crate::zbx_client::wire::{
    lenient_string, map_rows, non_empty, parse_opt_int, parse_opt_timestamp, parse_timestamp_ns,
};

use super::item::ValueType;

/// One collected value. The log fields are only set for log items.
#[derive(Clone, Debug, PartialEq)]
pub struct History {
    pub item_id: String,
    pub timestamp: DateTime<Utc>,
    pub value: String,
    pub log_event_id: Option<i64>,
    /// Windows event log severity.
    pub log_severity: Option<i64>,
    pub log_source: Option<String>,
    pub log_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawHistory {
    #[serde(deserialize_with = "lenient_string")]
    itemid: String,
    #[serde(deserialize_with = "lenient_string")]
    clock: String,
    #[serde(deserialize_with = "lenient_string")]
    ns: String,
    #[serde(deserialize_with = "lenient_string")]
    value: String,
    #[serde(deserialize_with = "lenient_string")]
    logeventid: String,
    #[serde(deserialize_with = "lenient_string")]
    severity: String,
    #[serde(deserialize_with = "lenient_string")]
    source: String,
    #[serde(deserialize_with = "lenient_string")]
    timestamp: String,
}

impl TryFrom<RawHistory> for History {
    type Error = ZbxError;

    fn try_from(raw: RawHistory) -> std::result::Result<Self, ZbxError> {
        Ok(Self {
            timestamp: parse_timestamp_ns("clock", &raw.clock, &raw.ns)?,
            log_event_id: parse_opt_int("logeventid", &raw.logeventid)?,
            log_severity: parse_opt_int("severity", &raw.severity)?,
            log_timestamp: parse_opt_timestamp("timestamp", &raw.timestamp)?,
            log_source: (!raw.source.is_empty()).then_some(raw.source),
            item_id: raw.itemid,
            value: raw.value,
        })
    }
}

/// Parameters for `history.get`.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize)]
pub struct HistoryGetParams {
    #[serde(flatten)]
    pub common: GetParameters,
    /// History table to read; the server defaults to [`ValueType::Unsigned`].
    pub history: Option<ValueType>,
    #[serde(rename = "hostids")]
    pub host_ids: Option<Vec<String>>,
    #[serde(rename = "itemids")]
    pub item_ids: Option<Vec<String>>,
    pub time_from: Option<i64>,
    pub time_till: Option<i64>,
}

impl Session {
    /// Query `history.get`.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::NotFound`] when nothing matches, or any call or
    /// mapping error.
    pub async fn history(&self, params: &HistoryGetParams) -> Result<Vec<History>> {
        let rows: Vec<RawHistory> = self.get("history.get", params).await?;
        Ok(map_rows("History", non_empty("history", rows)?)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{History, HistoryGetParams, RawHistory};
    use crate::zbx_client::objects::item::ValueType;
    use crate::zbx_client::wire::map_rows;

    #[test]
    fn log_severity_is_kept_apart_from_event_id() {
        let rows: Vec<RawHistory> = serde_json::from_value(json!([
            {"itemid": "1", "clock": "1700000000", "ns": "42", "value": "0.5"},
            {
                "itemid": "2", "clock": "1700000001", "ns": "0", "value": "login failed",
                "logeventid": "4625", "severity": "3", "source": "Security", "timestamp": "0"
            }
        ]))
        .unwrap();
        let history: Vec<History> = map_rows("History", rows).unwrap();
        assert_eq!(history[0].timestamp.timestamp_subsec_nanos(), 42);
        assert_eq!(history[0].log_event_id, None);
        assert_eq!(history[1].log_event_id, Some(4625));
        assert_eq!(history[1].log_severity, Some(3));
        assert_eq!(history[1].log_source.as_deref(), Some("Security"));
        assert_eq!(history[1].log_timestamp, None);
    }

    #[test]
    fn history_table_is_a_numeric_code() {
        let params = HistoryGetParams {
            history: Some(ValueType::Float),
            item_ids: Some(vec!["1".into()]),
            time_from: Some(1_700_000_000),
            ..HistoryGetParams::default()
        };
        assert_eq!(
            serde_json::to_value(params).unwrap(),
            json!({"history": 0, "itemids": ["1"], "time_from": 1_700_000_000})
        );
    }
}
