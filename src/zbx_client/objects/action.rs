use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::Result;
use crate::error::ZbxError;
use crate::zbx_client::Session;
use crate::zbx_client::params::{GetParameters, SelectQuery};
use crate::zbx_client::wire::{
    code_enum, lenient_string, map_rows, non_empty, parse_duration, parse_flag,
};

use super::event::EventSource;

code_enum! {
    pub enum EvaluationType {
        AndOr = 0,
        And = 1,
        Or = 2,
        Custom = 3,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Action {
    pub action_id: String,
    pub name: String,
    pub event_source: EventSource,
    /// Default escalation step duration.
    pub step_duration: Duration,
    /// Absent on servers that moved it into the `filter` object.
    pub evaluation_type: Option<EvaluationType>,
    pub enabled: bool,
    pub problem_subject: String,
    pub problem_body: String,
    pub recovery_subject: String,
    pub recovery_body: String,
    pub recovery_message_enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawAction {
    #[serde(deserialize_with = "lenient_string")]
    actionid: String,
    #[serde(deserialize_with = "lenient_string")]
    name: String,
    #[serde(deserialize_with = "lenient_string")]
    eventsource: String,
    #[serde(deserialize_with = "lenient_string")]
    esc_period: String,
    #[serde(deserialize_with = "lenient_string")]
    evaltype: String,
    #[serde(deserialize_with = "lenient_string")]
    status: String,
    #[serde(deserialize_with = "lenient_string")]
    def_shortdata: String,
    #[serde(deserialize_with = "lenient_string")]
    def_longdata: String,
    #[serde(deserialize_with = "lenient_string")]
    r_shortdata: String,
    #[serde(deserialize_with = "lenient_string")]
    r_longdata: String,
    #[serde(deserialize_with = "lenient_string")]
    recovery_msg: String,
}

impl TryFrom<RawAction> for Action {
    type Error = ZbxError;

    fn try_from(raw: RawAction) -> std::result::Result<Self, ZbxError> {
        Ok(Self {
            event_source: EventSource::parse("eventsource", &raw.eventsource)?,
            step_duration: parse_duration("esc_period", &raw.esc_period)?,
            evaluation_type: EvaluationType::parse_opt("evaltype", &raw.evaltype)?,
            // status 0 is "enabled"
            enabled: raw.status.trim() == "0",
            recovery_message_enabled: parse_flag("recovery_msg", &raw.recovery_msg)?,
            action_id: raw.actionid,
            name: raw.name,
            problem_subject: raw.def_shortdata,
            problem_body: raw.def_longdata,
            recovery_subject: raw.r_shortdata,
            recovery_body: raw.r_longdata,
        })
    }
}

/// Parameters for `action.get`.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize)]
pub struct ActionGetParams {
    #[serde(flatten)]
    pub common: GetParameters,
    #[serde(rename = "actionids")]
    pub action_ids: Option<Vec<String>>,
    #[serde(rename = "groupids")]
    pub group_ids: Option<Vec<String>>,
    #[serde(rename = "hostids")]
    pub host_ids: Option<Vec<String>>,
    #[serde(rename = "triggerids")]
    pub trigger_ids: Option<Vec<String>>,
    #[serde(rename = "mediatypeids")]
    pub media_type_ids: Option<Vec<String>>,
    #[serde(rename = "userids")]
    pub user_ids: Option<Vec<String>>,
    #[serde(rename = "selectFilter")]
    pub select_filter: Option<SelectQuery>,
    #[serde(rename = "selectOperations")]
    pub select_operations: Option<SelectQuery>,
    #[serde(rename = "selectRecoveryOperations")]
    pub select_recovery_operations: Option<SelectQuery>,
}

impl Session {
    /// Query `action.get`.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::NotFound`] when nothing matches, or any call or
    /// mapping error.
    pub async fn actions(&self, params: &ActionGetParams) -> Result<Vec<Action>> {
        let rows: Vec<RawAction> = self.get("action.get", params).await?;
        Ok(map_rows("Action", non_empty("actions", rows)?)?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::{Action, EvaluationType, RawAction};
    use crate::error::ZbxError;
    use crate::zbx_client::objects::event::EventSource;
    use crate::zbx_client::wire::map_rows;

    fn decode(rows: serde_json::Value) -> Result<Vec<Action>, ZbxError> {
        let rows: Vec<RawAction> = serde_json::from_value(rows).unwrap();
        map_rows("Action", rows)
    }

    #[test]
    fn recovery_body_comes_from_long_data() {
        let actions = decode(json!([{
            "actionid": "3",
            "name": "Report problems to Zabbix administrators",
            "eventsource": "0",
            "esc_period": "1h",
            "evaltype": "0",
            "status": "0",
            "def_shortdata": "Problem: {EVENT.NAME}",
            "def_longdata": "Problem started at {EVENT.TIME}",
            "r_shortdata": "Resolved: {EVENT.NAME}",
            "r_longdata": "Problem has been resolved at {EVENT.RECOVERY.TIME}",
            "recovery_msg": "1"
        }]))
        .unwrap();
        let action = &actions[0];
        assert!(action.enabled);
        assert_eq!(action.event_source, EventSource::Trigger);
        assert_eq!(action.step_duration, Duration::from_secs(3600));
        assert_eq!(action.evaluation_type, Some(EvaluationType::AndOr));
        assert_eq!(action.recovery_subject, "Resolved: {EVENT.NAME}");
        assert!(action.recovery_body.starts_with("Problem has been resolved"));
        assert!(action.recovery_message_enabled);
    }

    #[test]
    fn missing_evaltype_is_tolerated_but_bad_period_is_not() {
        let actions = decode(json!([{"eventsource": "0", "esc_period": "600", "status": "1"}]))
            .unwrap();
        assert_eq!(actions[0].evaluation_type, None);
        assert!(!actions[0].enabled);

        let err = decode(json!([{"eventsource": "0", "esc_period": "soon"}])).unwrap_err();
        assert!(err.to_string().contains("esc_period"));
    }
}
