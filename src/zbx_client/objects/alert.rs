use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::Result;
use crate::error::ZbxError;
use crate::zbx_client::Session;
use crate::zbx_client::params::{GetParameters, SelectQuery};
use crate::zbx_client::wire::{
    code_enum, lenient_string, map_rows, non_empty, non_zero_id, parse_int, parse_opt_int,
    parse_timestamp,
};

use super::host::{Host, RawHost};

code_enum! {
    pub enum AlertType {
        Message = 0,
        RemoteCommand = 1,
    }
}

/// A message or remote command produced by an action.
#[derive(Clone, Debug, PartialEq)]
pub struct Alert {
    pub alert_id: String,
    pub action_id: String,
    pub event_id: String,
    pub alert_type: AlertType,
    pub timestamp: DateTime<Utc>,
    pub error: String,
    pub escalation_step: u32,
    pub media_type_id: Option<String>,
    pub user_id: Option<String>,
    pub recipient: String,
    pub subject: String,
    pub message: String,
    pub retries: u32,
    /// For messages: 0 not sent, 1 sent, 2 failed. For commands: 1 run,
    /// 2 agent unavailable.
    pub status: i64,
    pub hosts: Vec<Host>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawAlert {
    #[serde(deserialize_with = "lenient_string")]
    alertid: String,
    #[serde(deserialize_with = "lenient_string")]
    actionid: String,
    #[serde(deserialize_with = "lenient_string")]
    eventid: String,
    #[serde(deserialize_with = "lenient_string")]
    alerttype: String,
    #[serde(deserialize_with = "lenient_string")]
    clock: String,
    #[serde(deserialize_with = "lenient_string")]
    error: String,
    #[serde(deserialize_with = "lenient_string")]
    esc_step: String,
    #[serde(deserialize_with = "lenient_string")]
    mediatypeid: String,
    #[serde(deserialize_with = "lenient_string")]
    userid: String,
    #[serde(deserialize_with = "lenient_string")]
    sendto: String,
    #[serde(deserialize_with = "lenient_string")]
    subject: String,
    #[serde(deserialize_with = "lenient_string")]
    message: String,
    #[serde(deserialize_with = "lenient_string")]
    retries: String,
    #[serde(deserialize_with = "lenient_string")]
    status: String,
    hosts: Vec<RawHost>,
}

impl TryFrom<RawAlert> for Alert {
    type Error = ZbxError;

    fn try_from(raw: RawAlert) -> std::result::Result<Self, ZbxError> {
        Ok(Self {
            alert_type: AlertType::parse("alerttype", &raw.alerttype)?,
            timestamp: parse_timestamp("clock", &raw.clock)?,
            escalation_step: parse_opt_int("esc_step", &raw.esc_step)?.unwrap_or(0),
            retries: parse_opt_int("retries", &raw.retries)?.unwrap_or(0),
            status: parse_int("status", &raw.status)?,
            media_type_id: non_zero_id(raw.mediatypeid),
            user_id: non_zero_id(raw.userid),
            hosts: map_rows("Host", raw.hosts)?,
            alert_id: raw.alertid,
            action_id: raw.actionid,
            event_id: raw.eventid,
            error: raw.error,
            recipient: raw.sendto,
            subject: raw.subject,
            message: raw.message,
        })
    }
}

/// Parameters for `alert.get`.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize)]
pub struct AlertGetParams {
    #[serde(flatten)]
    pub common: GetParameters,
    #[serde(rename = "alertids")]
    pub alert_ids: Option<Vec<String>>,
    #[serde(rename = "actionids")]
    pub action_ids: Option<Vec<String>>,
    #[serde(rename = "eventids")]
    pub event_ids: Option<Vec<String>>,
    #[serde(rename = "groupids")]
    pub group_ids: Option<Vec<String>>,
    #[serde(rename = "hostids")]
    pub host_ids: Option<Vec<String>>,
    #[serde(rename = "mediatypeids")]
    pub media_type_ids: Option<Vec<String>>,
    #[serde(rename = "userids")]
    pub user_ids: Option<Vec<String>>,
    pub time_from: Option<i64>,
    pub time_till: Option<i64>,
    #[serde(rename = "selectHosts")]
    pub select_hosts: Option<SelectQuery>,
    #[serde(rename = "selectMediatypes")]
    pub select_media_types: Option<SelectQuery>,
    #[serde(rename = "selectUsers")]
    pub select_users: Option<SelectQuery>,
}

impl Session {
    /// Query `alert.get`.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::NotFound`] when nothing matches, or any call or
    /// mapping error.
    pub async fn alerts(&self, params: &AlertGetParams) -> Result<Vec<Alert>> {
        let rows: Vec<RawAlert> = self.get("alert.get", params).await?;
        Ok(map_rows("Alert", non_empty("alerts", rows)?)?)
    }
}
