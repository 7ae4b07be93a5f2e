use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_with::skip_serializing_none;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

use crate::Result;
use crate::error::ZbxError;
use crate::types::{AckFilter, Severity};
use crate::zbx_client::Session;
use crate::zbx_client::params::{GetParameters, SelectQuery, SortOrder, Tag};
use crate::zbx_client::wire::{
    lenient_ids, lenient_string, map_rows, non_empty, non_zero_id, parse_flag, parse_severity,
    parse_timestamp_ns,
};

use super::event::{EventObject, EventSource};
use super::host::{Host, RawHost};

const ACTION_ACKNOWLEDGE: u32 = 2;
const ACTION_ADD_MESSAGE: u32 = 4;
const ACTION_UNACKNOWLEDGE: u32 = 16;

const HOST_LOOKUP_TASK: &str = "event host lookup";

/// An open or recently resolved problem from `problem.get`.
#[derive(Clone, Debug, PartialEq)]
pub struct Problem {
    pub event_id: String,
    pub source: EventSource,
    pub object: EventObject,
    pub object_id: String,
    pub timestamp: DateTime<Utc>,
    pub recovery_event_id: Option<String>,
    pub recovered_at: Option<DateTime<Utc>>,
    pub name: String,
    pub severity: Severity,
    pub acknowledged: bool,
    pub suppressed: bool,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawProblem {
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
    r_eventid: String,
    #[serde(deserialize_with = "lenient_string")]
    r_clock: String,
    #[serde(deserialize_with = "lenient_string")]
    r_ns: String,
    #[serde(deserialize_with = "lenient_string")]
    name: String,
    #[serde(deserialize_with = "lenient_string")]
    severity: String,
    #[serde(deserialize_with = "lenient_string")]
    acknowledged: String,
    #[serde(deserialize_with = "lenient_string")]
    suppressed: String,
    tags: Vec<Tag>,
}

impl TryFrom<RawProblem> for Problem {
    type Error = ZbxError;

    fn try_from(raw: RawProblem) -> std::result::Result<Self, ZbxError> {
        let recovery_event_id = non_zero_id(raw.r_eventid);
        let recovered_at = match recovery_event_id {
            Some(_) => Some(parse_timestamp_ns("r_clock", &raw.r_clock, &raw.r_ns)?),
            None => None,
        };
        Ok(Self {
            source: EventSource::parse("source", &raw.source)?,
            object: EventObject::parse("object", &raw.object)?,
            timestamp: parse_timestamp_ns("clock", &raw.clock, &raw.ns)?,
            severity: parse_severity("severity", &raw.severity)?,
            acknowledged: parse_flag("acknowledged", &raw.acknowledged)?,
            suppressed: parse_flag("suppressed", &raw.suppressed)?,
            recovery_event_id,
            recovered_at,
            event_id: raw.eventid,
            object_id: raw.objectid,
            name: raw.name,
            tags: raw.tags,
        })
    }
}

/// Parameters for `problem.get`.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize)]
pub struct ProblemGetParams {
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
    pub suppressed: Option<bool>,
    pub severities: Option<Vec<Severity>>,
    /// Include problems resolved within the recovery window.
    pub recent: Option<bool>,
    pub time_from: Option<i64>,
    pub time_till: Option<i64>,
    #[serde(rename = "selectAcknowledges")]
    pub select_acknowledges: Option<SelectQuery>,
    #[serde(rename = "selectTags")]
    pub select_tags: Option<SelectQuery>,
}

impl ProblemGetParams {
    /// The newest `limit` problems, optionally filtered by acknowledgement.
    pub fn latest(limit: u32, ack: AckFilter) -> Self {
        Self {
            common: GetParameters::default()
                .output(SelectQuery::Extend)
                .limit(limit)
                .sort_by(["eventid"], SortOrder::Descending),
            acknowledged: ack.as_param(),
            recent: Some(false),
            select_tags: Some(SelectQuery::Extend),
            ..Self::default()
        }
    }
}

#[derive(Deserialize)]
struct EventIds {
    #[serde(deserialize_with = "lenient_ids")]
    eventids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EventHosts {
    hosts: Vec<RawHost>,
}

impl Session {
    /// Query `problem.get`.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::NotFound`] when nothing matches, or any call or
    /// mapping error.
    pub async fn problems(&self, params: &ProblemGetParams) -> Result<Vec<Problem>> {
        let rows: Vec<RawProblem> = self.get("problem.get", params).await?;
        Ok(map_rows("Problem", non_empty("problems", rows)?)?)
    }

    /// Acknowledge an event, attaching `message` when it is not empty.
    ///
    /// # Errors
    ///
    /// Returns any call or decoding error from `event.acknowledge`.
    pub async fn acknowledge_event(
        &self,
        event_id: &str,
        message: Option<&str>,
    ) -> Result<Vec<String>> {
        self.update_event(event_id, ACTION_ACKNOWLEDGE, message).await
    }

    /// # Errors
    ///
    /// Returns any call or decoding error from `event.acknowledge`.
    pub async fn unacknowledge_event(
        &self,
        event_id: &str,
        message: Option<&str>,
    ) -> Result<Vec<String>> {
        self.update_event(event_id, ACTION_UNACKNOWLEDGE, message).await
    }

    async fn update_event(
        &self,
        event_id: &str,
        action: u32,
        message: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut params = json!({
            "eventids": [event_id],
            "action": action,
        });
        if let Some(msg) = message.filter(|msg| !msg.is_empty()) {
            params["message"] = json!(msg);
            params["action"] = json!(action | ACTION_ADD_MESSAGE);
        }
        let updated: EventIds = self.get("event.acknowledge", &params).await?;
        Ok(updated.eventids)
    }

    /// Look up the first host of each event, running at most `concurrency`
    /// `event.get` calls at a time. Output order matches `event_ids`; events
    /// without hosts yield `None`.
    ///
    /// # Errors
    ///
    /// Returns the first call or mapping error of any lookup.
    pub async fn resolve_event_hosts(
        self: &Arc<Self>,
        event_ids: &[String],
        concurrency: usize,
    ) -> Result<Vec<Option<Host>>> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut tasks: JoinSet<(usize, Result<Option<Host>>)> = JoinSet::new();

        for (idx, event_id) in event_ids.iter().cloned().enumerate() {
            let session = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = match lookup_permit(semaphore).await {
                    Ok(permit) => permit,
                    Err(err) => return (idx, Err(err)),
                };
                (idx, session.event_host(&event_id).await)
            });
        }

        collect_indexed(tasks, event_ids.len()).await
    }

    async fn event_host(&self, event_id: &str) -> Result<Option<Host>> {
        let params = json!({
            "output": ["eventid"],
            "selectHosts": ["hostid", "host", "name", "status"],
            "eventids": [event_id],
        });
        let rows: Vec<EventHosts> = self.get("event.get", &params).await?;
        let first = rows.into_iter().flat_map(|event| event.hosts).next();
        match first {
            Some(raw) => Ok(Some(Host::try_from(raw).map_err(|source| ZbxError::Mapping {
                entity: "Host",
                index: 0,
                source: Box::new(source),
            })?)),
            None => Ok(None),
        }
    }
}

async fn lookup_permit(semaphore: Arc<Semaphore>) -> Result<OwnedSemaphorePermit> {
    semaphore.acquire_owned().await.map_err(|closed| {
        ZbxError::Task {
            task: HOST_LOOKUP_TASK,
            message: closed.to_string(),
        }
        .into()
    })
}

/// Drain `tasks` into slots by index. The first failed lookup or task wins;
/// dropping the set aborts whatever is still running.
async fn collect_indexed<T: Send + 'static>(
    mut tasks: JoinSet<(usize, Result<Option<T>>)>,
    len: usize,
) -> Result<Vec<Option<T>>> {
    let mut out: Vec<Option<T>> = std::iter::repeat_with(|| None).take(len).collect();
    while let Some(joined) = tasks.join_next().await {
        let (idx, value) = joined.map_err(|join_err| ZbxError::Task {
            task: HOST_LOOKUP_TASK,
            message: join_err.to_string(),
        })?;
        out[idx] = value?;
    }
    Ok(out)
}
