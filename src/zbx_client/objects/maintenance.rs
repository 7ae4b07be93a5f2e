use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use tracing::debug;

use crate::Result;
use crate::error::ZbxError;
use crate::zbx_client::Session;
use crate::zbx_client::params::{GetParameters, SelectQuery, Tag};
use crate::zbx_client::wire::{
    code_enum, lenient_ids, lenient_string, map_rows, non_empty, parse_int, parse_opt_int,
    parse_opt_timestamp, parse_timestamp, unix_seconds,
};

use super::host::{Host, HostGetParams, RawHost};
use super::hostgroup::{Hostgroup, RawHostgroup};

code_enum! {
    pub enum MaintenanceType {
        WithDataCollection = 0,
        WithoutDataCollection = 1,
    }
}

code_enum! {
    /// How problem tags of a maintenance are combined.
    pub enum TagEvaluation {
        AndOr = 0,
        Or = 2,
    }
}

code_enum! {
    pub enum TimePeriodType {
        OneTime = 0,
        Daily = 2,
        Weekly = 3,
        Monthly = 4,
    }
}

/// A maintenance window definition. Times are seconds since midnight
/// (`start_time`) or a duration in seconds (`period`).
#[skip_serializing_none]
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TimePeriod {
    pub timeperiod_type: TimePeriodType,
    pub every: Option<u32>,
    /// Bitmask of weekdays, Monday = 1.
    pub dayofweek: Option<u32>,
    pub start_time: Option<u32>,
    pub period: u32,
    #[serde(serialize_with = "unix_seconds_opt")]
    pub start_date: Option<DateTime<Utc>>,
}

impl TimePeriod {
    pub fn one_time(start: DateTime<Utc>, period: u32) -> Self {
        Self {
            timeperiod_type: TimePeriodType::OneTime,
            every: None,
            dayofweek: None,
            start_time: None,
            period,
            start_date: Some(start),
        }
    }
}

fn unix_seconds_opt<S>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(value) => unix_seconds(value, serializer),
        None => serializer.serialize_none(),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Maintenance {
    pub maintenance_id: String,
    pub name: String,
    pub description: String,
    pub active_since: DateTime<Utc>,
    pub active_till: DateTime<Utc>,
    pub maintenance_type: MaintenanceType,
    pub tags_evaltype: Option<TagEvaluation>,
    pub time_periods: Vec<TimePeriod>,
    pub tags: Vec<Tag>,
    pub hosts: Vec<Host>,
    pub groups: Vec<Hostgroup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawMaintenance {
    #[serde(deserialize_with = "lenient_string")]
    maintenanceid: String,
    #[serde(deserialize_with = "lenient_string")]
    name: String,
    #[serde(deserialize_with = "lenient_string")]
    description: String,
    #[serde(deserialize_with = "lenient_string")]
    active_since: String,
    #[serde(deserialize_with = "lenient_string")]
    active_till: String,
    #[serde(deserialize_with = "lenient_string")]
    maintenance_type: String,
    #[serde(deserialize_with = "lenient_string")]
    tags_evaltype: String,
    timeperiods: Vec<RawTimePeriod>,
    tags: Vec<Tag>,
    hosts: Vec<RawHost>,
    groups: Vec<RawHostgroup>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawTimePeriod {
    #[serde(deserialize_with = "lenient_string")]
    timeperiod_type: String,
    #[serde(deserialize_with = "lenient_string")]
    every: String,
    #[serde(deserialize_with = "lenient_string")]
    dayofweek: String,
    #[serde(deserialize_with = "lenient_string")]
    start_time: String,
    #[serde(deserialize_with = "lenient_string")]
    period: String,
    #[serde(deserialize_with = "lenient_string")]
    start_date: String,
}

impl TryFrom<RawTimePeriod> for TimePeriod {
    type Error = ZbxError;

    fn try_from(raw: RawTimePeriod) -> std::result::Result<Self, ZbxError> {
        Ok(Self {
            timeperiod_type: TimePeriodType::parse("timeperiod_type", &raw.timeperiod_type)?,
            every: parse_opt_int("every", &raw.every)?,
            dayofweek: parse_opt_int("dayofweek", &raw.dayofweek)?,
            start_time: parse_opt_int("start_time", &raw.start_time)?,
            period: parse_int("period", &raw.period)?,
            start_date: parse_opt_timestamp("start_date", &raw.start_date)?,
        })
    }
}

impl TryFrom<RawMaintenance> for Maintenance {
    type Error = ZbxError;

    fn try_from(raw: RawMaintenance) -> std::result::Result<Self, ZbxError> {
        Ok(Self {
            active_since: parse_timestamp("active_since", &raw.active_since)?,
            active_till: parse_timestamp("active_till", &raw.active_till)?,
            maintenance_type: MaintenanceType::parse("maintenance_type", &raw.maintenance_type)?,
            tags_evaltype: TagEvaluation::parse_opt("tags_evaltype", &raw.tags_evaltype)?,
            time_periods: map_rows("TimePeriod", raw.timeperiods)?,
            hosts: map_rows("Host", raw.hosts)?,
            groups: map_rows("Hostgroup", raw.groups)?,
            maintenance_id: raw.maintenanceid,
            name: raw.name,
            description: raw.description,
            tags: raw.tags,
        })
    }
}

/// Parameters for `maintenance.get`.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Serialize)]
pub struct MaintenanceGetParams {
    #[serde(flatten)]
    pub common: GetParameters,
    #[serde(rename = "maintenanceids")]
    pub maintenance_ids: Option<Vec<String>>,
    #[serde(rename = "hostids")]
    pub host_ids: Option<Vec<String>>,
    #[serde(rename = "groupids")]
    pub group_ids: Option<Vec<String>>,
    #[serde(rename = "selectTimeperiods")]
    pub select_time_periods: Option<SelectQuery>,
    #[serde(rename = "selectHosts")]
    pub select_hosts: Option<SelectQuery>,
    #[serde(rename = "selectGroups")]
    pub select_groups: Option<SelectQuery>,
    #[serde(rename = "selectTags")]
    pub select_tags: Option<SelectQuery>,
}

/// Parameters for `maintenance.create`. `host_names` are resolved to ids
/// and appended to `host_ids` before the call.
#[skip_serializing_none]
#[derive(Clone, Debug, Serialize)]
pub struct MaintenanceCreateParams {
    pub name: String,
    #[serde(serialize_with = "unix_seconds")]
    pub active_since: DateTime<Utc>,
    #[serde(serialize_with = "unix_seconds")]
    pub active_till: DateTime<Utc>,
    pub description: Option<String>,
    pub maintenance_type: MaintenanceType,
    pub tags_evaltype: Option<TagEvaluation>,
    #[serde(rename = "groupids")]
    pub group_ids: Option<Vec<String>>,
    #[serde(rename = "hostids")]
    pub host_ids: Vec<String>,
    #[serde(skip)]
    pub host_names: Vec<String>,
    pub timeperiods: Vec<TimePeriod>,
    pub tags: Option<Vec<Tag>>,
}

impl MaintenanceCreateParams {
    /// A one-time window covering `active_since..active_till`.
    pub fn one_time(
        name: impl Into<String>,
        active_since: DateTime<Utc>,
        active_till: DateTime<Utc>,
    ) -> Self {
        let period = (active_till - active_since).num_seconds().max(0);
        Self {
            name: name.into(),
            active_since,
            active_till,
            description: None,
            maintenance_type: MaintenanceType::WithDataCollection,
            tags_evaltype: None,
            group_ids: None,
            host_ids: Vec::new(),
            host_names: Vec::new(),
            timeperiods: vec![TimePeriod::one_time(
                active_since,
                u32::try_from(period).unwrap_or(u32::MAX),
            )],
            tags: None,
        }
    }
}

#[derive(Deserialize)]
struct MaintenanceIds {
    #[serde(deserialize_with = "lenient_ids")]
    maintenanceids: Vec<String>,
}

fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Ids of every host whose technical name matches one of `names`, ignoring
/// case and surrounding whitespace.
fn match_host_ids(hosts: &[Host], names: &[String]) -> std::result::Result<Vec<String>, ZbxError> {
    let mut ids = Vec::new();
    for name in names {
        let wanted = normalize(name);
        let before = ids.len();
        ids.extend(
            hosts
                .iter()
                .filter(|host| normalize(&host.hostname) == wanted)
                .map(|host| host.host_id.clone()),
        );
        if ids.len() == before {
            return Err(ZbxError::HostNotFound { name: name.clone() });
        }
    }
    Ok(ids)
}

impl Session {
    /// Query `maintenance.get`.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::NotFound`] when nothing matches, or any call or
    /// mapping error.
    pub async fn maintenances(&self, params: &MaintenanceGetParams) -> Result<Vec<Maintenance>> {
        let rows: Vec<RawMaintenance> = self.get("maintenance.get", params).await?;
        Ok(map_rows("Maintenance", non_empty("maintenances", rows)?)?)
    }

    /// Create a maintenance, resolving `host_names` first. Returns the new
    /// maintenance ids.
    ///
    /// # Errors
    ///
    /// Returns [`ZbxError::HostNotFound`] for the first name without a
    /// matching host, or any call or decoding error.
    pub async fn create_maintenance(
        &self,
        params: &MaintenanceCreateParams,
    ) -> Result<Vec<String>> {
        let mut params = params.clone();
        if !params.host_names.is_empty() {
            let lookup = HostGetParams {
                common: GetParameters::default().output(SelectQuery::fields(["hostid", "host"])),
                ..HostGetParams::default()
            };
            let hosts = match self.hosts(&lookup).await {
                Ok(hosts) => hosts,
                Err(err) if err.is_not_found() => Vec::new(),
                Err(err) => return Err(err),
            };
            let resolved = match_host_ids(&hosts, &params.host_names)?;
            debug!(
                names = params.host_names.len(),
                ids = resolved.len(),
                "resolved maintenance hosts"
            );
            params.host_ids.extend(resolved);
        }

        let created: MaintenanceIds = self.get("maintenance.create", &params).await?;
        Ok(created.maintenanceids)
    }

    /// Delete maintenances by id and return the deleted ids.
    ///
    /// # Errors
    ///
    /// Returns any call or decoding error from `maintenance.delete`.
    pub async fn delete_maintenances(&self, maintenance_ids: &[String]) -> Result<Vec<String>> {
        let deleted: MaintenanceIds = self.get("maintenance.delete", maintenance_ids).await?;
        Ok(deleted.maintenanceids)
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use serde_json::json;

    use super::{
        Maintenance, MaintenanceCreateParams, MaintenanceType, RawMaintenance, TagEvaluation,
        TimePeriodType, match_host_ids,
    };
    use crate::error::ZbxError;
    use crate::zbx_client::objects::host::{Host, RawHost};
    use crate::zbx_client::wire::map_rows;

    fn hosts() -> Vec<Host> {
        let rows: Vec<RawHost> = serde_json::from_value(json!([
            {"hostid": "10084", "host": "Zabbix server"},
            {"hostid": "10105", "host": "web01"}
        ]))
        .unwrap();
        map_rows("Host", rows).unwrap()
    }

    #[test]
    fn type_and_tag_evaluation_are_not_swapped() {
        let rows: Vec<RawMaintenance> = serde_json::from_value(json!([{
            "maintenanceid": "3",
            "name": "Patch night",
            "active_since": "1700000000",
            "active_till": "1700086400",
            "maintenance_type": "1",
            "tags_evaltype": "2",
            "timeperiods": [{"timeperiod_type": "0", "period": "3600", "start_date": "1700000000"}]
        }]))
        .unwrap();
        let maintenances: Vec<Maintenance> = map_rows("Maintenance", rows).unwrap();
        let m = &maintenances[0];
        assert_eq!(m.maintenance_type, MaintenanceType::WithoutDataCollection);
        assert_eq!(m.tags_evaltype, Some(TagEvaluation::Or));
        assert_eq!(m.time_periods[0].timeperiod_type, TimePeriodType::OneTime);
        assert_eq!(m.time_periods[0].period, 3600);
    }

    #[test]
    fn host_names_match_case_insensitively() {
        let names = vec!["  ZABBIX SERVER ".to_string(), "Web01".to_string()];
        assert_eq!(match_host_ids(&hosts(), &names).unwrap(), vec!["10084", "10105"]);
    }

    #[test]
    fn any_unmatched_name_fails() {
        let names = vec!["web01".to_string(), "db01".to_string()];
        let err = match_host_ids(&hosts(), &names).unwrap_err();
        assert!(matches!(err, ZbxError::HostNotFound { ref name } if name == "db01"));
    }

    #[test]
    fn create_params_encode_times_as_unix_seconds() {
        let since = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let till = DateTime::from_timestamp(1_700_003_600, 0).unwrap();
        let mut params = MaintenanceCreateParams::one_time("Patch night", since, till);
        params.host_names = vec!["web01".into()];
        assert_eq!(
            serde_json::to_value(params).unwrap(),
            json!({
                "name": "Patch night",
                "active_since": 1_700_000_000,
                "active_till": 1_700_003_600,
                "maintenance_type": 0,
                "hostids": [],
                "timeperiods": [{
                    "timeperiod_type": 0,
                    "period": 3600,
                    "start_date": 1_700_000_000
                }]
            })
        );
    }
}
