//! Decoding helpers for the loosely-typed Zabbix wire format.
//!
//! Raw row types keep every scalar as text via [`lenient_string`]; the
//! conversion into a domain type goes through the `parse_*` functions so that
//! a bad value surfaces as [`ZbxError::InvalidField`] naming the field, and
//! [`map_rows`] adds the entity name and row index.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

use crate::error::ZbxError;
use crate::types::Severity;

type FieldResult<T> = std::result::Result<T, ZbxError>;

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Scalar {
    fn into_text(self) -> Option<String> {
        match self {
            Self::Str(value) => Some(value),
            Self::Int(value) => Some(value.to_string()),
            Self::UInt(value) => Some(value.to_string()),
            Self::Float(value) => Some(value.to_string()),
            Self::Bool(value) => Some(if value { "1" } else { "0" }.to_string()),
            Self::Null => None,
        }
    }
}

/// Accept a string, number, bool or null and keep its textual form. Null
/// becomes the empty string.
pub(crate) fn lenient_string<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Scalar::deserialize(de)?.into_text().unwrap_or_default())
}

pub(crate) fn lenient_opt_string<'de, D>(de: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Scalar::deserialize(de)?.into_text())
}

/// Decode an embedded object that older servers send as `[]` (or omit) when
/// there is nothing to embed.
pub(crate) fn object_or_empty<'de, D, T>(de: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(de)? {
        Value::Null => Ok(None),
        Value::Array(items) if items.is_empty() => Ok(None),
        other => T::deserialize(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

pub(crate) fn parse_int<T>(field: &'static str, raw: &str) -> FieldResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|err| ZbxError::InvalidField {
            field,
            message: format!("{err} (got {raw:?})"),
        })
}

/// Like [`parse_int`] but an empty value yields `None`.
pub(crate) fn parse_opt_int<T>(field: &'static str, raw: &str) -> FieldResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_int(field, raw).map(Some)
}

/// `"1"`/`"true"` and `"0"`/`"false"`; anything else is rejected. An empty
/// value reads as false.
pub(crate) fn parse_flag(field: &'static str, raw: &str) -> FieldResult<bool> {
    match raw.trim() {
        "1" | "true" | "TRUE" => Ok(true),
        "0" | "false" | "FALSE" | "" => Ok(false),
        other => Err(ZbxError::InvalidField {
            field,
            message: format!("invalid boolean {other:?}"),
        }),
    }
}

pub(crate) fn parse_severity(field: &'static str, raw: &str) -> FieldResult<Severity> {
    parse_int::<i64>(field, raw).map(Severity::from_zabbix)
}

/// Zabbix uses `"0"` for "no reference" in id columns such as `proxy_hostid`.
pub(crate) fn non_zero_id(raw: String) -> Option<String> {
    match raw.trim() {
        "" | "0" => None,
        _ => Some(raw),
    }
}

pub(crate) fn parse_timestamp(field: &'static str, raw: &str) -> FieldResult<DateTime<Utc>> {
    parse_timestamp_ns(field, raw, "")
}

/// Unix seconds plus an optional nanosecond column.
pub(crate) fn parse_timestamp_ns(
    field: &'static str,
    secs: &str,
    nanos: &str,
) -> FieldResult<DateTime<Utc>> {
    let secs: i64 = parse_int(field, secs)?;
    let nanos: u32 = parse_opt_int(field, nanos)?.unwrap_or(0);
    DateTime::from_timestamp(secs, nanos).ok_or_else(|| ZbxError::InvalidField {
        field,
        message: format!("timestamp {secs}.{nanos:09} out of range"),
    })
}

/// A timestamp column where `"0"` or an empty value means "never".
pub(crate) fn parse_opt_timestamp(
    field: &'static str,
    raw: &str,
) -> FieldResult<Option<DateTime<Utc>>> {
    match parse_opt_int::<i64>(field, raw)? {
        None | Some(0) => Ok(None),
        Some(_) => parse_timestamp(field, raw).map(Some),
    }
}

/// Plain seconds (`"3600"`) or a suffixed duration (`"1h"`, `"30m"`).
pub(crate) fn parse_duration(field: &'static str, raw: &str) -> FieldResult<Duration> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(raw).map_err(|err| ZbxError::InvalidField {
        field,
        message: format!("{err} (got {raw:?})"),
    })
}

/// Convert every raw row, tagging the first failure with entity and index.
pub(crate) fn map_rows<R, T>(entity: &'static str, rows: Vec<R>) -> FieldResult<Vec<T>>
where
    T: TryFrom<R, Error = ZbxError>,
{
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            T::try_from(row).map_err(|source| ZbxError::Mapping {
                entity,
                index,
                source: Box::new(source),
            })
        })
        .collect()
}

/// Empty collections are the not-found condition of the entity layer.
pub(crate) fn non_empty<T>(entity: &'static str, rows: Vec<T>) -> FieldResult<Vec<T>> {
    if rows.is_empty() {
        return Err(ZbxError::NotFound { entity });
    }
    Ok(rows)
}

/// A list of ids that may arrive as strings or numbers, e.g. `{"proxyids": [12]}`.
pub(crate) fn lenient_ids<'de, D>(de: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Vec::<Scalar>::deserialize(de)?
        .into_iter()
        .filter_map(Scalar::into_text)
        .collect())
}

/// Zabbix expects `0`/`1` rather than JSON booleans for these parameters.
pub(crate) fn flag_as_int<S>(value: &bool, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u8(u8::from(*value))
}

pub(crate) fn unix_seconds<S>(
    value: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_i64(value.timestamp())
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

/// Declare an enumeration of Zabbix integer codes with an `Unknown` fallback,
/// so values added by newer servers still decode.
macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        $vis enum $name {
            $($(#[$vmeta])* $variant,)+
            Unknown(i64),
        }

        impl $name {
            pub fn from_code(code: i64) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    other => Self::Unknown(other),
                }
            }

            pub fn code(self) -> i64 {
                match self {
                    $(Self::$variant => $code,)+
                    Self::Unknown(code) => code,
                }
            }

            #[allow(dead_code)]
            pub(crate) fn parse(
                field: &'static str,
                raw: &str,
            ) -> std::result::Result<Self, $crate::error::ZbxError> {
                $crate::zbx_client::wire::parse_int::<i64>(field, raw).map(Self::from_code)
            }

            /// An empty column yields `None`.
            #[allow(dead_code)]
            pub(crate) fn parse_opt(
                field: &'static str,
                raw: &str,
            ) -> std::result::Result<Option<Self>, $crate::error::ZbxError> {
                $crate::zbx_client::wire::parse_opt_int::<i64>(field, raw)
                    .map(|code| code.map(Self::from_code))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str(stringify!($variant)),)+
                    Self::Unknown(code) => write!(f, "Unknown({code})"),
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_i64(self.code())
            }
        }
    };
}

pub(crate) use code_enum;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::Deserialize;

    use super::{
        lenient_opt_string, lenient_string, map_rows, non_empty, non_zero_id, object_or_empty,
        parse_duration, parse_flag, parse_int, parse_opt_timestamp, parse_timestamp_ns,
    };
    use super::code_enum;
    use crate::error::ZbxError;

    #[derive(Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "lenient_string")]
        status: String,
        #[serde(default, deserialize_with = "lenient_opt_string")]
        available: Option<String>,
        #[serde(default, deserialize_with = "object_or_empty")]
        nested: Option<Inner>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Inner {
        id: String,
    }

    struct Typed(u8);

    impl TryFrom<Row> for Typed {
        type Error = ZbxError;

        fn try_from(row: Row) -> Result<Self, ZbxError> {
            parse_int("status", &row.status).map(Typed)
        }
    }

    fn row(json: &str) -> Row {
        match serde_json::from_str(json) {
            Ok(row) => row,
            Err(err) => panic!("failed to decode row {json}: {err}"),
        }
    }

    #[test]
    fn lenient_strings_accept_numbers_and_null() {
        assert_eq!(row(r#"{"status":"1"}"#).status, "1");
        assert_eq!(row(r#"{"status":1}"#).status, "1");
        assert_eq!(row(r#"{"status":true}"#).status, "1");
        assert_eq!(row(r#"{"status":null}"#).status, "");
        assert_eq!(row("{}").status, "");
        assert_eq!(row(r#"{"available":null}"#).available, None);
        assert_eq!(row(r#"{"available":2}"#).available.as_deref(), Some("2"));
    }

    #[test]
    fn empty_array_reads_as_absent_object() {
        assert_eq!(row(r#"{"nested":[]}"#).nested, None);
        assert_eq!(
            row(r#"{"nested":{"id":"5"}}"#).nested,
            Some(Inner { id: "5".into() })
        );
    }

    #[test]
    fn flags_reject_garbage() {
        assert!(parse_flag("main", "1").unwrap_or(false));
        assert!(!parse_flag("main", "0").unwrap_or(true));
        assert!(parse_flag("main", "true").unwrap_or(false));
        assert!(parse_flag("main", "yes").is_err());
    }

    #[test]
    fn timestamps_combine_seconds_and_nanos() {
        let ts = parse_timestamp_ns("clock", "1700000000", "500").unwrap_or_default();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_nanos(), 500);
        assert!(parse_timestamp_ns("clock", "soon", "").is_err());
        assert!(matches!(parse_opt_timestamp("lastaccess", "0"), Ok(None)));
    }

    #[test]
    fn durations_accept_seconds_and_suffixes() {
        assert_eq!(parse_duration("esc_period", "3600").ok(), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("esc_period", "1h").ok(), Some(Duration::from_secs(3600)));
        assert!(parse_duration("esc_period", "{$MACRO}").is_err());
    }

    #[test]
    fn map_rows_reports_index_and_field() {
        let rows = vec![row(r#"{"status":"1"}"#), row(r#"{"status":"x"}"#)];
        match map_rows::<Row, Typed>("Host", rows) {
            Err(ZbxError::Mapping { entity, index, source }) => {
                assert_eq!(entity, "Host");
                assert_eq!(index, 1);
                assert!(matches!(*source, ZbxError::InvalidField { field: "status", .. }));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("mapping should fail"),
        }
        let ok = map_rows::<Row, Typed>("Host", vec![row(r#"{"status":"4"}"#)]);
        assert_eq!(ok.map(|v| v[0].0).ok(), Some(4));
    }

    #[derive(Deserialize)]
    struct Created {
        #[serde(deserialize_with = "super::lenient_ids")]
        proxyids: Vec<String>,
    }

    code_enum! {
        enum Mode {
            Active = 5,
            Passive = 6,
        }
    }

    #[test]
    fn id_lists_accept_numbers() {
        let created: Created = serde_json::from_str(r#"{"proxyids":[12,"13"]}"#).unwrap();
        assert_eq!(created.proxyids, vec!["12", "13"]);
    }

    #[test]
    fn code_enums_fall_back_to_unknown() {
        assert_eq!(Mode::parse("status", "5").ok(), Some(Mode::Active));
        assert_eq!(Mode::parse("status", "7").ok(), Some(Mode::Unknown(7)));
        assert_eq!(Mode::Unknown(7).code(), 7);
        assert!(matches!(Mode::parse_opt("status", ""), Ok(None)));
        assert!(Mode::parse("status", "active").is_err());
        assert_eq!(serde_json::to_string(&Mode::Passive).unwrap(), "6");
        assert_eq!(Mode::Active.to_string(), "Active");
    }

    #[test]
    fn empty_rows_are_not_found() {
        assert!(matches!(
            non_empty::<u8>("hosts", Vec::new()),
            Err(ZbxError::NotFound { entity: "hosts" })
        ));
        assert_eq!(non_zero_id("0".into()), None);
        assert_eq!(non_zero_id("10084".into()).as_deref(), Some("10084"));
    }
}
