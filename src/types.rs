use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AckFilter {
    Acked,
    Unacked,
    All,
}

impl AckFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Acked => "ack",
            Self::Unacked => "unack",
            Self::All => "all",
        }
    }

    /// The `acknowledged` parameter of `problem.get`; `None` means no filter.
    pub fn as_param(self) -> Option<bool> {
        match self {
            Self::Acked => Some(true),
            Self::Unacked => Some(false),
            Self::All => None,
        }
    }
}

impl Display for AckFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AckFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ack" | "acked" => Ok(Self::Acked),
            "unack" | "unacked" => Ok(Self::Unacked),
            "all" => Ok(Self::All),
            other => Err(format!("unknown ack filter: {other}")),
        }
    }
}

/// Trigger, problem and event severity. Codes outside 0..=5 are kept as
/// `Unknown` and sort above `Disaster`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Severity {
    NotClassified,
    Info,
    Warning,
    Average,
    High,
    Disaster,
    Unknown(i64),
}

impl Severity {
    pub fn from_zabbix(code: i64) -> Self {
        match code {
            0 => Self::NotClassified,
            1 => Self::Info,
            2 => Self::Warning,
            3 => Self::Average,
            4 => Self::High,
            5 => Self::Disaster,
            other => Self::Unknown(other),
        }
    }

    pub fn as_zabbix_code(self) -> i64 {
        match self {
            Self::NotClassified => 0,
            Self::Info => 1,
            Self::Warning => 2,
            Self::Average => 3,
            Self::High => 4,
            Self::Disaster => 5,
            Self::Unknown(code) => code,
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::NotClassified => f.write_str("Not classified"),
            Severity::Info => f.write_str("Info"),
            Severity::Warning => f.write_str("Warning"),
            Severity::Average => f.write_str("Average"),
            Severity::High => f.write_str("High"),
            Severity::Disaster => f.write_str("Disaster"),
            Severity::Unknown(code) => write!(f, "Severity {code}"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "not-classified" | "notclassified" | "none" => Ok(Self::NotClassified),
            "info" | "information" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warning),
            "average" => Ok(Self::Average),
            "high" => Ok(Self::High),
            "disaster" => Ok(Self::Disaster),
            other => match other.parse::<i64>() {
                Ok(code) => Ok(Self::from_zabbix(code)),
                Err(_) => Err(format!("unknown severity: {other}")),
            },
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_zabbix_code())
    }
}

#[cfg(test)]
mod tests {
    use super::{AckFilter, Severity};
    use std::str::FromStr;

    #[test]
    fn ack_filter_from_str_accepts_variants() {
        assert_eq!(AckFilter::from_str("ack"), Ok(AckFilter::Acked));
        assert_eq!(AckFilter::from_str("unacked"), Ok(AckFilter::Unacked));
        assert_eq!(AckFilter::from_str("ALL"), Ok(AckFilter::All));
        assert!(AckFilter::from_str("maybe").is_err());
        assert_eq!(AckFilter::All.as_param(), None);
    }

    #[test]
    fn severity_from_zabbix_keeps_unknown_codes() {
        assert_eq!(Severity::from_zabbix(4), Severity::High);
        assert_eq!(Severity::from_zabbix(0), Severity::NotClassified);
        assert_eq!(Severity::from_zabbix(42), Severity::Unknown(42));
        assert_eq!(Severity::Unknown(42).as_zabbix_code(), 42);
    }

    #[test]
    fn severity_orders_by_code_and_parses_names() {
        assert!(Severity::Warning < Severity::High);
        assert!(Severity::Disaster < Severity::Unknown(6));
        assert_eq!(Severity::from_str("Average"), Ok(Severity::Average));
        assert_eq!(Severity::from_str("3"), Ok(Severity::Average));
        assert!(Severity::from_str("meh").is_err());
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "4");
    }
}
