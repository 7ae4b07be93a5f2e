use std::time::Duration;

use serde::Deserialize;
use serde_with::DeserializeAs;

/// Durations written as humantime strings (`"30s"`, `"4h"`) or as a bare
/// number of seconds.
pub(super) struct HumantimeDuration;

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationSetting {
    Seconds(u64),
    Text(String),
}

pub(super) fn parse_duration_setting(raw: &str) -> Result<Duration, humantime::DurationError> {
    let raw = raw.trim();
    match raw.parse::<u64>() {
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => humantime::parse_duration(raw),
    }
}

impl<'de> DeserializeAs<'de, Duration> for HumantimeDuration {
    fn deserialize_as<D>(deserializer: D) -> std::result::Result<Duration, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match DurationSetting::deserialize(deserializer)? {
            DurationSetting::Seconds(secs) => Ok(Duration::from_secs(secs)),
            DurationSetting::Text(raw) => {
                parse_duration_setting(&raw).map_err(serde::de::Error::custom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{HumantimeDuration, parse_duration_setting};
    use serde::Deserialize;
    use serde_with::serde_as;
    use std::time::Duration;

    #[serde_as]
    #[derive(Deserialize)]
    struct Sample {
        #[serde_as(as = "HumantimeDuration")]
        lifetime: Duration,
    }

    #[test]
    fn accepts_humantime_and_plain_seconds() {
        let text: Sample = serde_json::from_str(r#"{"lifetime":"4h"}"#).unwrap();
        assert_eq!(text.lifetime, Duration::from_secs(4 * 3600));
        let number: Sample = serde_json::from_str(r#"{"lifetime":90}"#).unwrap();
        assert_eq!(number.lifetime, Duration::from_secs(90));
        assert_eq!(parse_duration_setting(" 15 ").unwrap(), Duration::from_secs(15));
        assert!(serde_json::from_str::<Sample>(r#"{"lifetime":"forever"}"#).is_err());
    }
}
