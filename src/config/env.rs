use std::time::Duration;

use crate::error::ConfigError;

use super::serde::parse_duration_setting;

pub(super) fn env_string(key: &'static str) -> std::result::Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(ConfigError::Other(format!("{key}: {err}"))),
    }
}

fn env_trimmed(key: &'static str) -> std::result::Result<Option<String>, ConfigError> {
    Ok(env_string(key)?
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty()))
}

/// `1`/`0`, `true`/`false`, `yes`/`no` and `on`/`off`, case-insensitive.
pub(super) fn env_bool(key: &'static str) -> std::result::Result<Option<bool>, ConfigError> {
    let Some(value) = env_trimmed(key)? else {
        return Ok(None);
    };
    parse_bool(&value)
        .map(Some)
        .ok_or_else(|| ConfigError::InvalidField {
            field: key,
            message: format!("expected a boolean, got `{value}`"),
        })
}

pub(super) fn env_duration(
    key: &'static str,
) -> std::result::Result<Option<Duration>, ConfigError> {
    let Some(value) = env_trimmed(key)? else {
        return Ok(None);
    };
    parse_duration_setting(&value)
        .map(Some)
        .map_err(|err| ConfigError::InvalidField {
            field: key,
            message: err.to_string(),
        })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
