use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt};

use crate::Result;
use crate::error::Error;

/// Environment switch that turns on raw request/response tracing.
pub const DEBUG_ENV: &str = "ZBX_DEBUG";

const RAW_TRACE_DIRECTIVE: &str = "zbxapi=trace";

/// Install the global tracing subscriber.
///
/// The filter is the first valid candidate of `explicit_filter`, `RUST_LOG`
/// and `info`. With `ZBX_DEBUG=1` the library's `trace!` events, which carry
/// raw payload previews, are enabled on top of it.
///
/// # Errors
///
/// Returns an error if no filter candidate is valid, if JSON output is
/// requested without the `json-logs` feature, or if a global subscriber is
/// already installed.
pub fn init_tracing(explicit_filter: Option<&str>, use_json: bool) -> Result<()> {
    let filter = build_filter(explicit_filter, std::env::var("RUST_LOG").ok(), raw_debug())?;

    #[cfg(feature = "json-logs")]
    if use_json {
        let subscriber = Registry::default().with(filter).with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .json()
                .flatten_event(true),
        );
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|err| Error::Telemetry(err.to_string()))?;
        return Ok(());
    }

    #[cfg(not(feature = "json-logs"))]
    if use_json {
        return Err(Error::Telemetry(
            "binary was built without the `json-logs` feature".to_string(),
        ));
    }

    let subscriber = Registry::default().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr),
    );
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| Error::Telemetry(err.to_string()))
}

fn raw_debug() -> bool {
    std::env::var(DEBUG_ENV).is_ok_and(|value| value.trim() == "1")
}

fn build_filter(
    explicit: Option<&str>,
    rust_log: Option<String>,
    raw_debug: bool,
) -> Result<EnvFilter> {
    let filter = explicit
        .map(str::to_string)
        .into_iter()
        .chain(rust_log)
        .chain(std::iter::once("info".to_string()))
        .find_map(|candidate| EnvFilter::try_new(candidate).ok())
        .ok_or_else(|| Error::Telemetry("invalid log filter".to_string()))?;

    if !raw_debug {
        return Ok(filter);
    }
    let directive: Directive = RAW_TRACE_DIRECTIVE
        .parse()
        .map_err(|err: tracing_subscriber::filter::ParseError| Error::Telemetry(err.to_string()))?;
    Ok(filter.add_directive(directive))
}

#[cfg(test)]
mod tests {
    use super::build_filter;

    #[test]
    fn explicit_filter_wins_over_rust_log() {
        let filter = build_filter(Some("zbxapi=debug"), Some("warn".into()), false).unwrap();
        assert_eq!(filter.to_string(), "zbxapi=debug");
    }

    #[test]
    fn invalid_candidates_fall_through_to_info() {
        let filter = build_filter(Some("=[bad"), Some("also[bad".into()), false).unwrap();
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn raw_debug_adds_trace_directive() {
        let filter = build_filter(None, None, true).unwrap();
        assert!(filter.to_string().contains("zbxapi=trace"));
    }
}
