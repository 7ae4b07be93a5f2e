use std::path::PathBuf;

use tracing::{debug, info};
use zbxapi::Result;
use zbxapi::config::{Config, DEFAULT_CONFIG_PATH};
use zbxapi::telemetry::init_tracing;
use zbxapi::zbx_client::{
    GetParameters, HostGetParams, ProblemGetParams, SelectQuery, Session, SessionCache,
    SortOrder, TriggerGetParams,
};

use super::cli::{Cli, Command};

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.log_filter.as_deref(), cli.json_logs)?;

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = Config::from_env_and_file(&config_path)?;
    if cli.insecure {
        config.insecure = true;
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }
    debug!(url = %config.url, config = %config_path.display(), "configuration loaded");

    if let Command::FlushCache = cli.command {
        let cache = config.file_cache();
        cache.flush().await?;
        info!(path = %cache.path().display(), "session cache flushed");
        return Ok(());
    }

    let session = config.client_builder()?.connect().await?;
    match cli.command {
        Command::Version => println!("{}", session.get_version().await?),
        Command::Hosts { group_id } => list_hosts(&session, group_id).await?,
        Command::Problems { limit, ack } => {
            let problems = session
                .problems(&ProblemGetParams::latest(limit, ack))
                .await
                .or_else(empty_on_not_found)?;
            for problem in problems {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    problem.event_id,
                    problem.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    problem.severity,
                    if problem.acknowledged { "acked" } else { "open" },
                    problem.name
                );
            }
        }
        Command::Triggers { min_severity } => {
            let params = TriggerGetParams {
                common: GetParameters::default()
                    .output(SelectQuery::Extend)
                    .sort_by(["priority"], SortOrder::Descending),
                min_severity,
                recent_problem_only: true,
                select_hosts: Some(SelectQuery::fields(["hostid", "host", "name"])),
                ..TriggerGetParams::default()
            };
            let triggers = session.triggers(&params).await.or_else(empty_on_not_found)?;
            for trigger in triggers {
                let hosts: Vec<&str> = trigger.hosts.iter().map(|host| host.label()).collect();
                let severity = trigger
                    .severity
                    .map_or_else(|| "-".to_string(), |severity| severity.to_string());
                println!(
                    "{}\t{}\t{}\t{}",
                    trigger.trigger_id,
                    severity,
                    hosts.join(","),
                    trigger.description
                );
            }
        }
        Command::FlushCache => {}
    }
    Ok(())
}

async fn list_hosts(session: &Session, group_id: Option<String>) -> Result<()> {
    let params = HostGetParams {
        common: GetParameters::default()
            .output(SelectQuery::fields(["hostid", "host", "name", "status"]))
            .sort_by(["host"], SortOrder::Ascending),
        group_ids: group_id.map(|id| vec![id]),
        ..HostGetParams::default()
    };
    let hosts = session.hosts(&params).await.or_else(empty_on_not_found)?;
    for host in hosts {
        let status = host
            .status
            .map_or_else(|| "-".to_string(), |status| status.to_string());
        println!("{}\t{}\t{}", host.host_id, status, host.label());
    }
    Ok(())
}

fn empty_on_not_found<T>(err: zbxapi::error::Error) -> Result<Vec<T>> {
    if err.is_not_found() {
        Ok(Vec::new())
    } else {
        Err(err)
    }
}
