use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use zbxapi::types::{AckFilter, Severity};

#[derive(Parser, Debug)]
#[command(author, version, about = "Query a Zabbix server over its JSON-RPC API", long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Allow plain `http://` endpoints.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub insecure: bool,

    /// Neither read nor write the session cache.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub no_cache: bool,

    /// Emit JSON logs (needs `--features json-logs`).
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub json_logs: bool,

    /// Explicit log filter, e.g. "zbxapi=debug".
    #[arg(long, value_name = "FILTER", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the server's API version.
    Version,
    /// List hosts.
    Hosts {
        /// Only hosts in this host group.
        #[arg(long, value_name = "ID")]
        group_id: Option<String>,
    },
    /// List the newest problems.
    Problems {
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// ack, unack or all.
        #[arg(long, default_value = "all")]
        ack: AckFilter,
    },
    /// List triggers currently in problem state.
    Triggers {
        /// Lowest severity to show, by name or code.
        #[arg(long, value_name = "SEVERITY")]
        min_severity: Option<Severity>,
    },
    /// Remove the cached session file.
    FlushCache,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
