use clap::{Parser, Subcommand};
use std::{env, ffi::OsString, path::PathBuf};

const LOG_ENV: &str = "S3_RESOURCE_LOG";
const DEFAULT_LOG_FILTER: &str = "info";

/// Centralized process configuration.
/// Combines the environment with CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub command: Command,

    /// `tracing_subscriber::EnvFilter` directives.
    pub log_filter: String,
}

/// Command-line configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Concourse resource for S3-compatible object stores")]
pub struct Args {
    /// Log filter directives (overrides S3_RESOURCE_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report new versions; request on stdin, version list on stdout
    Check,

    /// Fetch every object under the prefix into DESTINATION
    In { destination: PathBuf },

    /// Upload files from SOURCE when enabled by params
    Out { source: PathBuf },
}

impl AppConfig {
    /// Parse process arguments and environment into AppConfig.
    pub fn from_env_and_args() -> Self {
        let args = Args::parse_from(with_invoked_name(env::args_os().collect()));
        Self::merge(args, env::var(LOG_ENV).ok())
    }

    fn merge(args: Args, env_filter: Option<String>) -> Self {
        let log_filter = args
            .log_level
            .or(env_filter)
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.into());
        Self {
            command: args.command,
            log_filter,
        }
    }
}

/// When the binary runs through a link named `check`, `in` or `out`, insert
/// that name as the subcommand so the driver's `/opt/resource/<cmd> [dir]`
/// calls parse like `s3-resource <cmd> [dir]`.
fn with_invoked_name(mut argv: Vec<OsString>) -> Vec<OsString> {
    let invoked = argv
        .first()
        .map(PathBuf::from)
        .and_then(|p| p.file_name().map(|n| n.to_os_string()));
    if let Some(name) = invoked {
        if matches!(name.to_str(), Some("check" | "in" | "out")) {
            argv.insert(1, name);
        }
    }
    argv
}
