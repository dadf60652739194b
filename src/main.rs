use anyhow::Result;
use serde::{Serialize, de::DeserializeOwned};
use std::io::{self, Read, Write};
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod services;

use config::{AppConfig, Command};
use errors::ResourceError;
use services::{s3_gateway::S3Connector, store::Connector};

#[tokio::main]
async fn main() {
    let cfg = AppConfig::from_env_and_args();

    // --- Logging setup (stdout is reserved for the response) ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_filter))
        .with_writer(io::stderr)
        .init();

    tracing::debug!("Starting s3-resource with config: {:?}", cfg);

    let mut stdout = io::stdout().lock();
    if let Err(err) = run(cfg.command, io::stdin().lock(), &mut stdout, &S3Connector).await {
        eprintln!("{}", error_line(&err));
        std::process::exit(exit_code(&err));
    }
}

/// Read the request from `input`, run the command, write the response to
/// `output`. Nothing is written to `output` unless the command succeeds.
async fn run(
    command: Command,
    mut input: impl Read,
    output: &mut impl Write,
    connector: &dyn Connector,
) -> Result<()> {
    let mut raw = String::new();
    input.read_to_string(&mut raw)?;

    let response = match command {
        Command::Check => encode(&handlers::check::check(decode(&raw)?, connector).await?)?,
        Command::In { destination } => {
            encode(&handlers::get::fetch(decode(&raw)?, &destination, connector).await?)?
        }
        Command::Out { source } => {
            encode(&handlers::put::publish(decode(&raw)?, &source, connector).await?)?
        }
    };

    output.write_all(&response)?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn decode<T: DeserializeOwned>(input: &str) -> Result<T, ResourceError> {
    Ok(serde_json::from_str(input)?)
}

fn encode<T: Serialize>(response: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(response)?)
}

/// Single stderr line with the full cause chain.
fn error_line(err: &anyhow::Error) -> String {
    format!("{err:#}")
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ResourceError>()
        .map(ResourceError::exit_code)
        .unwrap_or(1)
}
