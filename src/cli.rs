use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::server::{start_server, ServeConfig, DEFAULT_BIND, DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(name = "asis")]
#[command(about = "Serve a canned HTTP response as-is for every request")]
#[command(
    long_about = "Serve a canned HTTP response as-is for every request\n\n\
                  The response file holds `Name: value` header lines, one of them\n\
                  `Status: <code> <reason>`, then a blank line and the raw body."
)]
#[command(version)]
pub struct Cli {
    #[arg(help = "Response file to play back")]
    pub response_file: PathBuf,

    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_PORT)]
    #[arg(help = "Port to listen on")]
    pub port: u16,

    #[arg(long = "bind", default_value_t = DEFAULT_BIND)]
    #[arg(help = "Address to bind to")]
    pub bind: IpAddr,

    #[arg(long = "log-level", default_value = "info")]
    #[arg(help = "Log level (debug, info, warn, error); RUST_LOG takes precedence")]
    pub log_level: String,

    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Console)]
    #[arg(help = "Log format")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Console,
    Json,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        init_tracing(&self.log_level, self.log_format)?;
        start_server(self.serve_config()).await
    }

    pub fn serve_config(&self) -> ServeConfig {
        ServeConfig {
            response_file: self.response_file.clone(),
            bind: self.bind,
            port: self.port,
        }
    }
}

fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("Invalid log level {log_level:?}"))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match format {
        LogFormat::Console => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}
