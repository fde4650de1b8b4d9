use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the memoapp binary.
#[derive(Debug, Parser)]
#[command(name = "memoapp", version, about = "Memo record store over HTTP")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MEMOAPP_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Select the read backend and serve the memo API.
    Serve(Box<ServeArgs>),
    /// Run backend selection once and print the decision.
    Probe(BackendArgs),
    /// Materialize the store listing into the cache.
    Warm(BackendArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct BackendOverrides {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the cache connection URL.
    #[arg(long = "cache-url", value_name = "URL")]
    pub cache_url: Option<String>,

    /// Override the key holding the cached listing.
    #[arg(long = "cache-listing-key", value_name = "KEY")]
    pub cache_listing_key: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BackendArgs {
    #[command(flatten)]
    pub backends: BackendOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub backends: BackendOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override what happens to the cached listing after a write (refresh|evict).
    #[arg(long = "cache-refresh-mode", value_name = "MODE")]
    pub cache_refresh_mode: Option<String>,

    /// Override the per-request backend deadline.
    #[arg(long = "backend-timeout-ms", value_name = "MILLIS")]
    pub backend_timeout_ms: Option<u64>,
}
