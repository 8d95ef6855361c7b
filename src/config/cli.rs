use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

use crate::domain::types::PermissionLevel;

/// Command-line arguments for the privatecast binary.
#[derive(Debug, Parser)]
#[command(
    name = "privatecast",
    version,
    about = "Private podcast episode visibility and caching"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "PRIVATECAST_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the visibility filter for a permission level.
    Filter(EvaluationArgs),
    /// List visible episode IDs from the fixture store.
    Episodes(EpisodesArgs),
    /// Show the podcast search query after the inclusion filter.
    Search(SearchArgs),
    /// Grant private read capabilities to subscribers and print the role.
    #[command(name = "bootstrap-roles")]
    BootstrapRoles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Administrator,
    Standard,
}

impl From<RoleArg> for PermissionLevel {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Administrator => PermissionLevel::Administrator,
            RoleArg::Standard => PermissionLevel::Standard,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct EvaluationArgs {
    /// Permission level of the requester.
    #[arg(long, value_enum, default_value_t = RoleArg::Standard)]
    pub role: RoleArg,

    /// Evaluate at this instant instead of now.
    #[arg(long, value_name = "RFC3339")]
    pub at: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct EpisodesArgs {
    #[command(flatten)]
    pub evaluation: EvaluationArgs,

    /// Content type to list alongside podcast episodes; repeatable.
    #[arg(long = "include-type", value_name = "TYPE")]
    pub include_types: Vec<String>,

    /// Number of consecutive listings, to observe the cache.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,
}

#[derive(Debug, Args, Clone)]
pub struct SearchArgs {
    #[command(flatten)]
    pub evaluation: EvaluationArgs,

    /// Treat the requester as not logged in.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub logged_out: bool,

    /// Issue the query from the admin panel.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub admin_panel: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the attribute that marks an item as carrying audio.
    #[arg(long = "audio-attribute-key", value_name = "KEY", global = true)]
    pub audio_attribute_key: Option<String>,

    /// Override the time zone used to decide "today" (IANA name).
    #[arg(long = "timezone", value_name = "TZ", global = true)]
    pub timezone: Option<String>,

    /// Override the content store query timeout.
    #[arg(long = "query-timeout-ms", value_name = "MILLIS", global = true)]
    pub query_timeout_ms: Option<u64>,

    /// Toggle the episode cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub cache_enabled: Option<bool>,

    /// Override the episode cache lifetime.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS", global = true)]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the cache scope (shared|per_permission).
    #[arg(long = "cache-scope", value_name = "SCOPE", global = true)]
    pub cache_scope: Option<String>,

    /// Override the content fixture file.
    #[arg(
        long = "fixtures",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub fixtures: Option<PathBuf>,
}
