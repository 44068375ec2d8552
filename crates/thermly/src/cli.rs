//! Clap derive structures for the `thermly` CLI.
//!
//! Defines the command tree, global flags, and shared types. Kept free of
//! workspace crates so `build.rs` can include it for man page generation.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// thermly -- MasterTherm heat-pump telemetry from the command line
#[derive(Debug, Parser)]
#[command(
    name = "thermly",
    version,
    about = "Read MasterTherm heat-pump telemetry from the command line",
    long_about = "Logs in to the MasterTherm cloud service, discovers the heat pumps on\n\
        the account, and shows their info, decoded state, and raw registers.\n\n\
        Supports both the legacy API (pre-2022 accounts) and the newer REST API.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "THERMLY_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Vendor API the account lives on (overrides profile)
    #[arg(long, env = "THERMLY_API_VERSION", global = true)]
    pub api_version: Option<ApiVersionArg>,

    /// Service base URL (overrides the API version's production host)
    #[arg(long, env = "THERMLY_URL", global = true)]
    pub url: Option<String>,

    /// Account username (overrides profile)
    #[arg(long, short = 'u', env = "THERMLY_USERNAME", global = true)]
    pub username: Option<String>,

    /// Account password; prompted for when not configured anywhere
    #[arg(long, env = "THERMLY_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "THERMLY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip TLS certificate verification
    #[arg(long, short = 'k', env = "THERMLY_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "THERMLY_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Devices fetched concurrently during a refresh
    #[arg(long, short = 'j', global = true)]
    pub jobs: Option<usize>,

    /// Replace module ids, names, and locations with placeholders
    /// (for sharing debug output)
    #[arg(long, global = true)]
    pub hide_sensitive: bool,
}

// ── Enums ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ApiVersionArg {
    /// Legacy API, accounts created before 2022
    #[value(alias = "v1")]
    Legacy,
    /// REST API, accounts created since 2022
    #[value(alias = "v2")]
    New,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the heat pumps on the account
    #[command(alias = "dev", alias = "d")]
    Devices,

    /// Show device info (model, owner, location)
    Info(DeviceArgs),

    /// Show the decoded state of devices
    Data(DataArgs),

    /// Show raw registers
    #[command(alias = "regs")]
    Registers(RegistersArgs),

    /// Refresh periodically and print state changes until interrupted
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Device-scoped commands ───────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DeviceArgs {
    /// Device as MODULE_UNIT (e.g. 1234_1); all devices when omitted
    pub device: Option<String>,
}

#[derive(Debug, Args)]
pub struct DataArgs {
    #[command(flatten)]
    pub target: DeviceArgs,

    /// Fetch the full register set instead of the default load
    #[arg(long)]
    pub full: bool,
}

#[derive(Debug, Args)]
pub struct RegistersArgs {
    #[command(flatten)]
    pub target: DeviceArgs,

    /// Fetch the full register set instead of the default load
    #[arg(long)]
    pub full: bool,

    /// Show only the registers carried by the last fetch
    #[arg(long)]
    pub last_update: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub target: DeviceArgs,

    /// Time between refreshes (e.g. 30s, 2m); profile default when omitted
    #[arg(long, short = 'i')]
    pub interval: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },

    /// Store a profile's password in the system keyring
    SetPassword {
        /// Profile name (defaults to the active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
