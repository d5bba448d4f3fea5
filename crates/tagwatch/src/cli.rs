//! Clap derive structures for the `tagwatch` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tagwatch -- keep an eye on Chipolo tags and phones
#[derive(Debug, Parser)]
#[command(
    name = "tagwatch",
    version,
    about = "Watch Chipolo tags and phones from the command line",
    long_about = "Polls the Chipolo account API, reports connectivity and battery\n\
        changes for your tags and phones, and rings phones on demand.\n\n\
        Polling pauses for 24 hours when the service starts throttling.",
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
    #[arg(long, short = 'p', env = "TAGWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "TAGWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// API root (overrides profile)
    #[arg(long, env = "TAGWATCH_API_URL", global = true, hide = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TAGWATCH_OUTPUT",
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

    /// Emit logs as JSON lines
    #[arg(long, env = "TAGWATCH_LOG_JSON", global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Keep secrets out of the system keyring
    #[arg(long, env = "TAGWATCH_NO_KEYRING", global = true)]
    pub no_keyring: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "TAGWATCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

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
    /// Log in to the Chipolo account and remember the credentials
    Login(LoginArgs),

    /// List tags and phones on the account
    #[command(alias = "ls")]
    Devices,

    /// Ring a phone
    Ring(RingArgs),

    /// Poll the account and report changes until interrupted
    Run(RunArgs),

    /// Show session and cooldown state
    Status,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email (prompted if missing)
    #[arg(long, short = 'e', env = "TAGWATCH_EMAIL")]
    pub email: Option<String>,

    /// Log in again even if a session exists
    #[arg(long, short = 'f')]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct RingArgs {
    /// Phone id (see `tagwatch devices`)
    pub device_id: String,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Poll period, e.g. "15m" (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<humantime::Duration>,

    /// Poll once, print the result and exit
    #[arg(long)]
    pub once: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Store the account password in the system keyring
    SetPassword,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
