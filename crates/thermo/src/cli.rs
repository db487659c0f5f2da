//! Clap derive structures for the `thermo` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// thermo -- turn the thermostat dial from the command line
#[derive(Debug, Parser)]
#[command(
    name = "thermo",
    version,
    about = "Read and turn the servo-driven thermostat dial",
    long_about = "Connects to the robot hosting the thermostat dial servo, reads its\n\
        position as a temperature, and moves it warmer or cooler.",
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
    /// Robot gateway URL (overrides config)
    #[arg(long, short = 'e', env = "THERMO_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Servo component name (overrides config)
    #[arg(long, env = "THERMO_COMPONENT", global = true)]
    pub component: Option<String>,

    /// API key (not persisted)
    #[arg(long, env = "THERMO_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Id of the API key
    #[arg(long, env = "THERMO_API_KEY_ID", global = true)]
    pub api_key_id: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "THERMO_OUTPUT",
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "THERMO_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-request timeout in seconds (overrides config)
    #[arg(long, env = "THERMO_TIMEOUT", global = true)]
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
    /// Plain text (scripting)
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
    /// Show the dial position and temperature
    #[command(alias = "st")]
    Status,

    /// Move the dial to a servo position (clamped to 10-180)
    Set(SetArgs),

    /// Turn the dial one step warmer
    #[command(alias = "up")]
    Warmer,

    /// Turn the dial one step cooler
    #[command(alias = "down")]
    Cooler,

    /// Interactive control surface (+ warmer, - cooler, r retry, q quit)
    Dial,

    /// Manage configuration and stored credentials
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Target servo position in degrees
    #[arg(allow_negative_numbers = true)]
    pub position: i64,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Show the current configuration (secrets redacted)
    Show,

    /// Print the config file path
    Path,

    /// Store an API key pair in the system keyring
    SetKey {
        /// Id of the API key (prompted if omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Remove the stored API key pair
    ResetKey,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
