//! Clap derive structures for the `camscan` CLI.
//!
//! Defines the command tree, global flags, and shared value parsers.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use camscan_core::{CameraDevice, DeviceClass, StrategyOrder};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// camscan -- camera acquisition and scan lifecycle, from the command line
#[derive(Debug, Parser)]
#[command(
    name = "camscan",
    version,
    about = "Plan camera acquisition strategies and replay scripted scan sessions",
    long_about = "Developer tooling for the camscan scanner core.\n\n\
        `plan` shows which camera would be picked and the fallback chain of\n\
        acquisition strategies. `simulate` runs a complete scan session\n\
        against a scripted camera platform described in a TOML scenario.",
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
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "CAMSCAN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CAMSCAN_OUTPUT",
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

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
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
    /// Show the selected camera and the acquisition strategy chain
    Plan(PlanArgs),

    /// Run a full scan session against a scripted platform
    #[command(alias = "sim")]
    Simulate(SimulateArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Plan ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Enumerated camera as ID:LABEL (repeatable, in enumeration order)
    #[arg(long = "device", short = 'd', value_parser = parse_device)]
    pub devices: Vec<CameraDevice>,

    /// Device class: desktop, mobile, or webview
    #[arg(long, default_value = "desktop")]
    pub class: DeviceClass,

    /// Strategy order: device-first or facing-first (defaults to config)
    #[arg(long)]
    pub order: Option<StrategyOrder>,
}

/// Parse `ID:LABEL` into a camera. The label may be empty or omitted.
pub fn parse_device(raw: &str) -> Result<CameraDevice, String> {
    let (id, label) = raw.split_once(':').unwrap_or((raw, ""));
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("expected ID:LABEL, got '{raw}'"));
    }
    Ok(CameraDevice::new(id, label.trim()))
}

// ── Simulate ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Scenario TOML describing devices, acquisitions, and frames
    pub scenario: PathBuf,

    /// Override the scenario's device class
    #[arg(long)]
    pub class: Option<DeviceClass>,

    /// Request a stop after this many milliseconds without a decode
    #[arg(long, value_name = "MS")]
    pub stop_after: Option<u64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
