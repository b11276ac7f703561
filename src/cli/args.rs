//! CLI argument definitions.
//!
//! All Clap derive structs for `raidwarden` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Shared world-boss encounter coordinator.
#[derive(Parser, Debug)]
#[command(name = "raidwarden", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "RAIDWARDEN_COLOR")]
    pub color: ColorChoice,
}

// ============================================================================
// Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the spawn scheduler with in-memory collaborators (sandbox mode).
    Run(RunArgs),

    /// Validate configuration files without running anything.
    Validate(ValidateArgs),

    /// Drive one simulated encounter from spawn to resolution.
    Simulate(SimulateArgs),

    /// Display version information.
    Version(VersionArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "RAIDWARDEN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "RAIDWARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of simulated attackers.
    #[arg(long, default_value_t = 3)]
    pub attackers: u8,

    /// Maximum attack rounds before the simulation gives up.
    #[arg(long, default_value_t = 40)]
    pub rounds: u32,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_with_config_parses() {
        let cli = Cli::try_parse_from(["raidwarden", "run", "--config", "warden.yaml"]);
        assert!(cli.is_ok(), "failed to parse: {cli:?}");
    }

    #[test]
    fn validate_requires_files() {
        let result = Cli::try_parse_from(["raidwarden", "validate"]);
        assert!(result.is_err(), "expected error for missing files");
    }

    #[test]
    fn simulate_defaults() {
        let cli = Cli::try_parse_from(["raidwarden", "simulate"]).expect("parses");
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.attackers, 3);
        assert_eq!(args.rounds, 40);
    }

    #[test]
    fn verbose_count_accumulates() {
        let cli = Cli::try_parse_from(["raidwarden", "-vvv", "version"]).expect("parses");
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn color_choices_parse() {
        for variant in ["auto", "always", "never"] {
            let cli = Cli::try_parse_from(["raidwarden", "--color", variant, "version"]);
            assert!(cli.is_ok(), "failed to parse color={variant}");
        }
    }

    #[test]
    fn help_output() {
        let result = Cli::try_parse_from(["raidwarden", "--help"]);
        let err = result.expect_err("help short-circuits");
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
