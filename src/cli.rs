// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `procharness`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "procharness",
    version,
    about = "Run commands the way a CLI test harness does: capture output, enforce timeouts, clean up.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Procharness.toml` in the current working directory; a
    /// missing default file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value = "Procharness.toml")]
    pub config: String,

    /// Per-command exit timeout (e.g. `500ms`, `10s`), overriding the config.
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Fail on the first command that times out or exits non-zero.
    #[arg(long)]
    pub fail_on_nonzero: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROCHARNESS_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve every command on the search path, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Command lines to run, in order.
    #[arg(value_name = "COMMAND", required = true)]
    pub commands: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
