// src/lib.rs

pub mod aggregate;
pub mod announcer;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod process;
pub mod registry;
pub mod session;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use crate::aggregate::OutputView;
use crate::cli::CliArgs;
use crate::config::{load_or_default, parse_duration};
use crate::session::RunSession;

pub use crate::errors::HarnessError;
pub use crate::process::{ProcessHandle, ProcessState, Spawner};
pub use crate::registry::ProcessRegistry;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - one run session
/// - running every command to completion, in order
/// - printing the run-wide output
/// - teardown (also on Ctrl-C)
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)
        .with_context(|| format!("loading config from {:?}", config_path))?;

    let timeout = args
        .timeout
        .as_deref()
        .map(parse_duration)
        .transpose()
        .map_err(|e| anyhow!("invalid --timeout: {e}"))?;
    let fail_on_nonzero = args.fail_on_nonzero || cfg.fail_on_nonzero;

    let session = RunSession::new(cfg);

    if args.dry_run {
        return print_dry_run(&session, &args.commands);
    }

    let outcome = tokio::select! {
        res = run_commands(&session, &args.commands, timeout, fail_on_nonzero) => res,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; terminating running processes");
            Err(anyhow!("interrupted"))
        }
    };

    let output = session.output().collect_bytes(OutputView::Combined);
    {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&output).context("writing captured output")?;
        stdout.flush().context("flushing captured output")?;
    }

    let finished = session.finish().await;
    outcome?;
    finished?;
    Ok(())
}

async fn run_commands(
    session: &RunSession,
    commands: &[String],
    timeout: Option<Duration>,
    fail_on_nonzero: bool,
) -> Result<()> {
    for command in commands {
        let handle = session
            .run_to_completion(command, timeout, fail_on_nonzero)
            .await?;
        info!(
            command = %command,
            state = ?handle.state(),
            timed_out = handle.timed_out(),
            "command finished"
        );
    }
    Ok(())
}

/// Dry-run output: each command and the executable it resolves to.
fn print_dry_run(session: &RunSession, commands: &[String]) -> Result<()> {
    let options = session.launch_options();
    let search_path = session.spawner().search_path_for(&options);

    println!("procharness dry-run");
    println!("  working_directory = {:?}", options.working_dir);
    println!("  search_path = {}", search_path.display());
    println!();

    for command in commands {
        let resolved = session.spawner().resolve(command, &options)?;
        println!("  - {command}");
        println!("      program: {}", resolved.program.display());
        if !resolved.args.is_empty() {
            println!("      args: {:?}", resolved.args);
        }
    }

    Ok(())
}
