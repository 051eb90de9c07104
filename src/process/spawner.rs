// src/process/spawner.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::errors::{HarnessError, Result};
use crate::process::handle::{ProcessHandle, ShutdownPolicy};
use crate::process::search_path::SearchPath;

/// Everything a launch needs besides the command line itself.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub working_dir: PathBuf,
    /// Overlaid on the inherited environment.
    pub environment: BTreeMap<String, String>,
    pub policy: ShutdownPolicy,
    /// Pause after the process starts before the handle is returned.
    pub startup_wait_time: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            environment: BTreeMap::new(),
            policy: ShutdownPolicy::default(),
            startup_wait_time: Duration::ZERO,
        }
    }
}

impl LaunchOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            working_dir: cfg.working_directory.clone(),
            environment: cfg.environment.clone(),
            policy: ShutdownPolicy {
                exit_timeout: cfg.timeouts.exit_timeout,
                io_wait_timeout: cfg.timeouts.io_wait_timeout,
                stop_grace: cfg.timeouts.stop_grace,
                terminate_grace: cfg.timeouts.terminate_grace,
                stop_signal: cfg.stop_signal.clone(),
            },
            startup_wait_time: cfg.timeouts.startup_wait_time,
        }
    }

    /// Same options with a different run-to-completion deadline.
    pub fn with_exit_timeout(mut self, timeout: Duration) -> Self {
        self.policy.exit_timeout = timeout;
        self
    }
}

/// A command line split into its resolved program and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Absolute form of the launch's working directory.
    pub working_dir: PathBuf,
}

/// Creates process handles. Launching never registers the handle; that is
/// up to the caller (normally the run session).
#[derive(Debug, Clone, Default)]
pub struct Spawner {
    search_path: Option<SearchPath>,
    extensions: Vec<String>,
}

impl Spawner {
    /// A spawner that searches the `PATH` of each launch's environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// A spawner with a fixed search path.
    pub fn with_search_path(search_path: SearchPath) -> Self {
        Self {
            search_path: Some(search_path),
            extensions: Vec::new(),
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            search_path: (!cfg.search_path.is_empty())
                .then(|| SearchPath::from_dirs(cfg.search_path.clone())),
            extensions: cfg.executable_extensions.clone(),
        }
    }

    /// The search path used for a launch with `options`.
    pub fn search_path_for(&self, options: &LaunchOptions) -> SearchPath {
        self.search_path
            .clone()
            .unwrap_or_else(|| SearchPath::from_environment(&options.environment))
            .with_extensions(self.extensions.clone())
    }

    /// Split `commandline` and locate its program without starting anything.
    pub fn resolve(&self, commandline: &str, options: &LaunchOptions) -> Result<ResolvedCommand> {
        let search_path = self.search_path_for(options);
        let launch_error = |reason: String| HarnessError::Launch {
            command: commandline.to_string(),
            search_path: search_path.display(),
            reason,
        };

        let mut words = shlex::split(commandline)
            .ok_or_else(|| launch_error("command line has unbalanced quotes".to_string()))?
            .into_iter();
        let program = words
            .next()
            .ok_or_else(|| launch_error("command line is empty".to_string()))?;

        if !options.working_dir.is_dir() {
            return Err(launch_error(format!(
                "working directory {:?} does not exist",
                options.working_dir
            )));
        }
        // The child chdirs before exec, so relative programs would be
        // resolved twice against a relative working directory.
        let working_dir = std::path::absolute(&options.working_dir).map_err(|e| {
            launch_error(format!(
                "working directory {:?} cannot be made absolute: {e}",
                options.working_dir
            ))
        })?;

        let resolved = search_path
            .resolve(&program, &working_dir)
            .ok_or_else(|| launch_error(format!("executable '{program}' not found")))?;

        debug!(command = %commandline, program = ?resolved, cwd = ?working_dir, "resolved executable");

        Ok(ResolvedCommand {
            program: resolved,
            args: words.collect(),
            working_dir,
        })
    }

    /// Resolve and start `commandline`, wiring all three standard streams to
    /// the returned handle. Output draining starts immediately.
    pub async fn launch(&self, commandline: &str, options: &LaunchOptions) -> Result<ProcessHandle> {
        let resolved = self.resolve(commandline, options)?;

        let mut cmd = Command::new(&resolved.program);
        cmd.args(&resolved.args)
            .current_dir(&resolved.working_dir)
            .envs(&options.environment)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so signals reach whatever the command starts.
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|e| HarnessError::Launch {
            command: commandline.to_string(),
            search_path: self.search_path_for(options).display(),
            reason: e.to_string(),
        })?;

        let handle = ProcessHandle::start(
            commandline.to_string(),
            child,
            resolved.working_dir,
            options.policy.clone(),
        )?;

        info!(
            command = %commandline,
            pid = handle.pid(),
            cwd = ?handle.working_dir(),
            "started process"
        );

        if !options.startup_wait_time.is_zero() {
            tokio::time::sleep(options.startup_wait_time).await;
        }

        Ok(handle)
    }
}
