// src/session.rs

//! Per-run context.
//!
//! A [`RunSession`] owns the process registry of one test run together with
//! the spawner, configuration and announcer used for every launch. Nothing
//! here is global: parallel runs simply use separate sessions.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::aggregate::OutputAggregator;
use crate::announcer::{Announcer, AnnouncerEvent, TimeoutKind, TracingAnnouncer};
use crate::config::ConfigFile;
use crate::errors::{HarnessError, Result};
use crate::process::{signal, LaunchOptions, ProcessHandle, Spawner};
use crate::registry::ProcessRegistry;

pub struct RunSession {
    config: ConfigFile,
    spawner: Spawner,
    registry: ProcessRegistry,
    announcer: Arc<dyn Announcer>,
}

impl RunSession {
    pub fn new(config: ConfigFile) -> Self {
        Self {
            spawner: Spawner::from_config(&config),
            config,
            registry: ProcessRegistry::new(),
            announcer: Arc::new(TracingAnnouncer),
        }
    }

    pub fn with_announcer(mut self, announcer: Arc<dyn Announcer>) -> Self {
        self.announcer = announcer;
        self
    }

    pub fn with_spawner(mut self, spawner: Spawner) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn spawner(&self) -> &Spawner {
        &self.spawner
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions::from_config(&self.config)
    }

    /// Launch `commandline` with the configured exit timeout and register it.
    pub async fn run(&self, commandline: &str) -> Result<Arc<ProcessHandle>> {
        self.run_with_timeout(commandline, None).await
    }

    /// Launch `commandline` and register it. `timeout` overrides the
    /// configured exit timeout for this process.
    pub async fn run_with_timeout(
        &self,
        commandline: &str,
        timeout: Option<Duration>,
    ) -> Result<Arc<ProcessHandle>> {
        let mut options = self.launch_options();
        if let Some(timeout) = timeout {
            options = options.with_exit_timeout(timeout);
        }
        self.announce_launch(commandline, &options);

        let handle = Arc::new(self.spawner.launch(commandline, &options).await?);
        self.registry.register(commandline, Arc::clone(&handle));
        Ok(handle)
    }

    /// Launch, register and wait for `commandline`.
    ///
    /// With `fail_on_nonzero`, a timeout or a non-zero exit is returned as an
    /// error; otherwise the caller inspects the handle.
    pub async fn run_to_completion(
        &self,
        commandline: &str,
        timeout: Option<Duration>,
        fail_on_nonzero: bool,
    ) -> Result<Arc<ProcessHandle>> {
        let handle = self.run_with_timeout(commandline, timeout).await?;
        let exit_code = handle.run_to_completion(None).await?;

        if fail_on_nonzero {
            if handle.timed_out() {
                return Err(HarnessError::TimeoutExceeded {
                    command: commandline.to_string(),
                    timeout: handle.policy().exit_timeout,
                });
            }
            if exit_code != 0 {
                return Err(HarnessError::NonZeroExit {
                    command: commandline.to_string(),
                    exit_code,
                });
            }
        }

        Ok(handle)
    }

    /// Type into `target` (default: the last started process). Empty text
    /// closes input; anything else is written as one line.
    pub async fn type_into(&self, target: Option<&ProcessHandle>, text: &str) -> Result<()> {
        let last;
        let handle = match target {
            Some(handle) => handle,
            None => {
                last = self.registry.last()?;
                last.as_ref()
            }
        };

        if text.is_empty() {
            handle.close_input().await;
            Ok(())
        } else {
            handle.write_line(text).await
        }
    }

    /// Close input of `target` (default: the last started process).
    pub async fn close_input(&self, target: Option<&ProcessHandle>) -> Result<()> {
        self.type_into(target, "").await
    }

    pub fn last(&self) -> Result<Arc<ProcessHandle>> {
        self.registry.last()
    }

    pub fn lookup(&self, commandline: &str) -> Result<Arc<ProcessHandle>> {
        self.registry.lookup(commandline)
    }

    pub fn lookup_unique_substring(&self, fragment: &str) -> Result<Arc<ProcessHandle>> {
        self.registry.lookup_unique_substring(fragment)
    }

    pub fn output(&self) -> OutputAggregator<'_> {
        self.registry.output()
    }

    pub fn all_stdout(&self) -> String {
        self.output().all_stdout()
    }

    pub fn all_stderr(&self) -> String {
        self.output().all_stderr()
    }

    pub fn all_output(&self) -> String {
        self.output().all_output()
    }

    pub async fn stop_all(&self) -> Result<()> {
        self.registry.stop_all().await
    }

    pub async fn terminate_all(&self) -> Result<()> {
        if signal::supports_cooperative_signals() {
            for handle in self.registry.handles() {
                if !handle.has_exited() {
                    self.announcer.announce(&AnnouncerEvent::StopSignal {
                        command: handle.commandline().to_string(),
                        pid: handle.pid(),
                        signal: handle.policy().stop_signal.clone(),
                    });
                }
            }
        }
        self.registry.terminate_all().await
    }

    /// Run-boundary teardown: stop everything, then terminate whatever is
    /// left. Failures from both sweeps are reported together.
    pub async fn finish(&self) -> Result<()> {
        debug!(processes = self.registry.len(), "finishing run");
        let stopped = self.stop_all().await;
        let terminated = self.terminate_all().await;

        match (stopped, terminated) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(HarnessError::Cleanup(mut first)), Err(HarnessError::Cleanup(second))) => {
                first.extend(second);
                Err(HarnessError::Cleanup(first))
            }
            (Err(e), _) | (Ok(()), Err(e)) => Err(e),
        }
    }

    fn announce_launch(&self, commandline: &str, options: &LaunchOptions) {
        let announcer = &self.announcer;
        announcer.announce(&AnnouncerEvent::Directory(options.working_dir.clone()));
        if !options.environment.is_empty() {
            announcer.announce(&AnnouncerEvent::Environment(options.environment.clone()));
        }
        announcer.announce(&AnnouncerEvent::Timeout {
            kind: TimeoutKind::Exit,
            duration: options.policy.exit_timeout,
        });
        announcer.announce(&AnnouncerEvent::Timeout {
            kind: TimeoutKind::IoWait,
            duration: options.policy.io_wait_timeout,
        });
        if !options.startup_wait_time.is_zero() {
            announcer.announce(&AnnouncerEvent::Timeout {
                kind: TimeoutKind::Startup,
                duration: options.startup_wait_time,
            });
        }
        announcer.announce(&AnnouncerEvent::Command(commandline.to_string()));
    }
}
