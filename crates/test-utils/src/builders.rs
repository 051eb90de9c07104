#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use procharness::config::{ConfigFile, RawConfigFile, format_duration};
use procharness::process::{LaunchOptions, ShutdownPolicy};

/// Builder for `ConfigFile` with test-friendly (short) timeouts.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.timeouts.exit_timeout = "5s".to_string();
        config.timeouts.io_wait_timeout = "1s".to_string();
        config.timeouts.stop_grace = "200ms".to_string();
        config.timeouts.terminate_grace = "2s".to_string();
        Self { config }
    }

    pub fn working_directory(mut self, dir: &Path) -> Self {
        self.config.run.working_directory = dir.to_string_lossy().into_owned();
        self
    }

    pub fn exit_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeouts.exit_timeout = format_duration(timeout);
        self
    }

    pub fn stop_grace(mut self, grace: Duration) -> Self {
        self.config.timeouts.stop_grace = format_duration(grace);
        self
    }

    pub fn terminate_grace(mut self, grace: Duration) -> Self {
        self.config.timeouts.terminate_grace = format_duration(grace);
        self
    }

    pub fn stop_signal(mut self, signal: &str) -> Self {
        self.config.run.stop_signal = signal.to_string();
        self
    }

    pub fn search_path_dir(mut self, dir: &Path) -> Self {
        self.config
            .run
            .search_path
            .push(dir.to_string_lossy().into_owned());
        self
    }

    pub fn env(mut self, name: &str, value: &str) -> Self {
        self.config
            .environment
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn fail_on_nonzero(mut self, val: bool) -> Self {
        self.config.run.fail_on_nonzero = val;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `LaunchOptions` with test-friendly (short) timeouts.
pub struct LaunchOptionsBuilder {
    options: LaunchOptions,
}

impl LaunchOptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: LaunchOptions {
                policy: ShutdownPolicy {
                    exit_timeout: Duration::from_secs(5),
                    io_wait_timeout: Duration::from_secs(1),
                    stop_grace: Duration::from_millis(200),
                    terminate_grace: Duration::from_secs(2),
                    stop_signal: "SIGTERM".to_string(),
                },
                ..LaunchOptions::default()
            },
        }
    }

    pub fn working_dir(mut self, dir: &Path) -> Self {
        self.options.working_dir = dir.to_path_buf();
        self
    }

    pub fn env(mut self, name: &str, value: &str) -> Self {
        self.options
            .environment
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn exit_timeout(mut self, timeout: Duration) -> Self {
        self.options.policy.exit_timeout = timeout;
        self
    }

    pub fn stop_grace(mut self, grace: Duration) -> Self {
        self.options.policy.stop_grace = grace;
        self
    }

    pub fn terminate_grace(mut self, grace: Duration) -> Self {
        self.options.policy.terminate_grace = grace;
        self
    }

    pub fn stop_signal(mut self, signal: &str) -> Self {
        self.options.policy.stop_signal = signal.to_string();
        self
    }

    pub fn startup_wait_time(mut self, wait: Duration) -> Self {
        self.options.startup_wait_time = wait;
        self
    }

    pub fn build(self) -> LaunchOptions {
        self.options
    }
}

impl Default for LaunchOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
