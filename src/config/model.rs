// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [timeouts]
/// exit_timeout = "15s"
/// io_wait_timeout = "100ms"
///
/// [run]
/// working_directory = "tmp/procharness"
/// stop_signal = "TERM"
///
/// [environment]
/// LANG = "C"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub timeouts: TimeoutsSection,

    #[serde(default)]
    pub run: RunSection,

    /// Variables overlaid on the inherited environment of every launch.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

/// `[timeouts]` section. Values are duration strings (`"250ms"`, `"3s"`).
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsSection {
    /// Default deadline for run-to-completion.
    #[serde(default = "default_exit_timeout")]
    pub exit_timeout: String,

    /// How long to wait for stdout/stderr drains to catch up once a process
    /// has exited.
    #[serde(default = "default_io_wait_timeout")]
    pub io_wait_timeout: String,

    /// Pause after launch before the handle is handed back.
    #[serde(default = "default_startup_wait_time")]
    pub startup_wait_time: String,

    /// Wait for a natural exit after input is closed (stop phase).
    #[serde(default = "default_stop_grace")]
    pub stop_grace: String,

    /// Wait after each termination signal (terminate phase).
    #[serde(default = "default_terminate_grace")]
    pub terminate_grace: String,
}

fn default_exit_timeout() -> String {
    "15s".to_string()
}

fn default_io_wait_timeout() -> String {
    "100ms".to_string()
}

fn default_startup_wait_time() -> String {
    "0ms".to_string()
}

fn default_stop_grace() -> String {
    "1s".to_string()
}

fn default_terminate_grace() -> String {
    "3s".to_string()
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            exit_timeout: default_exit_timeout(),
            io_wait_timeout: default_io_wait_timeout(),
            startup_wait_time: default_startup_wait_time(),
            stop_grace: default_stop_grace(),
            terminate_grace: default_terminate_grace(),
        }
    }
}

/// `[run]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    /// Directory every command is launched in.
    #[serde(default = "default_working_directory")]
    pub working_directory: String,

    /// Cooperative signal sent when terminating (`"TERM"`, `"SIGINT"`, ...).
    #[serde(default = "default_stop_signal")]
    pub stop_signal: String,

    /// Explicit executable search path. Empty means "use `PATH`".
    #[serde(default)]
    pub search_path: Vec<String>,

    /// Extensions tried for every candidate (e.g. `".exe"`). Empty means the
    /// platform default.
    #[serde(default)]
    pub executable_extensions: Vec<String>,

    /// Whether run-to-completion fails on timeout / non-zero exit by default.
    #[serde(default)]
    pub fail_on_nonzero: bool,
}

fn default_working_directory() -> String {
    ".".to_string()
}

fn default_stop_signal() -> String {
    "TERM".to_string()
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            working_directory: default_working_directory(),
            stop_signal: default_stop_signal(),
            search_path: Vec::new(),
            executable_extensions: Vec::new(),
            fail_on_nonzero: false,
        }
    }
}

/// Validated timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub exit_timeout: Duration,
    pub io_wait_timeout: Duration,
    pub startup_wait_time: Duration,
    pub stop_grace: Duration,
    pub terminate_grace: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            exit_timeout: Duration::from_secs(15),
            io_wait_timeout: Duration::from_millis(100),
            startup_wait_time: Duration::ZERO,
            stop_grace: Duration::from_secs(1),
            terminate_grace: Duration::from_secs(3),
        }
    }
}

/// Validated configuration for one test run.
///
/// Construct via `ConfigFile::try_from(RawConfigFile)` (see `validate.rs`)
/// or [`ConfigFile::default`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub timeouts: Timeouts,
    pub working_directory: PathBuf,
    pub stop_signal: String,
    pub search_path: Vec<PathBuf>,
    pub executable_extensions: Vec<String>,
    pub fail_on_nonzero: bool,
    pub environment: BTreeMap<String, String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            working_directory: PathBuf::from("."),
            stop_signal: "SIGTERM".to_string(),
            search_path: Vec::new(),
            executable_extensions: Vec::new(),
            fail_on_nonzero: false,
            environment: BTreeMap::new(),
        }
    }
}
