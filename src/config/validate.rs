// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, RawConfigFile, Timeouts, TimeoutsSection};
use crate::errors::{HarnessError, Result};
use crate::process::signal::canonical_signal_name;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::HarnessError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let timeouts = validate_timeouts(&raw.timeouts)?;
        let stop_signal = validate_stop_signal(&raw.run.stop_signal)?;
        validate_working_directory(&raw.run.working_directory)?;
        validate_extensions(&raw.run.executable_extensions)?;
        validate_environment(&raw)?;

        Ok(ConfigFile {
            timeouts,
            working_directory: PathBuf::from(&raw.run.working_directory),
            stop_signal,
            search_path: raw.run.search_path.iter().map(PathBuf::from).collect(),
            executable_extensions: raw.run.executable_extensions,
            fail_on_nonzero: raw.run.fail_on_nonzero,
            environment: raw.environment,
        })
    }
}

fn validate_timeouts(section: &TimeoutsSection) -> Result<Timeouts> {
    let timeouts = Timeouts {
        exit_timeout: duration_field("exit_timeout", &section.exit_timeout)?,
        io_wait_timeout: duration_field("io_wait_timeout", &section.io_wait_timeout)?,
        startup_wait_time: duration_field("startup_wait_time", &section.startup_wait_time)?,
        stop_grace: duration_field("stop_grace", &section.stop_grace)?,
        terminate_grace: duration_field("terminate_grace", &section.terminate_grace)?,
    };

    if timeouts.exit_timeout == Duration::ZERO {
        return Err(HarnessError::ConfigError(
            "[timeouts].exit_timeout must be greater than zero".to_string(),
        ));
    }
    if timeouts.terminate_grace == Duration::ZERO {
        return Err(HarnessError::ConfigError(
            "[timeouts].terminate_grace must be greater than zero".to_string(),
        ));
    }

    Ok(timeouts)
}

fn duration_field(name: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| HarnessError::ConfigError(format!("[timeouts].{name}: {e}")))
}

fn validate_stop_signal(name: &str) -> Result<String> {
    canonical_signal_name(name).ok_or_else(|| {
        HarnessError::ConfigError(format!("[run].stop_signal: unknown signal '{name}'"))
    })
}

fn validate_working_directory(dir: &str) -> Result<()> {
    if dir.trim().is_empty() {
        return Err(HarnessError::ConfigError(
            "[run].working_directory must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_extensions(extensions: &[String]) -> Result<()> {
    for ext in extensions {
        if !ext.is_empty() && !ext.starts_with('.') {
            return Err(HarnessError::ConfigError(format!(
                "[run].executable_extensions: '{ext}' must start with '.'"
            )));
        }
    }
    Ok(())
}

fn validate_environment(raw: &RawConfigFile) -> Result<()> {
    for name in raw.environment.keys() {
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            return Err(HarnessError::ConfigError(format!(
                "[environment]: invalid variable name '{name}'"
            )));
        }
    }
    Ok(())
}
