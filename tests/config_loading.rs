// tests/config_loading.rs

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use procharness::config::{
    ConfigFile, default_config_path, format_duration, load_and_validate, load_or_default,
    parse_duration,
};
use procharness::errors::HarnessError;
use procharness::process::LaunchOptions;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_empty_file_gives_defaults() {
    let file = config_file("");
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.timeouts.exit_timeout, Duration::from_secs(15));
    assert_eq!(cfg.timeouts.io_wait_timeout, Duration::from_millis(100));
    assert_eq!(cfg.timeouts.startup_wait_time, Duration::ZERO);
    assert_eq!(cfg.timeouts.stop_grace, Duration::from_secs(1));
    assert_eq!(cfg.timeouts.terminate_grace, Duration::from_secs(3));
    assert_eq!(cfg.working_directory, PathBuf::from("."));
    assert_eq!(cfg.stop_signal, "SIGTERM");
    assert!(cfg.search_path.is_empty());
    assert!(!cfg.fail_on_nonzero);
    assert!(cfg.environment.is_empty());
}

#[test]
fn test_full_file_is_parsed() {
    let file = config_file(
        r#"
[timeouts]
exit_timeout = "2m"
io_wait_timeout = "250ms"
startup_wait_time = "1s"
stop_grace = "500ms"
terminate_grace = "5s"

[run]
working_directory = "tmp/work"
stop_signal = "int"
search_path = ["bin", "/usr/local/bin"]
executable_extensions = [".sh"]
fail_on_nonzero = true

[environment]
LANG = "C"
HOME = "/tmp/home"
"#,
    );
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.timeouts.exit_timeout, Duration::from_secs(120));
    assert_eq!(cfg.timeouts.io_wait_timeout, Duration::from_millis(250));
    assert_eq!(cfg.timeouts.startup_wait_time, Duration::from_secs(1));
    assert_eq!(cfg.working_directory, PathBuf::from("tmp/work"));
    assert_eq!(cfg.stop_signal, "SIGINT");
    assert_eq!(
        cfg.search_path,
        vec![PathBuf::from("bin"), PathBuf::from("/usr/local/bin")]
    );
    assert_eq!(cfg.executable_extensions, vec![".sh".to_string()]);
    assert!(cfg.fail_on_nonzero);
    assert_eq!(cfg.environment["LANG"], "C");

    let options = LaunchOptions::from_config(&cfg);
    assert_eq!(options.policy.stop_grace, Duration::from_millis(500));
    assert_eq!(options.policy.terminate_grace, Duration::from_secs(5));
    assert_eq!(options.policy.stop_signal, "SIGINT");
    assert_eq!(options.startup_wait_time, Duration::from_secs(1));
}

#[test]
fn test_invalid_duration_names_the_field() {
    let file = config_file(
        r#"
[timeouts]
io_wait_timeout = "soon"
"#,
    );

    match load_and_validate(file.path()) {
        Err(HarnessError::ConfigError(msg)) => assert!(msg.contains("io_wait_timeout")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_zero_exit_timeout_is_rejected() {
    let file = config_file(
        r#"
[timeouts]
exit_timeout = "0s"
"#,
    );

    let result = load_and_validate(file.path());
    assert!(matches!(result, Err(HarnessError::ConfigError(msg)) if msg.contains("exit_timeout")));
}

#[cfg(unix)]
#[test]
fn test_unknown_stop_signal_is_rejected() {
    let file = config_file(
        r#"
[run]
stop_signal = "SIGBOGUS"
"#,
    );

    match load_and_validate(file.path()) {
        Err(HarnessError::ConfigError(msg)) => {
            assert!(msg.contains("stop_signal"));
            assert!(msg.contains("SIGBOGUS"));
        }
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn test_extension_without_dot_is_rejected() {
    let file = config_file(
        r#"
[run]
executable_extensions = ["exe"]
"#,
    );

    let result = load_and_validate(file.path());
    assert!(matches!(result, Err(HarnessError::ConfigError(_))));
}

#[test]
fn test_malformed_toml_is_a_toml_error() {
    let file = config_file("[timeouts\nexit_timeout = 3");

    let result = load_and_validate(file.path());
    assert!(matches!(result, Err(HarnessError::TomlError(_))));
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_or_default(dir.path().join("nope.toml"));

    assert!(matches!(result, Err(HarnessError::IoError(_))));
}

#[test]
fn test_missing_default_file_gives_defaults() {
    if default_config_path().exists() {
        return;
    }
    let cfg = load_or_default(default_config_path()).unwrap();
    assert_eq!(cfg.stop_signal, ConfigFile::default().stop_signal);
}

#[test]
fn test_duration_strings() {
    assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    assert_eq!(parse_duration(" 3s ").unwrap(), Duration::from_secs(3));
    assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("3 days").is_err());
    assert!(parse_duration("307445734561825861m").is_err());
    assert!(parse_duration("18446744073709551615h").is_err());

    assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
    assert_eq!(format_duration(Duration::from_secs(90)), "90s");
    assert_eq!(format_duration(Duration::from_secs(120)), "2m");
    assert_eq!(format_duration(Duration::ZERO), "0s");
}

#[test]
fn test_overflowing_duration_is_a_config_error() {
    let file = config_file(
        r#"
[timeouts]
stop_grace = "307445734561825861m"
"#,
    );

    match load_and_validate(file.path()) {
        Err(HarnessError::ConfigError(msg)) => {
            assert!(msg.contains("stop_grace"));
            assert!(msg.contains("too large"));
        }
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}
