// tests/logging_filter.rs

use procharness::cli::LogLevel;
use procharness::logging::log_filter;
use tracing::level_filters::LevelFilter;

#[test]
fn test_default_filter_is_info() {
    let filter = log_filter(None, None).unwrap();
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));

    // Blank counts as unset.
    let filter = log_filter(None, Some("  ")).unwrap();
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
}

#[test]
fn test_env_value_accepts_per_module_directives() {
    let filter = log_filter(None, Some("warn,procharness::process=trace")).unwrap();
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));

    let filter = log_filter(None, Some("error")).unwrap();
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));
}

#[test]
fn test_cli_level_wins_over_env() {
    let filter = log_filter(Some(LogLevel::Debug), Some("trace")).unwrap();
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

    // Only this crate is raised; dependencies keep `warn`.
    assert!(filter.to_string().contains("procharness=debug"));
}

#[test]
fn test_malformed_env_value_is_an_error() {
    let err = log_filter(None, Some("procharness=loudest")).unwrap_err();
    assert!(err.to_string().contains("PROCHARNESS_LOG"));

    // A CLI level does not even look at it.
    assert!(log_filter(Some(LogLevel::Warn), Some("procharness=loudest")).is_ok());
}
