use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use docflow_cli::{
    load_config, log_destination, CliConfig, ConfigError, LogConfig, LogLevel, LogTarget,
    ServerConfig,
};
use docflow_logging::LogDestination;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.ron");

    let err = load_config(Some(&path)).unwrap_err();

    assert!(matches!(err, ConfigError::Read { path: p, .. } if p == path));
}

#[test]
fn malformed_file_reports_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("docflow.ron");
    fs::write(&path, "(server: (base_url: 42))").unwrap();

    let err = load_config(Some(&path)).unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("docflow.ron"));
}

#[test]
fn partial_file_keeps_remaining_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("docflow.ron");
    fs::write(
        &path,
        r#"(
            server: (base_url: "http://analysis.local:9000", stream_idle_timeout_secs: Some(90)),
            log: (level: Debug),
        )"#,
    )
    .unwrap();

    let config = load_config(Some(&path)).unwrap();

    assert_eq!(
        config.server,
        ServerConfig {
            base_url: "http://analysis.local:9000".to_string(),
            stream_idle_timeout_secs: Some(90),
            ..ServerConfig::default()
        }
    );
    assert_eq!(config.log.level, LogLevel::Debug);
    assert_eq!(config.log.destination, LogTarget::Terminal);
    assert_eq!(config.log.file, LogConfig::default().file);
}

#[test]
fn empty_file_is_all_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("docflow.ron");
    fs::write(&path, "()").unwrap();

    assert_eq!(load_config(Some(&path)).unwrap(), CliConfig::default());
}

#[test]
fn server_config_converts_to_client_settings() {
    let server = ServerConfig {
        base_url: "http://10.0.0.5:8000/".to_string(),
        connect_timeout_secs: 3,
        request_timeout_secs: 45,
        stream_idle_timeout_secs: Some(120),
    };

    let settings = server.to_settings();

    assert_eq!(settings.base_url, "http://10.0.0.5:8000/");
    assert_eq!(settings.connect_timeout, Duration::from_secs(3));
    assert_eq!(settings.request_timeout, Duration::from_secs(45));
    assert_eq!(settings.stream_idle_timeout, Some(Duration::from_secs(120)));
}

#[test]
fn default_server_has_no_idle_watchdog() {
    assert_eq!(ServerConfig::default().to_settings().stream_idle_timeout, None);
}

#[test]
fn log_target_selects_destination() {
    let file = PathBuf::from("/tmp/docflow-test.log");
    let config = |destination| LogConfig {
        level: LogLevel::Info,
        destination,
        file: file.clone(),
    };

    assert_eq!(
        log_destination(&config(LogTarget::Terminal)),
        LogDestination::Terminal
    );
    assert_eq!(
        log_destination(&config(LogTarget::File)),
        LogDestination::File(file.clone())
    );
    assert_eq!(
        log_destination(&config(LogTarget::Both)),
        LogDestination::Both(file.clone())
    );
}

#[test]
fn log_level_maps_to_filter() {
    assert_eq!(log::LevelFilter::from(LogLevel::Off), log::LevelFilter::Off);
    assert_eq!(log::LevelFilter::from(LogLevel::Trace), log::LevelFilter::Trace);
    assert_eq!(log::LevelFilter::from(LogLevel::default()), log::LevelFilter::Info);
}
