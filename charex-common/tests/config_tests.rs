//! Configuration resolution tests
//!
//! Tests that touch DATA_DIR or CHAREX_CONFIG are marked #[serial] so they
//! never race on the process environment.

use charex_common::config::{resolve_path, TomlConfig, DATA_DIR_ENV, DEFAULT_DATA_DIR, DEFAULT_PORT};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

#[test]
fn test_defaults_when_config_empty() {
    let config: TomlConfig = toml::from_str("").unwrap();

    assert_eq!(config.hub.outbound_capacity, 256);
    assert_eq!(config.hub.command_capacity, 1024);
    assert_eq!(config.fetch.timeout_secs, 30);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.resolve_port(None), DEFAULT_PORT);
}

#[test]
fn test_toml_values_parsed() {
    let config: TomlConfig = toml::from_str(
        r#"
        data_dir = "/srv/cards"
        port = 8080

        [hub]
        outbound_capacity = 8

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    assert_eq!(config.data_dir, Some(PathBuf::from("/srv/cards")));
    assert_eq!(config.resolve_port(None), 8080);
    assert_eq!(config.hub.outbound_capacity, 8);
    assert_eq!(config.hub.command_capacity, 1024, "Unset keys keep defaults");
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_cli_port_beats_toml() {
    let config: TomlConfig = toml::from_str("port = 8080").unwrap();
    assert_eq!(config.resolve_port(Some(7000)), 7000);
}

#[test]
#[serial]
fn test_data_dir_priority_order() {
    env::remove_var(DATA_DIR_ENV);
    let config: TomlConfig = toml::from_str(r#"data_dir = "/from/toml""#).unwrap();

    // TOML beats default
    assert_eq!(config.resolve_data_dir(None), PathBuf::from("/from/toml"));

    // Env beats TOML
    env::set_var(DATA_DIR_ENV, "/from/env");
    assert_eq!(config.resolve_data_dir(None), PathBuf::from("/from/env"));

    // CLI beats env
    assert_eq!(
        config.resolve_data_dir(Some(Path::new("/from/cli"))),
        PathBuf::from("/from/cli")
    );

    env::remove_var(DATA_DIR_ENV);
}

#[test]
#[serial]
fn test_data_dir_falls_back_to_default() {
    env::remove_var(DATA_DIR_ENV);
    let resolved = resolve_path(None, DATA_DIR_ENV, None, Path::new(DEFAULT_DATA_DIR));
    assert_eq!(resolved, PathBuf::from("output"));
}

#[test]
fn test_from_file_reports_malformed_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = \"not a number\"").unwrap();

    let result = TomlConfig::from_file(file.path());
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_load_or_default_survives_malformed_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "this is [not toml").unwrap();

    env::set_var("CHAREX_CONFIG", file.path());
    let config = TomlConfig::load_or_default();
    env::remove_var("CHAREX_CONFIG");

    assert!(config.data_dir.is_none());
    assert_eq!(config.hub.outbound_capacity, 256);
}

#[test]
#[serial]
fn test_load_or_default_reads_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "static_dir = \"/srv/ui\"").unwrap();

    env::set_var("CHAREX_CONFIG", file.path());
    let config = TomlConfig::load_or_default();
    env::remove_var("CHAREX_CONFIG");

    assert_eq!(config.resolve_static_dir(None), PathBuf::from("/srv/ui"));
}
