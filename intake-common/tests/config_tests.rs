//! Unit tests for configuration loading and graceful degradation
//!
//! Covers:
//! - Missing config files fall back to defaults without failing startup
//! - Config path priority: CLI argument, then INTAKE_CONFIG
//! - Settings resolution and required upstream URL
//!
//! Note: tests touching INTAKE_CONFIG are marked #[serial] so environment
//! changes never race with each other.

use intake_common::config::{
    load_config, resolve_config_path, CacheConfig, LoggingConfig, Settings, TomlConfig,
    UpstreamConfig, CONFIG_ENV_VAR, DEFAULT_PORT, DEFAULT_REFRESH_LATEST_INSPECTION_URL,
};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_full_file_parses() {
    let toml_str = r#"
        port = 6000
        database_path = "/var/lib/intake/intake.db"

        [upstream]
        customer_latest_url = "https://portal.example/customers/latest"
        refresh_latest_inspection_url = "https://portal.example/customers/refresh"

        [cache]
        collection_ttl_minutes = 60
        intake_token_ttl_minutes = 5

        [logging]
        level = "debug"
    "#;

    let config = TomlConfig::from_toml_str(toml_str).unwrap();
    assert_eq!(config.port, Some(6000));
    assert_eq!(config.database_path, Some(PathBuf::from("/var/lib/intake/intake.db")));
    assert_eq!(config.cache.collection_ttl_minutes, 60);
    assert_eq!(config.cache.intake_token_ttl_minutes, 5);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_missing_sections_use_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        [upstream]
        customer_latest_url = "https://portal.example/latest"
    "#,
    )
    .unwrap();

    assert_eq!(config.port, None);
    assert_eq!(config.cache, CacheConfig::default());
    assert_eq!(config.cache.collection_ttl_minutes, 1440);
    assert_eq!(config.cache.intake_token_ttl_minutes, 30);
    assert_eq!(config.logging, LoggingConfig::default());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_invalid_toml_is_error() {
    assert!(TomlConfig::from_toml_str("port = \"not a number\"").is_err());
    assert!(TomlConfig::from_toml_str("[upstream\n").is_err());
}

#[test]
fn test_toml_roundtrip() {
    let config = TomlConfig {
        port: Some(7001),
        upstream: UpstreamConfig {
            customer_latest_url: Some("https://portal.example/latest".to_string()),
            refresh_latest_inspection_url: None,
        },
        ..Default::default()
    };

    let toml_str = toml::to_string(&config).unwrap();
    let parsed = TomlConfig::from_toml_str(&toml_str).unwrap();
    assert_eq!(parsed, config);
}

#[test]
#[serial]
fn test_cli_path_beats_env() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/intake-from-env.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/intake-from-cli.toml")));
    assert_eq!(resolved, Some(PathBuf::from("/tmp/intake-from-cli.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/intake-from-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/intake-from-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_degrades_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);

    let missing = PathBuf::from(format!("/tmp/intake-missing-{}.toml", std::process::id()));
    let config = load_config(Some(&missing)).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn test_load_from_env_file() {
    let file = write_config(
        r#"
        port = 6123
        [upstream]
        customer_latest_url = "https://portal.example/latest"
    "#,
    );
    env::set_var(CONFIG_ENV_VAR, file.path());

    let config = load_config(None).unwrap();
    assert_eq!(config.port, Some(6123));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_broken_file_is_error() {
    let file = write_config("port = [");
    assert!(load_config(Some(file.path())).is_err());
}

#[test]
fn test_settings_require_listing_url() {
    let err = Settings::resolve(TomlConfig::default(), None, None).unwrap_err();
    assert!(err.to_string().contains("customer_latest_url"));
}

#[test]
fn test_settings_defaults_and_overrides() {
    let config = TomlConfig {
        port: Some(6000),
        database_path: Some(PathBuf::from("/data/file.db")),
        upstream: UpstreamConfig {
            customer_latest_url: Some("https://portal.example/latest".to_string()),
            refresh_latest_inspection_url: None,
        },
        ..Default::default()
    };

    let settings = Settings::resolve(config.clone(), None, None).unwrap();
    assert_eq!(settings.port, 6000);
    assert_eq!(settings.database_path, PathBuf::from("/data/file.db"));
    assert_eq!(settings.refresh_latest_inspection_url, DEFAULT_REFRESH_LATEST_INSPECTION_URL);
    assert_eq!(settings.collection_ttl, Duration::from_secs(1440 * 60));
    assert_eq!(settings.intake_token_ttl, Duration::from_secs(30 * 60));

    let overridden =
        Settings::resolve(config, Some(7000), Some(PathBuf::from("/tmp/other.db"))).unwrap();
    assert_eq!(overridden.port, 7000);
    assert_eq!(overridden.database_path, PathBuf::from("/tmp/other.db"));

    let bare = Settings::resolve(
        TomlConfig {
            upstream: UpstreamConfig {
                customer_latest_url: Some("https://portal.example/latest".to_string()),
                refresh_latest_inspection_url: None,
            },
            ..Default::default()
        },
        None,
        None,
    )
    .unwrap();
    assert_eq!(bare.port, DEFAULT_PORT);
}

#[test]
fn test_zero_ttl_rejected() {
    let config = TomlConfig {
        upstream: UpstreamConfig {
            customer_latest_url: Some("https://portal.example/latest".to_string()),
            refresh_latest_inspection_url: None,
        },
        cache: CacheConfig {
            collection_ttl_minutes: 0,
            intake_token_ttl_minutes: 30,
        },
        ..Default::default()
    };
    assert!(Settings::resolve(config, None, None).is_err());
}
