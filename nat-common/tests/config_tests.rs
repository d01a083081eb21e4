//! Configuration resolution and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate NAT_CONFIG are marked with #[serial].

use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

use nat_common::articles::SelectionStrategy;
use nat_common::config::{
    resolve_config_path, ConfigSource, TomlConfig, CONFIG_ENV_VAR, DEFAULT_PORT,
};
use nat_common::sink::SinkConfig;
use nat_common::survey::RationaleRule;
use nat_common::TaxonomyVersion;
use serial_test::serial;

const FULL_CONFIG: &str = r#"
bind_address = "0.0.0.0"
port = 8080
production = true

[dataset]
path = "/srv/nat/articles.csv"
seed = 99

[dataset.strategy]
kind = "random"

[annotation]
min_words = 3
max_words = 30
taxonomy = "v1"

[annotation.rationale_rule]
kind = "min_words"
value = 5

[sink]
kind = "firebase"
database_url = "https://study.firebaseio.com"
auth_token = "secret"

[sessions]
idle_timeout_secs = 1800
finished_ttl_secs = 0

[logging]
level = "debug"
"#;

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn test_full_config_parses() {
    let config = TomlConfig::parse(FULL_CONFIG).unwrap();

    assert_eq!(config.socket_addr(), "0.0.0.0:8080");
    assert!(config.production);
    assert_eq!(config.dataset.path, PathBuf::from("/srv/nat/articles.csv"));
    assert_eq!(config.dataset.strategy, SelectionStrategy::Random);
    assert_eq!(config.dataset.seed, Some(99));
    assert_eq!(config.annotation.min_words, 3);
    assert_eq!(config.annotation.taxonomy, TaxonomyVersion::V1);
    assert_eq!(config.annotation.rationale_rule, RationaleRule::MinWords(5));
    assert_eq!(
        config.sink,
        SinkConfig::Firebase {
            database_url: "https://study.firebaseio.com".to_string(),
            auth_token: Some("secret".to_string()),
        }
    );
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.sessions.idle_timeout_secs, 1800);
    assert_eq!(config.sessions.finished_ttl_secs, 0);
    assert_eq!(config.sessions.sweep_interval_secs, 60);
}

#[test]
fn test_partial_config_fills_defaults() {
    let config = TomlConfig::parse("port = 9000\n[annotation]\nmax_words = 40\n").unwrap();
    assert_eq!(config.port, 9000);
    assert_eq!(config.annotation.min_words, 4);
    assert_eq!(config.annotation.max_words, 40);
    assert_eq!(config.annotation.rationale_rule, RationaleRule::MinCharacters(100));
    assert_eq!(config.dataset.strategy, SelectionStrategy::default());
}

#[test]
fn test_fixed_strategy_indices_from_file() {
    let config =
        TomlConfig::parse("[dataset.strategy]\nkind = \"fixed\"\nindices = [0, 5, 9]\n").unwrap();
    assert_eq!(
        config.dataset.strategy,
        SelectionStrategy::Fixed {
            indices: vec![0, 5, 9]
        }
    );
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "port = \"not a number\"");
    assert!(TomlConfig::load(&path).is_err());
}

#[test]
#[serial]
fn test_cli_argument_wins_over_env() {
    env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
    let resolved = resolve_config_path(Some(Path::new("/from/cli.toml")));
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(PathBuf::from("/from/cli.toml")));
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
    let resolved = resolve_config_path(None);
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved, Some(PathBuf::from("/from/env.toml")));
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let (config, source) = TomlConfig::load_or_default(Some(&missing)).unwrap();
    assert_eq!(config, TomlConfig::default());
    assert_eq!(source, ConfigSource::Missing(missing));
    assert_eq!(config.port, DEFAULT_PORT);
}

#[test]
#[serial]
fn test_env_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), FULL_CONFIG);

    env::set_var(CONFIG_ENV_VAR, &path);
    let config = TomlConfig::load_or_default(None);
    env::remove_var(CONFIG_ENV_VAR);

    let (config, source) = config.unwrap();
    assert_eq!(config.port, 8080);
    assert_eq!(source, ConfigSource::File(path));
}
