//! Config files on disk.

use std::path::PathBuf;

use prison_bot::config::{BotConfig, ConfigError};
use prison_client::TokenAlgorithm;

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/bot.ron")
}

#[test]
fn test_sample_config_loads() {
    let config = BotConfig::load(sample_path()).unwrap();
    assert_eq!(config.planet.as_deref(), Some("mars"));
    assert_eq!(config.token, TokenAlgorithm::Rolling);
    assert!(config.settings.stand_on_enemy);
    assert_eq!(config.settings.idle_reconnect_delay(), 10_000);
    assert!(config.filters.to_lists().black_nick.is_empty());
}

#[test]
fn test_written_config_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saved.ron");

    let mut config = BotConfig::default();
    config.recovery_code = Some("123456".to_string());
    config.filters.white_clan = "Allies\nFriends".to_string();
    std::fs::write(&path, config.to_ron_string().unwrap()).unwrap();

    let loaded = BotConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.filters.to_lists().white_clan.len(), 2);
}

#[test]
fn test_garbage_file_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ron");
    std::fs::write(&path, "(settings: [1, 2])").unwrap();
    assert!(matches!(
        BotConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}
