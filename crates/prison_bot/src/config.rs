//! Bot configuration loaded from RON.
//!
//! Every field has a default, so a config file only needs the values that
//! differ:
//!
//! ```ron
//! (
//!     recovery_code: Some("123456"),
//!     planet: Some("mars"),
//!     settings: (stand_on_enemy: true, attack_min: "1500"),
//!     filters: (black_nick: "Evil\nWorse"),
//! )
//! ```

use std::path::Path;

use prison_client::{TokenAlgorithm, DEFAULT_ENDPOINT};
use prison_core::filters::FilterLists;
use prison_core::settings::Settings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found.
    #[error("Config file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Failed to write RON.
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] ron::Error),
}

/// Filter lists as the user types them: one name per line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterText {
    /// Clans to target.
    pub black_clan: String,
    /// Nicks to target.
    pub black_nick: String,
    /// Clans to spare.
    pub white_clan: String,
    /// Nicks to spare.
    pub white_nick: String,
}

impl FilterText {
    /// Split the text blocks into filter lists.
    #[must_use]
    pub fn to_lists(&self) -> FilterLists {
        FilterLists::from_blocks(
            &self.black_clan,
            &self.black_nick,
            &self.white_clan,
            &self.white_nick,
        )
    }
}

/// Complete bot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Server endpoint.
    pub endpoint: String,
    /// Recovery code used to log in. Without one the bot waits for a
    /// `connect` command.
    pub recovery_code: Option<String>,
    /// Planet to join after authenticating.
    pub planet: Option<String>,
    /// Challenge token derivation.
    pub token: TokenAlgorithm,
    /// Arm the bot as soon as the worker starts.
    pub auto_start: bool,
    /// Engine settings.
    pub settings: Settings,
    /// Filter lists.
    pub filters: FilterText,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            recovery_code: None,
            planet: None,
            token: TokenAlgorithm::default(),
            auto_start: false,
            settings: Settings::default(),
            filters: FilterText::default(),
        }
    }
}

impl BotConfig {
    /// Load a configuration from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ConfigError> {
        let config: BotConfig = ron::from_str(ron)?;
        Ok(config)
    }

    /// Render as pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let ron = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        Ok(ron)
    }
}
