use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::PotionKind;

/// Represents errors raised while loading a [`GameConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Prices charged by the shop, per potion kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopPrices {
    pub strength: u32,
    pub moves: u32,
    pub fancy: u32,
}

impl Default for ShopPrices {
    fn default() -> Self {
        ShopPrices {
            strength: 5,
            moves: 5,
            fancy: 10,
        }
    }
}

impl ShopPrices {
    pub fn price(&self, kind: PotionKind) -> u32 {
        match kind {
            PotionKind::Strength => self.strength,
            PotionKind::Move => self.moves,
            PotionKind::Fancy => self.fancy,
        }
    }
}

/// Tunable game rules. Every field has a default, so a config file only
/// needs to name what it overrides.
///
/// ```toml
/// coin_value = 3
///
/// [shop]
/// fancy = 12
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Money granted by each `$` coin on the map.
    pub coin_value: u32,
    pub shop: ShopPrices,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            coin_value: 5,
            shop: ShopPrices::default(),
        }
    }
}

impl GameConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading config");
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(?config, "Config loaded");
        Ok(config)
    }

    /// Loads from `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
