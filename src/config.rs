//! Configuration loaded from `rowbridge.toml`.
//!
//! ```toml
//! dialect = "openedge"
//!
//! [type_overrides]
//! "2005" = "big_string"
//! "-5" = "big_decimal"
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{BridgeError, BridgeResult};
use crate::types::{Dialect, SemanticType, TypeMap};

pub const CONFIG_FILE: &str = "rowbridge.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub dialect: Dialect,
    /// Type code (as a string key) to semantic type.
    pub type_overrides: BTreeMap<String, SemanticType>,
}

impl BridgeConfig {
    pub fn from_toml(content: &str) -> BridgeResult<Self> {
        toml::from_str(content).map_err(|e| BridgeError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Places searched by [`BridgeConfig::discover`], in order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("rowbridge").join("config.toml"));
        }
        paths
    }

    /// Load the first config file that exists, or defaults if none does.
    pub fn discover() -> BridgeResult<(Self, Option<PathBuf>)> {
        for path in Self::search_paths() {
            if path.exists() {
                let config = Self::load(&path)?;
                return Ok((config, Some(path)));
            }
        }
        Ok((Self::default(), None))
    }

    /// The dialect's table with the configured overrides applied.
    pub fn type_map(&self) -> BridgeResult<TypeMap> {
        let mut map = TypeMap::for_dialect(self.dialect);
        for (key, semantic) in &self.type_overrides {
            let code: i32 = key
                .trim()
                .parse()
                .map_err(|_| BridgeError::Config(format!("Invalid type code: '{}'", key)))?;
            map.set(code, *semantic);
        }
        Ok(map)
    }
}
