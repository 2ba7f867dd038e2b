//! Editor-side metadata that the world files do not carry.
//!
//! `level-data.json` lists every world file with a display name and the
//! blockmap byte budget of each of its levels.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub name: String,
    pub blockmap_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub world_file: String,
    pub levels: Vec<LevelConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameConfig {
    pub worlds: Vec<WorldConfig>,
}

impl GameConfig {
    pub const DEFAULT_FILE: &'static str = "level-data.json";

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| Error::Config { path: path.to_path_buf(), source })
    }
}
