use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use bluemarble_render::{FilterPolicy, ManagerConfig, DEFAULT_DRAW_MULTIPLIER, TILE_SIZE};

/// Host configuration, stored as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Odd shred block size; 3 unless the remote grid changes.
    #[serde(default = "default_draw_multiplier")]
    pub draw_multiplier: u32,
    /// Numeric user id used to derive the author id of new templates.
    #[serde(default)]
    pub user_id: Option<u64>,
    /// Custom storage directory. When empty, a `storage/` folder next to the executable is used.
    #[serde(default)]
    pub storage_dir: String,
    #[serde(default = "default_true")]
    pub draw_templates: bool,
    #[serde(default)]
    pub filter_policy: FilterPolicy,
}

fn default_tile_size() -> u32 {
    TILE_SIZE
}
fn default_draw_multiplier() -> u32 {
    DEFAULT_DRAW_MULTIPLIER
}
fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tile_size: default_tile_size(),
            draw_multiplier: default_draw_multiplier(),
            user_id: None,
            storage_dir: String::new(),
            draw_templates: true,
            filter_policy: FilterPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the OS config directory when `None`.
    /// Missing or unreadable files fall back to defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
        if !path.exists() {
            debug!("No config file at {}", path.display());
            return Self::default();
        }
        match fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str::<AppConfig>(&json) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => error!("Failed to parse config: {e}"),
            },
            Err(e) => error!("Failed to read config file: {e}"),
        }
        Self::default()
    }

    /// Write the config to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        debug!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn storage_path(&self) -> PathBuf {
        if self.storage_dir.is_empty() {
            crate::app_dir::storage_directory()
        } else {
            PathBuf::from(&self.storage_dir)
        }
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            tile_size: self.tile_size,
            draw_multiplier: self.draw_multiplier,
            filter_policy: self.filter_policy,
            draw_templates: self.draw_templates,
            user_id: self.user_id,
        }
    }
}

pub fn config_path() -> PathBuf {
    crate::app_dir::config_directory().join("config.json")
}
