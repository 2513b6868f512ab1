use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "gwh.toml";

/// File and directory names that make up a warehouse layout.
///
/// Every layout path is derived from these plus the warehouse root, so tests
/// can stand up warehouses with distinct control directories side by side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub control_dir_name: String,
    pub control_db_file_name: String,
    pub analytics_dir_name: String,
    pub analytics_db_file_name: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            control_dir_name: ".gwh".to_string(),
            control_db_file_name: "control.db".to_string(),
            analytics_dir_name: "repositories".to_string(),
            analytics_db_file_name: "analytics.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GwhConfig {
    pub layout: LayoutConfig,
}

pub fn default_config_path_in(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

pub fn load_config(path: &Path) -> crate::Result<Option<GwhConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path)?;
    let config: GwhConfig = toml::from_str(&contents)
        .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(config))
}
