//! Repository configuration stored at `.dgit/config.json`

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Name of the config file inside the metadata directory
pub const CONFIG_FILE: &str = "config.json";

/// Identity used for author and committer lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    pub name: String,
    pub email: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            name: "dgit User".to_string(),
            email: "user@example.com".to_string(),
        }
    }
}

/// Per-repository settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub user: UserConfig,
    /// UTC offset label written into signatures
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Names skipped at every level when snapshotting the work tree
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

fn default_timezone() -> String {
    "+0000".to_string()
}

fn default_ignore() -> Vec<String> {
    vec![
        ".dgit".to_string(),
        ".git".to_string(),
        ".gitignore".to_string(),
    ]
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            user: UserConfig::default(),
            timezone: default_timezone(),
            ignore: default_ignore(),
        }
    }
}

impl RepositoryConfig {
    /// Load config from a metadata directory, falling back to defaults
    pub fn load(git_dir: &Path) -> Result<Self> {
        let config_path = git_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&config_path).map_err(Error::io_at(&config_path))?;
        let config: Self = serde_json::from_str(&data)?;
        crate::commit::check_identity(&config.user.name, &config.user.email)?;
        crate::commit::check_offset(&config.timezone)?;
        Ok(config)
    }

    /// Save config into a metadata directory
    pub fn save(&self, git_dir: &Path) -> Result<()> {
        let config_path = git_dir.join(CONFIG_FILE);
        let tmp_path = config_path.with_extension("tmp");
        let data = serde_json::to_string_pretty(self)?;
        fs::write(&tmp_path, &data).map_err(Error::io_at(&tmp_path))?;
        fs::rename(&tmp_path, &config_path).map_err(Error::io_at(&config_path))?;
        Ok(())
    }
}
