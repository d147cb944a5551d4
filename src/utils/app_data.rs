use crate::automaton::Traversal;
use crate::dat::TrieOptions;
use crate::server::ServerConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const APP_NAME: &str = "acdat";
const CONFIG_FILE: &str = "config.json";

/// Application configuration stored in the app data directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Trie construction options
    #[serde(default)]
    pub trie: TrieOptions,

    /// Order in which fail links are computed
    #[serde(default)]
    pub traversal: Traversal,

    /// Search server tuning
    #[serde(default)]
    pub server: ServerConfig,

    /// Dictionary served when none is given on the command line
    #[serde(default)]
    pub dictionary: Option<PathBuf>,
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            let config: AppConfig = serde_json::from_str(&content)
                .context("Failed to parse config file")?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the app data directory
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .context("Failed to write config file")?;
        Ok(())
    }

    /// Worker threads to start (resolves 0 to CPU count)
    pub fn effective_workers(&self) -> usize {
        if self.server.workers == 0 {
            num_cpus()
        } else {
            self.server.workers
        }
    }
}

/// Get the number of CPUs available
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support"))
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert!(config.trie.use_tail);
        assert!(config.trie.use_user_data);
        assert_eq!(config.traversal, Traversal::Bfs);
        assert_eq!(config.server.backlog, -1);
        assert!(config.dictionary.is_none());
    }

    #[test]
    fn test_app_config_effective_workers() {
        let mut config = AppConfig::default();

        // 0 should resolve to CPU count
        assert!(config.effective_workers() >= 1);

        // Explicit value should be used as-is
        config.server.workers = 4;
        assert_eq!(config.effective_workers(), 4);
    }

    #[test]
    fn test_app_config_serialization() {
        let mut config = AppConfig::default();
        config.traversal = Traversal::Dfs;
        config.trie.use_tail = false;
        config.server.cache_size = 8;

        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
        assert!(json.contains("\"dfs\""));
    }

    #[test]
    fn test_app_config_partial_json() {
        // Should use defaults for missing fields
        let json = r#"{"traversal": "dfs", "server": {"workers": 2}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.traversal, Traversal::Dfs);
        assert_eq!(config.server.workers, 2);
        assert_eq!(config.server.cache_size, ServerConfig::default().cache_size);
        assert_eq!(config.trie, TrieOptions::default());
    }

    #[test]
    fn test_app_config_empty_json() {
        // Empty object should use all defaults
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
