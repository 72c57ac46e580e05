use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_AI_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_AI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config from '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Directory holding `store.json` and its backups
    pub data_dir: Option<PathBuf>,
    pub ai: AiConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_AI_MODEL.to_string(),
            endpoint: DEFAULT_AI_ENDPOINT.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Have a teammate answer each sent message
    pub simulate_replies: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            simulate_replies: true,
        }
    }
}

impl Config {
    /// Reads `config.toml` from the user config directory (when present),
    /// then applies environment overrides. A `.env` file in the working
    /// directory is loaded first.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("taskflow").join("config.toml"))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var("TASKFLOW_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(key) = var("GEMINI_API_KEY").or_else(|| var("API_KEY")) {
            self.ai.api_key = Some(key);
        }
        if let Some(model) = var("TASKFLOW_AI_MODEL") {
            self.ai.model = model;
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| {
                dirs::data_local_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("taskflow")
            })
            .join("store.json")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: Config = toml::from_str("[chat]\nsimulate_replies = false\n").unwrap();
        assert!(!config.chat.simulate_replies);
        assert_eq!(config.ai.model, DEFAULT_AI_MODEL);
        assert_eq!(config.ai.timeout_secs, 30);
        assert!(config.ai.api_key.is_none());
    }

    #[test]
    fn test_from_file_and_parse_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "data_dir = \"/srv/taskflow\"\n[ai]\nmodel = \"gemini-2.5-flash\"\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.ai.model, "gemini-2.5-flash");
        assert_eq!(config.store_path(), PathBuf::from("/srv/taskflow/store.json"));

        fs::write(&path, "[ai\n").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn test_environment_overrides() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("API_KEY", "fallback-key"), ("TASKFLOW_AI_MODEL", "custom")]);
        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.ai.api_key.as_deref(), Some("fallback-key"));
        assert_eq!(config.ai.model, "custom");
        assert!(config.data_dir.is_none());
    }
}
