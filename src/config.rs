use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::events::ApiMode;

pub const DEFAULT_SERVER: &str = "http://localhost:5000";
pub const DEFAULT_LANGUAGE: &str = "English";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the Duck AI server
    pub server: Option<String>,

    /// Provider API key used when the free tier is off
    pub api_key: Option<String>,

    /// Value of the server's `session` cookie for a logged-in account
    pub session: Option<String>,

    /// Provider the backend should call with `api_key`
    pub api_mode: ApiMode,

    /// Model to request instead of the provider default
    pub custom_model: Option<String>,

    /// Language replies are written in
    pub language: String,

    /// Start with the free tier selected
    pub free_tier: bool,

    /// Seconds before a request is abandoned
    pub request_timeout_secs: u64,

    /// duckchat home directory
    #[serde(skip)]
    pub home: PathBuf,

    /// Values from `DUCKCHAT_*` variables; they win over the file but are never saved
    #[serde(skip)]
    pub env: EnvOverrides,
}

#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub server: Option<String>,
    pub api_key: Option<String>,
    pub session: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            server: None,
            api_key: None,
            session: None,
            api_mode: ApiMode::default(),
            custom_model: None,
            language: DEFAULT_LANGUAGE.to_string(),
            free_tier: true,
            request_timeout_secs: 60,
            home: home.join(".duckchat"),
            env: EnvOverrides::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let duckchat_home = home.join(".duckchat");
        let config_path = duckchat_home.join("config.toml");

        fs::create_dir_all(&duckchat_home).context("Failed to create .duckchat directory")?;

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Config::default()
        };

        config.home = duckchat_home;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Read the `DUCKCHAT_*` overrides
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        self.env = EnvOverrides {
            server: var("DUCKCHAT_SERVER"),
            api_key: var("DUCKCHAT_API_KEY"),
            session: var("DUCKCHAT_SESSION"),
        };
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.home).context("Failed to create .duckchat directory")?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(self.config_path(), content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn log_path(&self) -> PathBuf {
        self.home.join("duckchat.log")
    }

    pub fn server_url(&self) -> &str {
        non_blank(self.env.server.as_deref())
            .or_else(|| non_blank(self.server.as_deref()))
            .unwrap_or(DEFAULT_SERVER)
    }

    pub fn session_cookie(&self) -> Option<String> {
        non_blank(self.env.session.as_deref())
            .or_else(|| non_blank(self.session.as_deref()))
            .map(str::to_string)
    }

    /// API key in effect: the environment's, else the saved one
    pub fn api_key(&self) -> Option<&str> {
        non_blank(self.env.api_key.as_deref()).or_else(|| non_blank(self.api_key.as_deref()))
    }

    pub fn set_api_key(&mut self, key: String) {
        self.api_key = Some(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_select_free_tier() {
        let config = Config::default();
        assert!(config.free_tier);
        assert_eq!(config.server_url(), DEFAULT_SERVER);
        assert_eq!(config.language, DEFAULT_LANGUAGE);
        assert_eq!(config.api_key(), None);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            server = "https://duck.example"
            api_mode = "Hugging Face"
            free_tier = false
            "#,
        )
        .unwrap();

        assert_eq!(config.server_url(), "https://duck.example");
        assert_eq!(config.api_mode, ApiMode::HuggingFace);
        assert!(!config.free_tier);
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("DUCKCHAT_SERVER", "http://override"),
            ("DUCKCHAT_API_KEY", "sk-env"),
        ]
        .into_iter()
        .collect();

        let mut config = Config {
            server: Some("http://file".into()),
            ..Config::default()
        };
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.server_url(), "http://override");
        assert_eq!(config.api_key(), Some("sk-env"));
        assert_eq!(config.session_cookie(), None);
    }

    #[test]
    fn env_values_are_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            home: dir.path().to_path_buf(),
            api_key: Some("sk-file".into()),
            ..Config::default()
        };
        config.apply_env(|name| match name {
            "DUCKCHAT_API_KEY" => Some("sk-env".to_string()),
            "DUCKCHAT_SESSION" => Some("secret-cookie".to_string()),
            _ => None,
        });
        assert_eq!(config.api_key(), Some("sk-env"));
        config.save().unwrap();

        let content = std::fs::read_to_string(config.config_path()).unwrap();
        assert!(!content.contains("sk-env"));
        assert!(!content.contains("secret-cookie"));
        let reloaded: Config = toml::from_str(&content).unwrap();
        assert_eq!(reloaded.api_key(), Some("sk-file"));
    }

    #[test]
    fn blank_session_is_not_a_login() {
        let config = Config {
            session: Some("  ".into()),
            ..Config::default()
        };
        assert_eq!(config.session_cookie(), None);
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            home: dir.path().to_path_buf(),
            ..Config::default()
        };
        config.set_api_key("sk-saved".into());
        config.save().unwrap();

        let content = std::fs::read_to_string(config.config_path()).unwrap();
        let reloaded: Config = toml::from_str(&content).unwrap();
        assert_eq!(reloaded.api_key.as_deref(), Some("sk-saved"));
    }
}
