use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::User;

/// Top-level configuration loaded from `~/.notionera/config.toml`.
///
/// **Security**: this struct NEVER stores API tokens or page ids. It stores
/// the *names* of environment variables; [`EnvCredentialProvider`] resolves
/// them to values at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub notion: NotionConfig,
}

impl Config {
    /// Load config from `~/.notionera/config.toml`, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(path)
        } else {
            let cfg = Config::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let cfg: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save config to disk, creating parent directories if needed.
    pub fn save_to(&self, path: impl Into<PathBuf>) -> Result<(), ConfigError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        let text = self.to_toml()?;
        std::fs::write(&path, text).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Semantic validation for settings that are not expressible via types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.retry_max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "sync.retry_max_attempts must be at least 1".into(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        Ok(())
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".notionera")
            .join("config.toml")
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Cooperative delay between remote-mutating calls, in milliseconds.
    /// Keeps a multi-lecture run under the Notion API's informal rate limit.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_throttle_ms() -> u64 {
    200
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            throttle_ms: default_throttle_ms(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Env var names holding each user's integration token.
    #[serde(default = "default_token_envs")]
    pub token_envs: Vec<String>,
    /// Env var names holding each user's root page id.
    #[serde(default = "default_page_envs")]
    pub page_envs: Vec<String>,
}

fn default_api_base() -> String {
    "https://api.notion.com".to_string()
}

fn default_api_version() -> String {
    "2022-06-28".to_string()
}

fn default_token_envs() -> Vec<String> {
    User::ALL
        .into_iter()
        .map(|u| format!("NOTION_TOKEN_{}", u.display_name().to_uppercase()))
        .collect()
}

fn default_page_envs() -> Vec<String> {
    User::ALL
        .into_iter()
        .map(|u| format!("NOTION_PAGE_{}", u.display_name().to_uppercase()))
        .collect()
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_version: default_api_version(),
            token_envs: default_token_envs(),
            page_envs: default_page_envs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// One user's remote-workspace credential pair.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub root_page_id: String,
}

/// Maps a roster user to their workspace credential.
///
/// Injected into the coordinator and resolved once per job, so tests can
/// run against fakes instead of ambient process state.
pub trait CredentialProvider: Send + Sync {
    /// Returns `None` when the user has no usable credential configured;
    /// the coordinator skips that user's portion of the run.
    fn credential(&self, user: User) -> Option<Credential>;
}

/// Resolves credentials from the env var names listed in [`NotionConfig`].
pub struct EnvCredentialProvider {
    token_envs: Vec<String>,
    page_envs: Vec<String>,
}

impl EnvCredentialProvider {
    pub fn new(notion: &NotionConfig) -> Self {
        Self {
            token_envs: notion.token_envs.clone(),
            page_envs: notion.page_envs.clone(),
        }
    }

    fn env_for(vars: &[String], user: User) -> Option<String> {
        let idx = User::ALL.iter().position(|u| *u == user)?;
        let name = vars.get(idx)?;
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

impl CredentialProvider for EnvCredentialProvider {
    fn credential(&self, user: User) -> Option<Credential> {
        let token = Self::env_for(&self.token_envs, user)?;
        let root_page_id = Self::env_for(&self.page_envs, user)?;
        Some(Credential {
            token,
            root_page_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
