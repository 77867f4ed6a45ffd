use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .registry-bot.toml.
///
/// All fields are optional or defaulted — the bot runs with just a token
/// and a repository, both of which can also come from the command line or
/// the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// GitHub-specific settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Registry settings (label to scan, mapping file location)
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,

    /// Repository to operate on, as "owner/name".
    pub repository: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Issue label that marks registration requests
    #[serde(default = "default_label")]
    pub label: String,

    /// Path of the mapping file inside the repository
    #[serde(default = "default_mapping_path")]
    pub mapping_path: String,

    /// Commit message used when rewriting the mapping file
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            label: default_label(),
            mapping_path: default_mapping_path(),
            commit_message: default_commit_message(),
        }
    }
}

fn default_label() -> String {
    "register".to_string()
}

fn default_mapping_path() -> String {
    "registry.json".to_string()
}

fn default_commit_message() -> String {
    "update registry".to_string()
}

impl Config {
    /// Load configuration from .registry-bot.toml in the current directory.
    /// Returns default config if the file doesn't exist, with the token
    /// picked up from GITHUB_TOKEN when the file doesn't set one.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(".registry-bot.toml");
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };

        if config.github.token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                config.github.token = Some(token);
            }
        }

        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the GitHub token: config file value takes precedence,
    /// falls back to GITHUB_TOKEN env var.
    pub fn github_token(&self) -> Option<String> {
        self.github
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }
}
