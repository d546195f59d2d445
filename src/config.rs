//! TOML configuration for the `corpai` client.
//!
//! Every section is optional; a missing file at the default location
//! means "use the defaults". See `config/corpai.example.toml`.

use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use corpai_core::models::{DEFAULT_CATEGORY, FALLBACK_CATEGORIES};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
        }
    }
}

fn default_token_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("corpai")
        .join("token")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_category")]
    pub default_category: String,
    #[serde(default = "default_fallback_categories")]
    pub fallback_categories: Vec<String>,
    #[serde(default = "default_true")]
    pub show_trace: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_category: default_category(),
            fallback_categories: default_fallback_categories(),
            show_trace: true,
        }
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}
fn default_fallback_categories() -> Vec<String> {
    FALLBACK_CATEGORIES.iter().map(|c| c.to_string()).collect()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    #[serde(default = "default_logs_limit")]
    pub logs_limit: u32,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            logs_limit: default_logs_limit(),
        }
    }
}

fn default_logs_limit() -> u32 {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_upload_categories")]
    pub categories: Vec<String>,
    #[serde(default = "default_upload_category")]
    pub default_category: String,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            categories: default_upload_categories(),
            default_category: default_upload_category(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_upload_categories() -> Vec<String> {
    ["Sales", "HR", "Technology", "Finance"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}
fn default_upload_category() -> String {
    "Sales".to_string()
}
fn default_allowed_extensions() -> Vec<String> {
    vec!["pdf".to_string()]
}

impl Config {
    /// Parsed backend base URL.
    pub fn base_url(&self) -> Result<Url> {
        parse_base_url(&self.server.base_url)
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("Invalid server.base_url: '{}'", raw))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => anyhow::bail!(
            "server.base_url must use http or https, got '{}'",
            other
        ),
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to defaults. An
/// explicitly requested file that is missing is still an error.
pub fn load_or_default(path: &Path, explicit: bool) -> Result<Config> {
    if !explicit && !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    load_config(path)
}

fn validate(config: &Config) -> Result<()> {
    parse_base_url(&config.server.base_url)?;

    if config.chat.default_category.trim().is_empty() {
        anyhow::bail!("chat.default_category must not be empty");
    }
    if config.chat.fallback_categories.is_empty() {
        anyhow::bail!("chat.fallback_categories must not be empty");
    }

    if config.admin.logs_limit < 1 {
        anyhow::bail!("admin.logs_limit must be >= 1");
    }

    if config.upload.categories.is_empty() {
        anyhow::bail!("upload.categories must not be empty");
    }
    if !config
        .upload
        .categories
        .contains(&config.upload.default_category)
    {
        anyhow::bail!(
            "upload.default_category '{}' is not one of upload.categories",
            config.upload.default_category
        );
    }

    Ok(())
}
