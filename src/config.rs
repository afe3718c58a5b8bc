use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::filter::AllowedExtensions;

pub const DEFAULT_BASE_URL: &str = "https://image.baidu.com/search/acjson";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/80.0.3987.149 Safari/537.36";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DownloadConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_original")]
    pub original: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            allowed_extensions: default_allowed_extensions(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            original: default_original(),
        }
    }
}

impl DownloadConfig {
    pub fn allowed(&self) -> AllowedExtensions {
        self.allowed_extensions.iter().collect()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_page_size() -> usize {
    50
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("download")
}
fn default_allowed_extensions() -> Vec<String> {
    vec!["png".to_string(), "jpg".to_string()]
}
fn default_concurrency() -> usize {
    100
}
fn default_original() -> bool {
    true
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to built-in defaults.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate search
    if config.search.page_size == 0 {
        anyhow::bail!("search.page_size must be > 0");
    }
    if config.search.timeout_secs == 0 {
        anyhow::bail!("search.timeout_secs must be > 0");
    }
    if config.search.base_url.trim().is_empty() {
        anyhow::bail!("search.base_url must not be empty");
    }

    // Validate download
    if config.download.concurrency == 0 {
        anyhow::bail!("download.concurrency must be > 0");
    }
    if config.download.timeout_secs == 0 {
        anyhow::bail!("download.timeout_secs must be > 0");
    }
    if config.download.allowed().is_empty() {
        anyhow::bail!("download.allowed_extensions must list at least one extension");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.search.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.search.page_size, 50);
        assert_eq!(config.download.concurrency, 100);
        assert_eq!(config.download.timeout_secs, 60);
        assert!(config.download.original);
        assert!(config.download.allowed().contains("jpg"));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
[search]
page_size = 30

[download]
allowed_extensions = [".PNG", "jpeg"]
"#,
        )
        .unwrap();
        assert_eq!(config.search.page_size, 30);
        assert_eq!(config.search.timeout_secs, 60);
        let allowed = config.download.allowed();
        assert!(allowed.contains("png"));
        assert!(allowed.contains("jpg"));
        assert_eq!(allowed.len(), 2);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let mut config = Config::default();
        config.download.concurrency = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn empty_allow_list_rejected() {
        let mut config = Config::default();
        config.download.allowed_extensions.clear();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = load_config_or_default(&tmp.path().join("nope.toml")).unwrap();
        assert_eq!(config.search.page_size, 50);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("harvest.toml");
        std::fs::write(&path, "[search]\npage_size = 0\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
