use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;

pub const DEFAULT_CONFIG_FILE: &str = "glitch-export.json";
pub const DEFAULT_API_BASE_URL: &str = "https://api.glitch.com";
pub const DEFAULT_PAGE_LIMIT: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Upper bound on projects per category; the listing endpoint is not paginated.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_output_dir")]
    pub output_dir: Utf8PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            page_limit: default_page_limit(),
            timeout_secs: None,
            output_dir: default_output_dir(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_page_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

fn default_output_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(".")
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the config file. An explicit path must exist; the default file is optional.
    pub fn resolve(path: Option<&str>) -> Result<Config, ExportError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ExportError::ConfigRead(config_path.clone()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Config, ExportError> {
        let config: Config = serde_json::from_str(content)
            .map_err(|err| ExportError::ConfigParse(err.to_string()))?;
        if config.page_limit == 0 {
            return Err(ExportError::ConfigParse(
                "page_limit must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = ConfigLoader::parse("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn trailing_slash_is_ignored() {
        let config = ConfigLoader::parse(r#"{"api_base_url": "http://localhost:8080/"}"#).unwrap();
        assert_eq!(config.api_base_url(), "http://localhost:8080");
    }
}
