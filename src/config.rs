//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.surveyboard.toml` files.

use crate::analysis::MAX_DECIMALS;
use crate::auth::identity_toolkit::DEFAULT_ENDPOINT;
use crate::cli::{Args, Command};
use crate::models::{CategorySet, CategorySetError};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".surveyboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Survey settings.
    #[serde(default)]
    pub survey: SurveyConfig,

    /// Document store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Identity provider settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// What the survey asks and where answers go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    /// Collection holding the responses.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Interest categories offered on the form, in display order.
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            categories: default_categories(),
        }
    }
}

fn default_collection() -> String {
    "responses".to_string()
}

fn default_categories() -> Vec<String> {
    vec!["Employee", "Public Service", "Own Business"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the collection files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// How often live views check for new responses, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl StoreConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".surveyboard")
}

fn default_poll_interval() -> u64 {
    500
}

/// Identity provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Web API key of the identity project.
    #[serde(default)]
    pub api_key: String,

    /// Identity Toolkit base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_endpoint(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Decimal places on the public results view.
    #[serde(default = "default_public_decimals")]
    pub public_decimals: u32,

    /// Decimal places on the detail dashboard.
    #[serde(default)]
    pub admin_decimals: u32,

    /// Default CSV export path.
    #[serde(default = "default_csv_file")]
    pub csv_file: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            public_decimals: default_public_decimals(),
            admin_decimals: 0,
            csv_file: default_csv_file(),
        }
    }
}

fn default_public_decimals() -> u32 {
    1
}

fn default_csv_file() -> PathBuf {
    PathBuf::from("survey_responses.csv")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence, but only when explicitly provided.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref data_dir) = args.data_dir {
            self.store.data_dir = data_dir.clone();
        }
        if let Some(ref collection) = args.collection {
            self.survey.collection = collection.clone();
        }
        if let Some(poll_interval) = args.poll_interval {
            self.store.poll_interval_ms = poll_interval;
        }

        if let Command::Dashboard { login, .. } | Command::Export { login, .. } = &args.command {
            if let Some(ref api_key) = login.api_key {
                self.auth.api_key = api_key.clone();
            }
        }
    }

    /// Reject values the store and the views cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.store.poll_interval_ms == 0 {
            bail!("[store] poll_interval_ms must be at least 1");
        }

        for (key, decimals) in [
            ("public_decimals", self.report.public_decimals),
            ("admin_decimals", self.report.admin_decimals),
        ] {
            if decimals > MAX_DECIMALS {
                bail!(
                    "[report] {} must be at most {}, got {}",
                    key,
                    MAX_DECIMALS,
                    decimals
                );
            }
        }

        Ok(())
    }

    /// The validated set of known categories.
    pub fn category_set(&self) -> Result<CategorySet, CategorySetError> {
        CategorySet::new(self.survey.categories.iter().cloned())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
