use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sensemaker_core::tags::SentimentKeys;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub tables: TablesConfig,
    #[serde(default)]
    pub tags: TagsConfig,
    #[serde(default)]
    pub citations: CitationsConfig,
    #[serde(default)]
    pub heatmap: HeatmapConfig,
    /// Question nickname → display label overrides.
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub base_id: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_kind() -> String {
    "rest".to_string()
}
fn default_base_url() -> String {
    "https://api.airtable.com/v0".to_string()
}
fn default_api_key_env() -> String {
    "SENSE_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct TablesConfig {
    #[serde(default = "default_survey")]
    pub survey: String,
    #[serde(default = "default_comments")]
    pub comments: String,
    #[serde(default = "default_tags_table")]
    pub tags: String,
    #[serde(default = "default_questions")]
    pub questions: String,
    #[serde(default = "default_insights")]
    pub insights: String,
    #[serde(default = "default_departments")]
    pub departments: String,
    /// Optional: sensemaker names are only used for display.
    #[serde(default)]
    pub sensemakers: Option<String>,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            survey: default_survey(),
            comments: default_comments(),
            tags: default_tags_table(),
            questions: default_questions(),
            insights: default_insights(),
            departments: default_departments(),
            sensemakers: None,
        }
    }
}

fn default_survey() -> String {
    "Survey Responses".to_string()
}
fn default_comments() -> String {
    "Comments".to_string()
}
fn default_tags_table() -> String {
    "Tags".to_string()
}
fn default_questions() -> String {
    "Questions".to_string()
}
fn default_insights() -> String {
    "Insight".to_string()
}
fn default_departments() -> String {
    "Departments".to_string()
}

/// Titles of the tags that carry sentiment and the star flag.
#[derive(Debug, Deserialize, Clone)]
pub struct TagsConfig {
    #[serde(default = "default_plus")]
    pub plus: String,
    #[serde(default = "default_delta")]
    pub delta: String,
    #[serde(default = "default_star")]
    pub star: String,
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            plus: default_plus(),
            delta: default_delta(),
            star: default_star(),
        }
    }
}

fn default_plus() -> String {
    "Plus".to_string()
}
fn default_delta() -> String {
    "Delta".to_string()
}
fn default_star() -> String {
    "Star".to_string()
}

impl TagsConfig {
    pub fn sentiment_keys(&self) -> SentimentKeys {
        SentimentKeys::from_titles(&self.plus, &self.delta, &self.star)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CitationsConfig {
    #[serde(default = "default_max_len")]
    pub max_len: usize,
}

impl Default for CitationsConfig {
    fn default() -> Self {
        Self {
            max_len: default_max_len(),
        }
    }
}

fn default_max_len() -> usize {
    sensemaker_core::citation::DEFAULT_MAX_LEN
}

#[derive(Debug, Deserialize, Clone)]
pub struct HeatmapConfig {
    #[serde(default = "default_excluded_questions")]
    pub excluded_questions: Vec<String>,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            excluded_questions: default_excluded_questions(),
        }
    }
}

fn default_excluded_questions() -> Vec<String> {
    vec!["open1".to_string(), "open2".to_string()]
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.citations.max_len == 0 {
        anyhow::bail!("citations.max_len must be > 0");
    }

    if config.store.timeout_secs == 0 {
        anyhow::bail!("store.timeout_secs must be > 0");
    }

    match config.store.kind.as_str() {
        "rest" => {
            if config
                .store
                .base_id
                .as_deref()
                .map_or(true, |s| s.trim().is_empty())
            {
                anyhow::bail!("store.base_id must be specified when kind is 'rest'");
            }
        }
        "file" => {
            if config.store.dir.is_none() {
                anyhow::bail!("store.dir must be specified when kind is 'file'");
            }
        }
        other => anyhow::bail!("Unknown store kind: '{}'. Must be rest or file.", other),
    }

    Ok(config)
}
