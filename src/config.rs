use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{SortMode, DEFAULT_BASE_URL};
use crate::controller::DEFAULT_SORT_REFETCH_DELAY;

const DEFAULT_ENV_PREFIX: &str = "BLOG_READER";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("blog-reader/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentsConfig {
    #[serde(default = "default_sort_refetch_delay", with = "humantime_serde")]
    pub sort_refetch_delay: Duration,
    #[serde(default)]
    pub default_sort: SortMode,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            sort_refetch_delay: default_sort_refetch_delay(),
            default_sort: SortMode::default(),
        }
    }
}

fn default_sort_refetch_delay() -> Duration {
    DEFAULT_SORT_REFETCH_DELAY
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.api.base_url.is_empty() {
        base.api.base_url = other.api.base_url;
    }
    if !other.api.user_agent.is_empty() {
        base.api.user_agent = other.api.user_agent;
    }
    if !other.api.timeout.is_zero() {
        base.api.timeout = other.api.timeout;
    }

    base.comments.sort_refetch_delay = other.comments.sort_refetch_delay;
    base.comments.default_sort = other.comments.default_sort;

    if other.storage.path.is_some() {
        base.storage.path = other.storage.path;
    }

    base
}

// Keys use `__` between section and field, e.g. `BLOG_READER_API__BASE_URL`.
fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "api.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.api.timeout = duration;
            }
        }
        "comments.sort_refetch_delay" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.comments.sort_refetch_delay = duration;
            }
        }
        "comments.default_sort" => match value.trim().to_ascii_lowercase().as_str() {
            "hot" => cfg.comments.default_sort = SortMode::Hot,
            "recent" => cfg.comments.default_sort = SortMode::Recent,
            _ => {}
        },
        "storage.path" => cfg.storage.path = Some(PathBuf::from(value)),
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("blog-reader").join("config.yaml"))
}
