use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;
use crate::core::{NarrativePolicy, PipelineOptions};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub openai: OpenAiSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Without a URL the service runs on the in-memory store
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_openai_base_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_openai_model() -> String { "gpt-4o".to_string() }
fn default_timeout_secs() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_algorithm_key")]
    pub algorithm_key: String,
    #[serde(default)]
    pub narrative_policy: NarrativePolicy,
    #[serde(default)]
    pub serialize_arrivals: bool,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            algorithm_key: default_algorithm_key(),
            narrative_policy: NarrativePolicy::default(),
            serialize_arrivals: false,
        }
    }
}

fn default_algorithm_key() -> String { crate::models::SOFT_CRITERIA_V1.to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml, then config/local.toml)
    /// 3. Environment variables (prefixed with FRUITMATCH__)
    /// 4. `DATABASE_URL` and `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., FRUITMATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("FRUITMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        apply_well_known_env(settings)?.try_deserialize()
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            algorithm_key: self.matching.algorithm_key.clone(),
            narrative_policy: self.matching.narrative_policy,
            serialize_arrivals: self.matching.serialize_arrivals,
            generation_timeout: Duration::from_secs(self.openai.timeout_secs),
        }
    }
}

/// Honour the conventional unprefixed variables on top of everything else
fn apply_well_known_env(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("DATABASE_URL") {
        if !url.trim().is_empty() {
            builder = builder.set_override("database.url", url)?;
        }
    }
    if let Ok(key) = env::var("OPENAI_API_KEY") {
        if !key.trim().is_empty() {
            builder = builder.set_override("openai.api_key", key)?;
        }
    }

    builder.build()
}
