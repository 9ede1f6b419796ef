use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// What a learner sees when a lesson has no content yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LessonContentMode {
    /// Show a "being prepared" notice and leave storage untouched.
    Placeholder,
    /// Generate the content inside the request.
    OnDemand,
}

impl LessonContentMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "placeholder" => Some(Self::Placeholder),
            "on_demand" | "on-demand" | "ondemand" => Some(Self::OnDemand),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub outline_model: String,
    pub lesson_model: String,
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            outline_model: "gemini-1.5-pro-latest".to_string(),
            lesson_model: "gemini-1.5-flash-latest".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub generation: GenerationConfig,
    pub lesson_content_mode: LessonContentMode,
    pub background_generation: bool,
    pub generation_workers: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://tutor.db?mode=rwc".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            generation: GenerationConfig::default(),
            lesson_content_mode: LessonContentMode::Placeholder,
            background_generation: true,
            generation_workers: 2,
        }
    }
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any key lookup, falling back to defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr.parse().map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDR",
                value: addr.clone(),
            })?;
        }

        config.generation.api_key = lookup("GEMINI_API_KEY").filter(|key| !key.trim().is_empty());
        if let Some(base_url) = lookup("GEMINI_BASE_URL") {
            config.generation.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("OUTLINE_MODEL") {
            config.generation.outline_model = model;
        }
        if let Some(model) = lookup("LESSON_MODEL") {
            config.generation.lesson_model = model;
        }
        if let Some(secs) = lookup("GENERATION_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| ConfigError::Invalid {
                name: "GENERATION_TIMEOUT_SECS",
                value: secs.clone(),
            })?;
            config.generation.timeout = Duration::from_secs(secs);
        }

        if let Some(mode) = lookup("LESSON_CONTENT_MODE") {
            config.lesson_content_mode =
                LessonContentMode::parse(&mode).ok_or(ConfigError::Invalid {
                    name: "LESSON_CONTENT_MODE",
                    value: mode.clone(),
                })?;
        }
        if let Some(flag) = lookup("BACKGROUND_GENERATION") {
            config.background_generation = parse_bool(&flag).ok_or(ConfigError::Invalid {
                name: "BACKGROUND_GENERATION",
                value: flag.clone(),
            })?;
        }
        if let Some(workers) = lookup("GENERATION_WORKERS") {
            config.generation_workers = workers
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid {
                    name: "GENERATION_WORKERS",
                    value: workers.clone(),
                })?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
