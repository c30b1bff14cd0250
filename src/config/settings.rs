use super::ConfigError;
use crate::orchestration::polling::PollPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:8188";
pub const DEFAULT_RUNS_DIR: &str = "adgen/runs";
pub const DEFAULT_GRAPH_PATH: &str = "adgen/graphs/default.json";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_POLL_DEADLINE_SECS: u64 = 600;
pub const DEFAULT_RETENTION_HOURS: u64 = 24;

pub const ENV_ENGINE_URL: &str = "ADGEN_ENGINE_URL";
pub const ENV_ENGINE_URL_LEGACY: &str = "COMFY_API";
pub const ENV_RUNS_DIR: &str = "RUNS_DIR";
pub const ENV_GRAPH_PATH: &str = "GRAPH_PATH";
pub const ENV_POLL_INTERVAL_SECS: &str = "POLL_INTERVAL_SECS";
pub const ENV_POLL_DEADLINE_SECS: &str = "POLL_DEADLINE_SECS";
pub const ENV_RETENTION_HOURS: &str = "RUN_RETENTION_HOURS";
pub const ENV_ENGINE_MODE: &str = "COMFY_MODE";
pub const ENV_LOG_FILTER: &str = "ADGEN_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    #[default]
    #[serde(alias = "production")]
    Api,
    Test,
}

impl EngineMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Test => "test",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "api" | "production" => Ok(Self::Api),
            "test" => Ok(Self::Test),
            _ => Err("engine mode must be one of: api, test".to_string()),
        }
    }
}

impl std::fmt::Display for EngineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Process configuration. Built once at startup and handed to every
/// component by reference.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub engine_url: String,
    pub runs_dir: PathBuf,
    pub graph_path: PathBuf,
    pub poll_interval_secs: u64,
    pub poll_deadline_secs: u64,
    pub retention_hours: u64,
    pub engine_mode: EngineMode,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine_url: DEFAULT_ENGINE_URL.to_string(),
            runs_dir: PathBuf::from(DEFAULT_RUNS_DIR),
            graph_path: PathBuf::from(DEFAULT_GRAPH_PATH),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            poll_deadline_secs: DEFAULT_POLL_DEADLINE_SECS,
            retention_hours: DEFAULT_RETENTION_HOURS,
            engine_mode: EngineMode::Api,
            log_filter: crate::shared::logging::DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut settings: Settings =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        settings.engine_url = normalize_engine_url(&settings.engine_url);
        Ok(settings)
    }

    /// Builds settings from environment-style keys resolved through `lookup`.
    /// Missing or blank keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut settings = Settings::default();
        if let Some(url) = get(ENV_ENGINE_URL).or_else(|| get(ENV_ENGINE_URL_LEGACY)) {
            settings.engine_url = normalize_engine_url(&url);
        }
        if let Some(dir) = get(ENV_RUNS_DIR) {
            settings.runs_dir = PathBuf::from(dir);
        }
        if let Some(path) = get(ENV_GRAPH_PATH) {
            settings.graph_path = PathBuf::from(path);
        }
        if let Some(raw) = get(ENV_POLL_INTERVAL_SECS) {
            settings.poll_interval_secs = parse_u64(ENV_POLL_INTERVAL_SECS, &raw)?;
        }
        if let Some(raw) = get(ENV_POLL_DEADLINE_SECS) {
            settings.poll_deadline_secs = parse_u64(ENV_POLL_DEADLINE_SECS, &raw)?;
        }
        if let Some(raw) = get(ENV_RETENTION_HOURS) {
            settings.retention_hours = parse_u64(ENV_RETENTION_HOURS, &raw)?;
        }
        if let Some(raw) = get(ENV_ENGINE_MODE) {
            settings.engine_mode =
                EngineMode::parse(&raw).map_err(|reason| ConfigError::InvalidValue {
                    key: ENV_ENGINE_MODE.to_string(),
                    value: raw.clone(),
                    reason,
                })?;
        }
        if let Some(filter) = get(ENV_LOG_FILTER) {
            settings.log_filter = filter;
        }
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.engine_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Settings("engine_url must be non-empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Settings(format!(
                "engine_url `{url}` must start with http:// or https://"
            )));
        }
        if self.runs_dir.as_os_str().is_empty() {
            return Err(ConfigError::Settings("runs_dir must be non-empty".to_string()));
        }
        if self.graph_path.as_os_str().is_empty() {
            return Err(ConfigError::Settings("graph_path must be non-empty".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Settings(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.poll_deadline_secs < self.poll_interval_secs {
            return Err(ConfigError::Settings(format!(
                "poll_deadline_secs ({}) must be at least poll_interval_secs ({})",
                self.poll_deadline_secs, self.poll_interval_secs
            )));
        }
        Ok(())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            deadline: Duration::from_secs(self.poll_deadline_secs),
        }
    }

    pub fn retention_window(&self) -> Duration {
        Duration::from_secs(self.retention_hours.saturating_mul(3600))
    }

    pub fn banner_lines(&self) -> Vec<String> {
        vec![
            format!("runs_dir={}", self.runs_dir.display()),
            format!(
                "graph_path={}{}",
                self.graph_path.display(),
                if self.graph_path.exists() { "" } else { " (missing)" }
            ),
            format!("engine_url={}", self.engine_url),
            format!("engine_mode={}", self.engine_mode),
            format!(
                "poll_interval_secs={} poll_deadline_secs={}",
                self.poll_interval_secs, self.poll_deadline_secs
            ),
            format!("retention_hours={}", self.retention_hours),
        ]
    }
}

fn normalize_engine_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse::<u64>()
        .map_err(|err| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason: err.to_string(),
        })
}
