#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    #[error("settings validation failed: {0}")]
    Settings(String),
    #[error("job template {path} could not be read: {source}")]
    TemplateRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("job template {path} is not valid json: {source}")]
    TemplateParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("job template {path} is unusable: {reason}")]
    TemplateInvalid { path: String, reason: String },
}
