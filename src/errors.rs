// src/errors.rs
use thiserror::Error;

/// Service-level errors. Sandbox faults never end up here; they are
/// reported to the caller as an `ExecutionResult` instead.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value '{value}' for {key}")]
    InvalidSetting { key: String, value: String },

    #[error("Batch of {size} requests exceeds the limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, EvalError>;
