// src/config.rs
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{EvalError, Result};

const ENV_PREFIX: &str = "EXERCISE_RUNNER_";

/// Which evaluator runs the submitted code.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process JavaScript engine, one fresh context per call.
    #[default]
    Embedded,
    /// One disposable `node` process per call.
    Node,
}

impl FromStr for BackendKind {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embedded" => Ok(BackendKind::Embedded),
            "node" => Ok(BackendKind::Node),
            other => Err(EvalError::InvalidSetting {
                key: "backend".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Embedded => write!(f, "embedded"),
            BackendKind::Node => write!(f, "node"),
        }
    }
}

/// HTTP server settings.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a JSON request body, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_bytes: 256 * 1024,
        }
    }
}

/// Per-execution limits and backend selection.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SandboxConfig {
    pub backend: BackendKind,
    /// Wall-clock budget for one evaluation.
    pub timeout_ms: u64,
    /// Ceiling for the combined student + test source.
    pub max_source_bytes: usize,
    /// Maximum number of submissions accepted by the batch endpoint.
    pub max_batch: usize,
    /// Heap ceiling for the embedded engine.
    pub memory_limit_bytes: usize,
    /// Native stack ceiling for the embedded engine.
    pub stack_size_limit: usize,
    pub node_binary: String,
    /// Extra flags passed to `node` before the script.
    pub node_args: Vec<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Embedded,
            timeout_ms: 2_000,
            max_source_bytes: 64 * 1024,
            max_batch: 32,
            memory_limit_bytes: 64 * 1024 * 1024,
            stack_size_limit: 512 * 1024,
            node_binary: "node".to_string(),
            node_args: Vec::new(),
        }
    }
}

/// High-level application configuration: defaults, then an optional TOML
/// file, then environment overrides.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sandbox: SandboxConfig,
}

impl AppConfig {
    /// Load configuration from the config file (if any) and environment variables.
    pub fn load() -> Result<Self> {
        let mut config = match config_file_path() {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Applies `EXERCISE_RUNNER_*` overrides resolved through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            self.server.port = parse_setting("PORT", &port)?;
        }
        if let Some(backend) = get("BACKEND") {
            self.sandbox.backend = backend.parse()?;
        }
        if let Some(timeout) = get("TIMEOUT_MS") {
            self.sandbox.timeout_ms = parse_setting("TIMEOUT_MS", &timeout)?;
        }
        if let Some(max) = get("MAX_SOURCE_BYTES") {
            self.sandbox.max_source_bytes = parse_setting("MAX_SOURCE_BYTES", &max)?;
        }
        if let Some(max) = get("MAX_BATCH") {
            self.sandbox.max_batch = parse_setting("MAX_BATCH", &max)?;
        }
        if let Some(binary) = get("NODE_BINARY") {
            self.sandbox.node_binary = binary;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let sandbox = &self.sandbox;
        if sandbox.timeout_ms == 0 {
            return Err(EvalError::Config("timeout_ms must be greater than zero".to_string()));
        }
        if sandbox.max_source_bytes == 0 {
            return Err(EvalError::Config(
                "max_source_bytes must be greater than zero".to_string(),
            ));
        }
        if sandbox.max_batch == 0 {
            return Err(EvalError::Config("max_batch must be greater than zero".to_string()));
        }
        if sandbox.memory_limit_bytes == 0 || sandbox.stack_size_limit == 0 {
            return Err(EvalError::Config(
                "engine limits must be greater than zero".to_string(),
            ));
        }
        if sandbox.backend == BackendKind::Node && sandbox.node_binary.trim().is_empty() {
            return Err(EvalError::Config(
                "node_binary must be set when using the node backend".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_setting<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| EvalError::InvalidSetting {
        key: format!("{ENV_PREFIX}{key}"),
        value: value.to_string(),
    })
}

/// `EXERCISE_RUNNER_CONFIG` wins; otherwise the per-user config file is used if it exists.
fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(format!("{ENV_PREFIX}CONFIG")) {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|dir| dir.join("exercise-runner").join("config.toml"))
        .filter(|path| path.is_file())
}
