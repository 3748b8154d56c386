// src/api/state.rs
use crate::config::AppConfig;
use crate::evaluator::Backend;
use crate::sandbox::ExecutionLimits;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: Arc<Backend>,
    pub limits: ExecutionLimits,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let backend = Backend::from_config(&config.sandbox);
        let limits = ExecutionLimits::from_config(&config.sandbox);
        Self {
            config: Arc::new(config),
            backend: Arc::new(backend),
            limits,
        }
    }
}
