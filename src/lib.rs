pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::commands::AppState;
use crate::config::EngineConfig;
use crate::error::AppResult;
use crate::store::ScheduleStore;

/// Build the engine state over `store`. With a `log_dir` the global
/// subscriber is installed first.
pub fn bootstrap(
    store: Arc<dyn ScheduleStore>,
    config: EngineConfig,
    log_dir: Option<&Path>,
) -> AppResult<AppState> {
    if let Some(dir) = log_dir {
        crate::utils::logger::init_logging(dir, config.log_directives.as_deref())?;
    }
    let state = AppState::new(store, config)?;
    info!(target: "app::bootstrap", "planner engine ready");
    Ok(state)
}

/// Like [`bootstrap`], reading the engine config from a YAML file.
pub fn bootstrap_from_file(
    store: Arc<dyn ScheduleStore>,
    config_path: &Path,
    log_dir: Option<&Path>,
) -> AppResult<AppState> {
    let config = EngineConfig::load(config_path)?;
    bootstrap(store, config, log_dir)
}
