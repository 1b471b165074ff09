pub mod rebalancing;
pub mod settings;
pub mod task_status;
pub mod templates;
pub mod workload;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{error, warn};

use crate::config::EngineConfig;
use crate::error::{AppError, AppResult};
use crate::services::rebalancing_service::RebalancingService;
use crate::services::settings_service::SettingsService;
use crate::services::task_status_service::{OverdueSweepHandle, TaskStatusService};
use crate::store::ScheduleStore;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn ScheduleStore>,
    config: Arc<EngineConfig>,
    settings_service: Arc<SettingsService>,
    task_status_service: Arc<TaskStatusService>,
    rebalancing_service: Arc<RebalancingService>,
}

impl AppState {
    pub fn new(store: Arc<dyn ScheduleStore>, config: EngineConfig) -> AppResult<Self> {
        config.validate()?;
        let settings_service = Arc::new(SettingsService::new(Arc::clone(&store)));
        let task_status_service = Arc::new(TaskStatusService::new(Arc::clone(&store)));
        let rebalancing_service = Arc::new(RebalancingService::new(
            Arc::clone(&store),
            Arc::clone(&settings_service),
            &config,
        ));

        Ok(Self {
            store,
            config: Arc::new(config),
            settings_service,
            task_status_service,
            rebalancing_service,
        })
    }

    /// Start the periodic overdue sweep at the configured interval.
    pub fn start_background_jobs(&self) -> AppResult<OverdueSweepHandle> {
        self.task_status_service
            .start_overdue_sweep(self.config.overdue_sweep_interval())
    }

    pub fn store(&self) -> Arc<dyn ScheduleStore> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> Arc<EngineConfig> {
        Arc::clone(&self.config)
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn task_status(&self) -> Arc<TaskStatusService> {
        Arc::clone(&self.task_status_service)
    }

    pub fn rebalancing(&self) -> Arc<RebalancingService> {
        Arc::clone(&self.rebalancing_service)
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation { message, details } => {
                CommandError::new("VALIDATION_ERROR", message, details)
            }
            AppError::NotFound { entity, id } => CommandError::new(
                "NOT_FOUND",
                format!("{entity} not found"),
                Some(serde_json::json!({ "entity": entity, "id": id })),
            ),
            AppError::InvalidTransition { from, to } => CommandError::new(
                "INVALID_TRANSITION",
                format!("cannot move a task from {from} to {to}"),
                Some(serde_json::json!({ "from": from, "to": to })),
            ),
            AppError::StoreRejected { task_id, message } => {
                error!(target: "app::command", %task_id, %message, "store rejected write in command");
                CommandError::new(
                    "STORE_REJECTED",
                    message,
                    Some(serde_json::json!({ "taskId": task_id })),
                )
            }
            AppError::Config { message } => {
                warn!(target: "app::command", %message, "configuration error in command");
                CommandError::new("CONFIG_ERROR", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "serialization failed", None)
            }
            AppError::Yaml(error) => {
                error!(target: "app::command", error = %error, "yaml error in command");
                CommandError::new("CONFIG_ERROR", error.to_string(), None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "file system access failed", None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

/// Run synchronous engine work off the async runtime.
pub(crate) async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| CommandError::new("UNKNOWN", format!("command execution failed: {err}"), None))?
        .map_err(CommandError::from)
}
