use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("schedule store rejected write for task {task_id}: {message}")]
    StoreRejected { task_id: String, message: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "validation error");
        AppError::Validation {
            message,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, details = %details, "validation error with details");
        AppError::Validation {
            message,
            details: Some(details),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        let id = id.into();
        warn!(target: "app::store", entity, %id, "resource not found");
        AppError::NotFound { entity, id }
    }

    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        let from = from.to_string();
        let to = to.to_string();
        warn!(target: "app::status", %from, %to, "invalid status transition");
        AppError::InvalidTransition { from, to }
    }

    pub fn store_rejected(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        let task_id = task_id.into();
        let message = message.into();
        error!(target: "app::store", %task_id, %message, "schedule store rejected write");
        AppError::StoreRejected { task_id, message }
    }

    pub fn config(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::config", %message, "configuration error");
        AppError::Config { message }
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::other", %message, "other error");
        AppError::Other(message)
    }

    /// Whether the engine can no longer vouch for schedule consistency.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::StoreRejected { .. } | AppError::Io(_) | AppError::Other(_)
        )
    }
}
