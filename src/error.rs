use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Service-level faults: startup, configuration, storage.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Unauthorized => 401,
            AppError::Config(_) | AppError::StartServer(_) | AppError::Database(_) => 500,
            AppError::Internal => 500,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Per-command chat errors, delivered as `error` events to the originating
/// connection only. Never broadcast to the room.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("authentication failed")]
    Authentication,

    #[error("stream is not live")]
    NotFound,

    #[error("not allowed")]
    Authorization,

    #[error("you are banned from this stream")]
    Banned,

    #[error("rate limited, retry in {remaining_seconds}s")]
    RateLimited { remaining_seconds: i64 },

    #[error("{0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Stable wire code carried in `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Authentication => "authentication_error",
            ChatError::NotFound => "not_found",
            ChatError::Authorization => "authorization_error",
            ChatError::Banned => "banned",
            ChatError::RateLimited { .. } => "rate_limited",
            ChatError::Validation(_) => "validation_error",
            ChatError::Internal(_) => "internal_error",
        }
    }

    pub fn retry_after_seconds(&self) -> Option<i64> {
        match self {
            ChatError::RateLimited { remaining_seconds } => Some(*remaining_seconds),
            _ => None,
        }
    }
}
