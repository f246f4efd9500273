use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    dto::ws::ErrorReason,
    state::connection::InvalidTransition,
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No active board uses the submitted pin.
    #[error("invalid pin `{0}`")]
    InvalidPin(String),
    /// Another member of the board already uses this display name.
    #[error("display name `{0}` is already taken on this board")]
    NameTaken(String),
    /// Display name rejected by the naming policy.
    #[error("invalid display name: {0}")]
    InvalidName(String),
    /// Board identifier does not match any stored board.
    #[error("board `{0}` not found")]
    BoardNotFound(Uuid),
    /// Player is not listed in the board's member list.
    #[error("player `{player_id}` is not a member of board `{board_id}`")]
    PlayerNotInBoard { board_id: Uuid, player_id: Uuid },
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Request not allowed in the connection's current phase.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Write rejected because it collides with existing data.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl ServiceError {
    /// Whether the coordinator may immediately retry the operation.
    ///
    /// Only backend failures qualify; degraded mode means no store is installed at all and
    /// domain errors describe a state the caller has to resolve.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Unavailable(_))
    }

    /// Reason code reported to WebSocket clients.
    pub fn reason(&self) -> ErrorReason {
        match self {
            ServiceError::InvalidPin(_) => ErrorReason::InvalidPin,
            ServiceError::NameTaken(_) => ErrorReason::NameTaken,
            ServiceError::InvalidName(_) | ServiceError::InvalidInput(_) => {
                ErrorReason::InvalidName
            }
            ServiceError::BoardNotFound(_) => ErrorReason::BoardNotFound,
            ServiceError::PlayerNotInBoard { .. } => ErrorReason::PlayerNotInBoard,
            ServiceError::Unavailable(_) | ServiceError::Degraded => {
                ErrorReason::StoreUnavailable
            }
            ServiceError::InvalidState(_)
            | ServiceError::Unauthorized(_)
            | ServiceError::NotFound(_)
            | ServiceError::Conflict(_) => ErrorReason::InvalidState,
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { message } => ServiceError::Conflict(message),
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidPin(_)
            | ServiceError::BoardNotFound(_)
            | ServiceError::PlayerNotInBoard { .. }
            | ServiceError::NotFound(_) => AppError::NotFound(err.to_string()),
            ServiceError::NameTaken(_)
            | ServiceError::InvalidState(_)
            | ServiceError::Conflict(_) => AppError::Conflict(err.to_string()),
            ServiceError::InvalidName(_) | ServiceError::InvalidInput(_) => {
                AppError::BadRequest(err.to_string())
            }
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
