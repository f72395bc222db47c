use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{
        board::BoardError, board_column::ColumnError, group::GroupError,
        subtask::SubtaskError, task::TaskError, task_dependency::DependencyError,
        user::UserError,
    },
};
use services::services::{auth::AuthError, config::ConfigError};
use thiserror::Error;
use utils::response::ApiResponse;

use crate::deployment::DeploymentError;

#[derive(Debug, Error, ts_rs::TS)]
#[ts(type = "string")]
pub enum ApiError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Column(#[from] ColumnError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Subtask(#[from] SubtaskError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Dependency(#[from] DependencyError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl From<&'static str> for ApiError {
    fn from(msg: &'static str) -> Self {
        ApiError::BadRequest(msg.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Board(err) => match err {
                BoardError::BoardNotFound => (StatusCode::NOT_FOUND, "BoardError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "BoardError"),
            },
            ApiError::Column(err) => match err {
                ColumnError::ColumnNotFound => (StatusCode::NOT_FOUND, "ColumnError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ColumnError"),
            },
            ApiError::Task(err) => match err {
                TaskError::TaskNotFound | TaskError::ColumnNotFound => {
                    (StatusCode::NOT_FOUND, "TaskError")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "TaskError"),
            },
            ApiError::Subtask(err) => match err {
                SubtaskError::SubtaskNotFound => (StatusCode::NOT_FOUND, "SubtaskError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "SubtaskError"),
            },
            ApiError::Group(err) => match err {
                GroupError::GroupNotFound => (StatusCode::NOT_FOUND, "GroupError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "GroupError"),
            },
            ApiError::User(err) => match err {
                UserError::UserNotFound => (StatusCode::NOT_FOUND, "UserError"),
                UserError::UsernameTaken => (StatusCode::CONFLICT, "UserError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "UserError"),
            },
            ApiError::Dependency(err) => match err {
                DependencyError::SelfDependency | DependencyError::Cycle => {
                    (StatusCode::BAD_REQUEST, "DependencyError")
                }
                DependencyError::TaskNotFound => (StatusCode::NOT_FOUND, "DependencyError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DependencyError"),
            },
            ApiError::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::InvalidSession => {
                    (StatusCode::UNAUTHORIZED, "AuthError")
                }
                AuthError::SetupAlreadyCompleted => (StatusCode::CONFLICT, "AuthError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "AuthError"),
            },
            ApiError::Config(err) => match err {
                ConfigError::ValidationError(_) => (StatusCode::BAD_REQUEST, "ConfigError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ConfigError"),
            },
            ApiError::Deployment(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DeploymentError"),
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IoError"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "ConflictError"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "ForbiddenError"),
        };

        let error_message = match &self {
            ApiError::Board(err) => err.to_string(),
            ApiError::Column(err) => err.to_string(),
            ApiError::Task(err) => err.to_string(),
            ApiError::Subtask(err) => err.to_string(),
            ApiError::Group(err) => err.to_string(),
            ApiError::User(err) => err.to_string(),
            ApiError::Dependency(err) => err.to_string(),
            ApiError::Auth(err) => match err {
                AuthError::InvalidSession => "Unauthorized. Please sign in again.".to_string(),
                _ => err.to_string(),
            },
            ApiError::Unauthorized => "Unauthorized".to_string(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Internal(msg) => msg.clone(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Conflict(msg) => msg.clone(),
            ApiError::Forbidden(msg) => msg.clone(),
            _ => format!("{}: {}", error_type, self),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_maps_to_expected_http_statuses() {
        assert_eq!(
            ApiError::BadRequest("bad".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("nope".to_string())
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("missing".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("conflict".to_string())
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn domain_errors_map_to_expected_http_statuses() {
        assert_eq!(
            ApiError::from(BoardError::BoardNotFound)
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DependencyError::Cycle).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DependencyError::SelfDependency)
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidCredentials)
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(UserError::UsernameTaken)
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
    }
}
