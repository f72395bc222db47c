use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, put},
};
use db::models::{subtask::Subtask, task::Task};
use db::types::PermissionKey;
use serde::Deserialize;
use services::services::{auth::Caller, permissions};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, middleware::load_subtask_middleware};

#[derive(Debug, Deserialize, TS)]
pub struct CreateSubtaskRequest {
    pub title: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct ToggleSubtaskRequest {
    pub is_completed: bool,
}

/// Mounted under /tasks/{task_id}/subtasks.
pub async fn create_subtask(
    Extension(task): Extension<Task>,
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateSubtaskRequest>,
) -> Result<ResponseJson<ApiResponse<Subtask>>, ApiError> {
    let pool = &deployment.db().pool;
    if !permissions::has_permission(pool, &caller, PermissionKey::EditTask).await? {
        return Err(ApiError::Forbidden("Permission denied".to_string()));
    }
    let subtask = Subtask::create(pool, task.id, payload.title, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(subtask)))
}

/// The checkbox toggle converts persistence failures into the error
/// envelope instead of a 500; the checklist UI shows them inline.
pub async fn toggle_subtask(
    Extension(subtask): Extension<Subtask>,
    State(deployment): State<Deployment>,
    Json(payload): Json<ToggleSubtaskRequest>,
) -> ResponseJson<ApiResponse<()>> {
    match Subtask::set_completed(&deployment.db().pool, subtask.id, payload.is_completed).await
    {
        Ok(()) => ResponseJson(ApiResponse::success(())),
        Err(err) => ResponseJson(ApiResponse::error(&err.to_string())),
    }
}

pub async fn delete_subtask(
    Extension(subtask): Extension<Subtask>,
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let pool = &deployment.db().pool;
    if !permissions::has_permission(pool, &caller, PermissionKey::EditTask).await? {
        return Err(ApiError::Forbidden("Permission denied".to_string()));
    }
    Subtask::delete(pool, subtask.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let subtask_id_router = Router::new()
        .route("/", put(toggle_subtask))
        .route("/", delete(delete_subtask))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_subtask_middleware,
        ));

    Router::new().nest(
        "/subtasks",
        Router::new().nest("/{subtask_id}", subtask_id_router),
    )
}
