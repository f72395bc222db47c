use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get, post, put},
};
use chrono::{DateTime, Utc};
use db::models::{
    activity_log::ActivityEntry,
    board_column::BoardColumn,
    label::Label,
    task::{CreateTask, Task, TaskDetails},
    task_dependency::TaskDependency,
};
use db::types::PermissionKey;
use serde::Deserialize;
use services::services::{auth::Caller, permissions};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, middleware::load_task_middleware};

#[derive(Debug, Deserialize, TS)]
pub struct CreateTaskRequest {
    pub title: String,
    pub position: i32,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[ts(type = "Date | null")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clear_due_date: bool,
}

#[derive(Debug, Deserialize, TS)]
pub struct MoveTaskRequest {
    pub column_id: Uuid,
    pub position: i32,
}

#[derive(Debug, Deserialize, TS)]
pub struct ToggleCompletionRequest {
    pub is_completed: bool,
}

#[derive(Debug, Deserialize, TS)]
pub struct AssignTaskRequest {
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, TS)]
pub struct ToggleLabelRequest {
    pub attach: bool,
}

#[derive(Debug, Deserialize, TS)]
pub struct AddDependencyRequest {
    pub blocking_task_id: Uuid,
}

async fn ensure_permission(
    deployment: &Deployment,
    caller: &Caller,
    key: PermissionKey,
) -> Result<(), ApiError> {
    let allowed =
        permissions::has_permission(&deployment.db().pool, caller, key).await?;
    if allowed {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Permission denied".to_string()))
    }
}

/// Mounted under /columns/{column_id}/tasks; new tasks append at the
/// position the client computed from the column's current length.
pub async fn create_task(
    Extension(column): Extension<BoardColumn>,
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    ensure_permission(&deployment, &caller, PermissionKey::CreateTask).await?;
    let pool = &deployment.db().pool;

    let task = Task::create(
        pool,
        &CreateTask {
            column_id: column.id,
            title: payload.title.clone(),
            position: payload.position,
        },
        Uuid::new_v4(),
    )
    .await?;

    if let Err(err) = ActivityEntry::record(
        pool,
        &format!("created task \"{}\"", payload.title),
        Some(task.id),
        Some(caller.id),
    )
    .await
    {
        tracing::warn!(error = %err, "Failed to record task creation activity");
    }

    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn get_task(
    Extension(task): Extension<Task>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<TaskDetails>>, ApiError> {
    let details = Task::details(&deployment.db().pool, task.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(details)))
}

pub async fn update_task(
    Extension(existing_task): Extension<Task>,
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    ensure_permission(&deployment, &caller, PermissionKey::EditTask).await?;

    // Use existing values if not provided in update
    let title = payload.title.unwrap_or(existing_task.title);
    let description = match payload.description {
        Some(s) if s.trim().is_empty() => None, // Empty string = clear description
        Some(s) => Some(s),                     // Non-empty string = update description
        None => existing_task.description,      // Field omitted = keep existing
    };
    let due_date = if payload.clear_due_date {
        None
    } else {
        payload.due_date.or(existing_task.due_date)
    };

    let task = Task::update(
        &deployment.db().pool,
        existing_task.id,
        title,
        description,
        due_date,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task(
    Extension(task): Extension<Task>,
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_permission(&deployment, &caller, PermissionKey::DeleteTask).await?;
    Task::delete(&deployment.db().pool, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// The drag-and-drop move: one write touching only the moved task's column
/// and position.
pub async fn move_task(
    Extension(task): Extension<Task>,
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<MoveTaskRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_permission(&deployment, &caller, PermissionKey::EditTask).await?;
    Task::move_to_column(
        &deployment.db().pool,
        task.id,
        payload.column_id,
        payload.position,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Completing a task is gated here, at the mutation boundary: open blockers
/// refuse the transition. Reopening is always allowed.
pub async fn toggle_completion(
    Extension(task): Extension<Task>,
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<ToggleCompletionRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_permission(&deployment, &caller, PermissionKey::EditTask).await?;
    let pool = &deployment.db().pool;

    if payload.is_completed {
        let open_blockers = TaskDependency::blocked_by_count(pool, task.id).await?;
        if open_blockers > 0 {
            return Err(ApiError::Conflict("Resolve dependencies first".to_string()));
        }
    }

    Task::set_completed(pool, task.id, payload.is_completed).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn assign_task(
    Extension(task): Extension<Task>,
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<AssignTaskRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_permission(&deployment, &caller, PermissionKey::EditTask).await?;
    let pool = &deployment.db().pool;

    Task::assign(pool, task.id, payload.assignee_id).await?;

    let action = if payload.assignee_id.is_some() {
        "assigned a user to task"
    } else {
        "unassigned user from task"
    };
    if let Err(err) = ActivityEntry::record(pool, action, Some(task.id), Some(caller.id)).await {
        tracing::warn!(error = %err, "Failed to record assignment activity");
    }

    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn toggle_label(
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Path((task_id, label_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ToggleLabelRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_permission(&deployment, &caller, PermissionKey::EditTask).await?;
    Label::set_on_task(&deployment.db().pool, task_id, label_id, payload.attach).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn add_dependency(
    Extension(task): Extension<Task>,
    State(deployment): State<Deployment>,
    Json(payload): Json<AddDependencyRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    TaskDependency::add(&deployment.db().pool, task.id, payload.blocking_task_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn remove_dependency(
    State(deployment): State<Deployment>,
    Path((task_id, blocking_task_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    TaskDependency::remove(&deployment.db().pool, task_id, blocking_task_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let task_id_router = Router::new()
        .route("/", get(get_task))
        .route("/", put(update_task))
        .route("/", delete(delete_task))
        .route("/column", put(move_task))
        .route("/completion", put(toggle_completion))
        .route("/assignee", put(assign_task))
        .route("/dependencies", post(add_dependency))
        .route(
            "/subtasks",
            post(crate::routes::subtasks::create_subtask),
        )
        .layer(from_fn_with_state(deployment.clone(), load_task_middleware));

    // Two-parameter routes resolve their ids in the handler instead of the
    // single-id loader middleware.
    let task_id_multi_router = Router::new()
        .route("/labels/{label_id}", put(toggle_label))
        .route(
            "/dependencies/{blocking_task_id}",
            delete(remove_dependency),
        );

    Router::new().nest(
        "/tasks",
        Router::new().nest("/{task_id}", task_id_router.merge(task_id_multi_router)),
    )
}
