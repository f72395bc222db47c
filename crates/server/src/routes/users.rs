use axum::{
    Extension, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    group::Group,
    task::{AssignedTask, DeadlineRange, Task},
    user::{User, UserRef},
};
use serde::{Deserialize, Serialize};
use services::services::auth::Caller;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError};

#[derive(Debug, Serialize, TS)]
pub struct UserProfile {
    #[serde(flatten)]
    #[ts(flatten)]
    pub user: User,
    pub group: Option<Group>,
    pub open_tasks: Vec<AssignedTask>,
}

#[derive(Debug, Deserialize, TS)]
pub struct DeadlineQuery {
    pub range: Option<DeadlineRange>,
}

pub async fn list_users(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<UserRef>>>, ApiError> {
    let users = User::find_all_refs(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(users)))
}

pub async fn profile(
    State(deployment): State<Deployment>,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<UserProfile>>, ApiError> {
    let pool = &deployment.db().pool;
    let user = User::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let group = match user.group_id {
        Some(group_id) => Group::find_by_id(pool, group_id).await?,
        None => None,
    };
    let open_tasks = Task::find_assigned_open(pool, user.id).await?;

    Ok(ResponseJson(ApiResponse::success(UserProfile {
        user,
        group,
        open_tasks,
    })))
}

pub async fn my_tasks(
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
) -> Result<ResponseJson<ApiResponse<Vec<AssignedTask>>>, ApiError> {
    let tasks = Task::find_assigned_open(&deployment.db().pool, caller.id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn my_deadlines(
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<DeadlineQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<AssignedTask>>>, ApiError> {
    let tasks = Task::upcoming_deadlines(
        &deployment.db().pool,
        caller.id,
        caller.is_admin,
        query.range.unwrap_or_default(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{user_id}/profile", get(profile))
        .route("/me/tasks", get(my_tasks))
        .route("/me/deadlines", get(my_deadlines))
}
