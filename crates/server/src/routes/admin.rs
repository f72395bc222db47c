use axum::{
    Extension, Json, Router,
    extract::{Path, Request, State},
    middleware::{Next, from_fn},
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::{delete, get, post, put},
};
use db::models::{
    group::{CreateGroup, Group, UpdateGroup},
    maintenance,
    system_setting::SystemSetting,
    user::{CreateUser, User},
};
use serde::Deserialize;
use services::services::auth::Caller;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateSettingRequest {
    pub key: String,
    pub value: String,
}

/// Admin routes sit behind the session layer already; this guard turns a
/// non-admin caller into the same error the gated UI would have prevented.
async fn require_admin(req: Request, next: Next) -> Response {
    let is_admin = req
        .extensions()
        .get::<Caller>()
        .map(|caller| caller.is_admin)
        .unwrap_or(false);
    if !is_admin {
        let response = ApiResponse::<()>::error("Unauthorized");
        return (axum::http::StatusCode::FORBIDDEN, Json(response)).into_response();
    }
    next.run(req).await
}

pub async fn list_users(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<User>>>, ApiError> {
    let users = User::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(users)))
}

pub async fn create_user(
    State(deployment): State<Deployment>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest("Missing fields".to_string()));
    }

    let password_hash = deployment.auth().hash_password(&payload.password)?;
    let user = User::create(
        &deployment.db().pool,
        &CreateUser {
            username: payload.username.trim().to_string(),
            password_hash,
            is_admin: payload.is_admin,
            group_id: payload.group_id,
        },
        Uuid::new_v4(),
    )
    .await?;

    tracing::info!(user = %user.username, is_admin = user.is_admin, "User created");
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn delete_user(
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if caller.id == user_id {
        return Err(ApiError::BadRequest("Cannot delete yourself".to_string()));
    }
    User::delete(&deployment.db().pool, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn list_groups(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<Group>>>, ApiError> {
    let groups = Group::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(groups)))
}

pub async fn create_group(
    State(deployment): State<Deployment>,
    Json(payload): Json<CreateGroup>,
) -> Result<ResponseJson<ApiResponse<Group>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing name".to_string()));
    }
    let group = Group::create(&deployment.db().pool, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(group)))
}

pub async fn update_group(
    State(deployment): State<Deployment>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<UpdateGroup>,
) -> Result<ResponseJson<ApiResponse<Group>>, ApiError> {
    let group = Group::update(&deployment.db().pool, group_id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(group)))
}

/// Members of the group survive with their group assignment cleared.
pub async fn delete_group(
    State(deployment): State<Deployment>,
    Path(group_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    Group::delete(&deployment.db().pool, group_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn get_settings(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<(String, String)>>>, ApiError> {
    let settings = SystemSetting::all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(settings)))
}

pub async fn update_setting(
    State(deployment): State<Deployment>,
    Json(payload): Json<UpdateSettingRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    SystemSetting::set(&deployment.db().pool, &payload.key, &payload.value).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Full wipe back to first-run state; the client navigates to setup.
pub async fn reset_database(
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    tracing::warn!(by = %caller.username, "Database reset requested");
    maintenance::reset_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<Deployment> {
    Router::new().nest(
        "/admin",
        Router::new()
            .route("/users", get(list_users).post(create_user))
            .route("/users/{user_id}", delete(delete_user))
            .route("/groups", get(list_groups).post(create_group))
            .route("/groups/{group_id}", put(update_group).delete(delete_group))
            .route("/settings", get(get_settings).put(update_setting))
            .route("/reset", post(reset_database))
            .layer(from_fn(require_admin)),
    )
}
