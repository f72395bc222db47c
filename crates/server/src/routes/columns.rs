use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, put},
};
use db::models::{board::Board, board_column::BoardColumn};
use db::types::PermissionKey;
use serde::Deserialize;
use services::services::{auth::Caller, permissions};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, middleware::load_column_middleware};

#[derive(Debug, Deserialize, TS)]
pub struct CreateColumnRequest {
    pub title: String,
    pub position: i32,
}

#[derive(Debug, Deserialize, TS)]
pub struct RenameColumnRequest {
    pub title: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateColumnsOrderRequest {
    pub column_ids: Vec<Uuid>,
}

async fn ensure_edit_board(
    deployment: &Deployment,
    caller: &Caller,
) -> Result<(), ApiError> {
    let allowed =
        permissions::has_permission(&deployment.db().pool, caller, PermissionKey::EditBoard)
            .await?;
    if allowed {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Permission denied".to_string()))
    }
}

/// New columns are appended: the client sends the current column count as
/// the position.
pub async fn create_column(
    Extension(board): Extension<Board>,
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateColumnRequest>,
) -> Result<ResponseJson<ApiResponse<BoardColumn>>, ApiError> {
    ensure_edit_board(&deployment, &caller).await?;
    let column = BoardColumn::create(
        &deployment.db().pool,
        board.id,
        payload.title,
        payload.position,
        Uuid::new_v4(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(column)))
}

/// Renumbers the board's columns to match the submitted sequence, as a
/// single transaction.
pub async fn update_columns_order(
    Extension(_board): Extension<Board>,
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<UpdateColumnsOrderRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_edit_board(&deployment, &caller).await?;
    BoardColumn::update_order(&deployment.db().pool, &payload.column_ids).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn rename_column(
    Extension(column): Extension<BoardColumn>,
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<RenameColumnRequest>,
) -> Result<ResponseJson<ApiResponse<BoardColumn>>, ApiError> {
    ensure_edit_board(&deployment, &caller).await?;
    let column = BoardColumn::rename(&deployment.db().pool, column.id, payload.title).await?;
    Ok(ResponseJson(ApiResponse::success(column)))
}

pub async fn delete_column(
    Extension(column): Extension<BoardColumn>,
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_edit_board(&deployment, &caller).await?;
    BoardColumn::delete(&deployment.db().pool, column.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let column_id_router = Router::new()
        .route("/", put(rename_column))
        .route("/", delete(delete_column))
        .route(
            "/tasks",
            axum::routing::post(crate::routes::tasks::create_task),
        )
        .layer(from_fn_with_state(
            deployment.clone(),
            load_column_middleware,
        ));

    Router::new().nest("/columns", Router::new().nest("/{column_id}", column_id_router))
}
