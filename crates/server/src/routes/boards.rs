use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get, post, put},
};
use db::TransactionTrait;
use db::models::{
    board::{Board, BoardSummary, CreateBoard},
    board_column::BoardColumn,
    label::{CreateLabel, Label},
    task::{Task, TaskCard, TaskRef},
    user::{User, UserRef},
};
use serde::{Deserialize, Serialize};
use services::services::{auth::Caller, permissions};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    Deployment, error::ApiError, middleware::load_board_middleware, routes::columns,
};

/// Full board payload for the drag-and-drop surface: labels plus ordered
/// columns, each carrying its ordered task cards.
#[derive(Debug, Serialize, TS)]
pub struct BoardData {
    #[serde(flatten)]
    #[ts(flatten)]
    pub board: Board,
    pub labels: Vec<Label>,
    pub columns: Vec<ColumnData>,
}

#[derive(Debug, Serialize, TS)]
pub struct ColumnData {
    #[serde(flatten)]
    #[ts(flatten)]
    pub column: BoardColumn,
    pub tasks: Vec<TaskCard>,
}

#[derive(Debug, Deserialize, TS)]
pub struct UpdateMembersRequest {
    pub member_ids: Vec<Uuid>,
}

pub async fn list_boards(
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
) -> Result<ResponseJson<ApiResponse<Vec<BoardSummary>>>, ApiError> {
    let boards =
        Board::find_visible_to(&deployment.db().pool, caller.id, caller.is_admin).await?;
    Ok(ResponseJson(ApiResponse::success(boards)))
}

pub async fn create_board(
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateBoard>,
) -> Result<ResponseJson<ApiResponse<Board>>, ApiError> {
    let pool = &deployment.db().pool;
    if !permissions::has_permission(pool, &caller, db::types::PermissionKey::CreateBoard).await? {
        return Err(ApiError::Forbidden(
            "You do not have permission to create boards.".to_string(),
        ));
    }
    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }

    let tx = pool.begin().await?;
    let board = Board::create(&tx, &payload, Uuid::new_v4(), caller.id).await?;
    tx.commit().await?;

    tracing::info!(board = %board.id, owner = %caller.username, "Board created");
    Ok(ResponseJson(ApiResponse::success(board)))
}

pub async fn get_board(
    Extension(board): Extension<Board>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<BoardData>>, ApiError> {
    let pool = &deployment.db().pool;
    let labels = Label::find_by_board(pool, board.id).await?;
    let columns = BoardColumn::find_by_board(pool, board.id).await?;

    let mut column_data = Vec::with_capacity(columns.len());
    for column in columns {
        let tasks = Task::find_cards_by_column(pool, column.id).await?;
        column_data.push(ColumnData { column, tasks });
    }

    Ok(ResponseJson(ApiResponse::success(BoardData {
        board,
        labels,
        columns: column_data,
    })))
}

pub async fn delete_board(
    Extension(board): Extension<Board>,
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if !permissions::can_delete_board(&caller, &board) {
        return Err(ApiError::Forbidden(
            "You do not have permission to delete this board.".to_string(),
        ));
    }

    Board::delete(&deployment.db().pool, board.id).await?;
    tracing::info!(board = %board.id, by = %caller.username, "Board deleted");
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn update_members(
    Extension(board): Extension<Board>,
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<UpdateMembersRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if !caller.is_admin {
        return Err(ApiError::Forbidden("Unauthorized".to_string()));
    }
    Board::set_members(&deployment.db().pool, board.id, &payload.member_ids).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn eligible_users(
    Extension(board): Extension<Board>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<UserRef>>>, ApiError> {
    let users = User::find_eligible_for_board(&deployment.db().pool, board.id).await?;
    Ok(ResponseJson(ApiResponse::success(users)))
}

pub async fn board_task_refs(
    Extension(board): Extension<Board>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<TaskRef>>>, ApiError> {
    let refs = Task::find_refs_by_board(&deployment.db().pool, board.id).await?;
    Ok(ResponseJson(ApiResponse::success(refs)))
}

pub async fn create_label(
    Extension(board): Extension<Board>,
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateLabel>,
) -> Result<ResponseJson<ApiResponse<Label>>, ApiError> {
    let pool = &deployment.db().pool;
    if !permissions::has_permission(pool, &caller, db::types::PermissionKey::EditBoard).await? {
        return Err(ApiError::Forbidden("Permission denied".to_string()));
    }
    let label = Label::create(pool, board.id, &payload, Uuid::new_v4()).await?;
    Ok(ResponseJson(ApiResponse::success(label)))
}

pub async fn delete_label(
    State(deployment): State<Deployment>,
    Extension(caller): Extension<Caller>,
    Path(label_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let pool = &deployment.db().pool;
    if !permissions::has_permission(pool, &caller, db::types::PermissionKey::EditBoard).await? {
        return Err(ApiError::Forbidden("Permission denied".to_string()));
    }
    Label::delete(pool, label_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let board_id_router = Router::new()
        .route("/", get(get_board))
        .route("/", delete(delete_board))
        .route("/members", put(update_members))
        .route("/eligible-users", get(eligible_users))
        .route("/tasks", get(board_task_refs))
        .route("/labels", post(create_label))
        .route("/columns", post(columns::create_column))
        .route("/columns/order", put(columns::update_columns_order))
        .layer(from_fn_with_state(deployment.clone(), load_board_middleware));

    let inner = Router::new()
        .route("/", get(list_boards).post(create_board))
        .nest("/{board_id}", board_id_router);

    Router::new()
        .nest("/boards", inner)
        .route("/labels/{label_id}", delete(delete_label))
}
