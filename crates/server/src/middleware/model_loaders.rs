use std::{fmt::Display, future::Future};

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use db::models::{
    board::Board, board_column::BoardColumn, subtask::Subtask, task::Task,
};
use uuid::Uuid;

use crate::Deployment;

async fn fetch_model_or_status<M, E, Fut>(
    model_name: &'static str,
    model_id: Uuid,
    load_future: Fut,
) -> Result<M, StatusCode>
where
    E: Display,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    match load_future.await {
        Ok(Some(model)) => Ok(model),
        Ok(None) => {
            tracing::warn!("{model_name} {model_id} not found");
            Err(StatusCode::NOT_FOUND)
        }
        Err(error) => {
            tracing::error!("Failed to fetch {model_name} {model_id}: {error}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn load_request_extension<M, E, Fut>(
    request: Request,
    next: Next,
    model_name: &'static str,
    model_id: Uuid,
    load_future: Fut,
) -> Result<Response, StatusCode>
where
    M: Clone + Send + Sync + 'static,
    E: Display,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    let model = fetch_model_or_status(model_name, model_id, load_future).await?;
    let mut request = request;
    request.extensions_mut().insert(model);
    Ok(next.run(request).await)
}

pub async fn load_board_middleware(
    State(deployment): State<Deployment>,
    Path(board_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    load_request_extension(
        request,
        next,
        "Board",
        board_id,
        Board::find_by_id(&deployment.db().pool, board_id),
    )
    .await
}

pub async fn load_column_middleware(
    State(deployment): State<Deployment>,
    Path(column_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    load_request_extension(
        request,
        next,
        "Column",
        column_id,
        BoardColumn::find_by_id(&deployment.db().pool, column_id),
    )
    .await
}

pub async fn load_task_middleware(
    State(deployment): State<Deployment>,
    Path(task_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    load_request_extension(
        request,
        next,
        "Task",
        task_id,
        Task::find_by_id(&deployment.db().pool, task_id),
    )
    .await
}

pub async fn load_subtask_middleware(
    State(deployment): State<Deployment>,
    Path(subtask_id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    load_request_extension(
        request,
        next,
        "Subtask",
        subtask_id,
        Subtask::find_by_id(&deployment.db().pool, subtask_id),
    )
    .await
}
