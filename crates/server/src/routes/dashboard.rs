use axum::{
    Json, Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    activity_log::ActivityEntry,
    task::{DashboardStats, Task},
};
use serde::Deserialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{Deployment, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct ActivityQuery {
    pub limit: Option<u64>,
}

pub async fn stats(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<DashboardStats>>, ApiError> {
    let stats = Task::stats(&deployment.db().pool).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// The dashboard widget asks for 5 entries; the full feed page takes 50.
pub async fn activity(
    State(deployment): State<Deployment>,
    Query(query): Query<ActivityQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ActivityEntry>>>, ApiError> {
    let limit = query.limit.unwrap_or(50).min(200);
    let entries = ActivityEntry::recent(&deployment.db().pool, limit).await?;
    Ok(Json(ApiResponse::success(entries)))
}

pub fn router() -> Router<Deployment> {
    Router::new()
        .route("/dashboard/stats", get(stats))
        .route("/activity", get(activity))
}
