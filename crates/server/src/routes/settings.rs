use axum::{Json, Router, extract::State, response::Json as ResponseJson, routing::get};
use services::services::settings::{self, Branding};
use utils::response::ApiResponse;

use crate::{Deployment, error::ApiError};

/// Branding is public so the login screen can render the instance identity.
pub async fn branding(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Branding>>, ApiError> {
    let branding = settings::branding(&deployment.db().pool).await?;
    Ok(Json(ApiResponse::success(branding)))
}

pub fn router() -> Router<Deployment> {
    Router::new().route("/settings/branding", get(branding))
}
