use axum::{
    Extension, Json, Router,
    extract::State,
    http::header,
    response::{AppendHeaders, Json as ResponseJson},
    routing::{get, post},
};
use db::models::user::{CreateUser, User};
use serde::{Deserialize, Serialize};
use services::services::auth::{AuthError, Caller};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    Deployment,
    error::ApiError,
    http::session::{clear_session_cookie, session_cookie},
};

#[derive(Debug, Deserialize, TS)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct SetupRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, TS)]
pub struct SetupStatus {
    pub needs_setup: bool,
}

type SetCookie = AppendHeaders<[(header::HeaderName, String); 1]>;

pub async fn login(
    State(deployment): State<Deployment>,
    Json(payload): Json<LoginRequest>,
) -> Result<(SetCookie, ResponseJson<ApiResponse<Caller>>), ApiError> {
    let caller = deployment
        .auth()
        .login(&deployment.db().pool, &payload.username, &payload.password)
        .await?;
    let (token, expires) = deployment.auth().issue_token(&caller)?;

    tracing::info!(user = %caller.username, "User signed in");
    Ok((
        AppendHeaders([(header::SET_COOKIE, session_cookie(&token, expires))]),
        ResponseJson(ApiResponse::success(caller)),
    ))
}

pub async fn logout() -> (SetCookie, ResponseJson<ApiResponse<()>>) {
    (
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie())]),
        ResponseJson(ApiResponse::success(())),
    )
}

pub async fn setup_status(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<SetupStatus>>, ApiError> {
    let user_count = User::count(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(SetupStatus {
        needs_setup: user_count == 0,
    })))
}

/// First-run bootstrap: creates the initial administrator and signs them in.
/// Refused as soon as any user exists.
pub async fn initial_setup(
    State(deployment): State<Deployment>,
    Json(payload): Json<SetupRequest>,
) -> Result<(SetCookie, ResponseJson<ApiResponse<Caller>>), ApiError> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest("Missing fields".to_string()));
    }

    let pool = &deployment.db().pool;
    if User::count(pool).await? > 0 {
        return Err(ApiError::Auth(AuthError::SetupAlreadyCompleted));
    }

    let password_hash = deployment.auth().hash_password(&payload.password)?;
    let user = User::create(
        pool,
        &CreateUser {
            username: payload.username.trim().to_string(),
            password_hash,
            is_admin: true,
            group_id: None,
        },
        Uuid::new_v4(),
    )
    .await?;

    let caller = Caller::for_user(&user);
    let (token, expires) = deployment.auth().issue_token(&caller)?;

    tracing::info!(user = %caller.username, "Initial administrator created");
    Ok((
        AppendHeaders([(header::SET_COOKIE, session_cookie(&token, expires))]),
        ResponseJson(ApiResponse::success(caller)),
    ))
}

pub async fn me(
    Extension(caller): Extension<Caller>,
) -> ResponseJson<ApiResponse<Caller>> {
    ResponseJson(ApiResponse::success(caller))
}

/// Endpoints reachable without a session.
pub fn router() -> Router<Deployment> {
    Router::new().nest(
        "/auth",
        Router::new()
            .route("/login", post(login))
            .route("/logout", post(logout))
            .route("/setup", get(setup_status).post(initial_setup)),
    )
}

/// Endpoints behind the session middleware.
pub fn session_router() -> Router<Deployment> {
    Router::new().nest("/auth", Router::new().route("/me", get(me)))
}
