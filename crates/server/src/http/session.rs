use axum::{
    Json,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use services::services::auth::Caller;
use utils::response::ApiResponse;

use crate::Deployment;

pub const SESSION_COOKIE: &str = "session";

fn parse_authorization_bearer(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let (prefix, rest) = trimmed.split_once(' ')?;
    if !prefix.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn extract_cookie_token(req: &Request) -> Option<String> {
    let cookies = req.headers().get(header::COOKIE)?.to_str().ok()?;
    for pair in cookies.split(';') {
        let (name, value) = pair.trim().split_once('=')?;
        if name == SESSION_COOKIE && !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

fn extract_request_token(req: &Request) -> Option<String> {
    // 1) Authorization: Bearer <token>
    if let Some(value) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization_bearer)
    {
        return Some(value.to_string());
    }

    // 2) The httpOnly session cookie set at login
    extract_cookie_token(req)
}

/// Serializes the session cookie; expiry rides along so browsers drop it in
/// step with the token.
pub fn session_cookie(token: &str, expires: DateTime<Utc>) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Expires={}",
        expires.format("%a, %d %b %Y %H:%M:%S GMT")
    )
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Verifies the session token, threads the `Caller` through the request,
/// and re-signs the cookie on the way out so activity extends the session.
pub async fn require_session(
    State(deployment): State<Deployment>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_request_token(&req) else {
        tracing::warn!(
            path = %req.uri().path(),
            method = %req.method(),
            "Request without session token"
        );
        let response = ApiResponse::<()>::error("Unauthorized");
        return (axum::http::StatusCode::UNAUTHORIZED, Json(response)).into_response();
    };

    let caller: Caller = match deployment.auth().verify_token(&token) {
        Ok(caller) => caller,
        Err(err) => {
            tracing::warn!(
                path = %req.uri().path(),
                method = %req.method(),
                error = %err,
                "Rejected session token"
            );
            let response = ApiResponse::<()>::error("Unauthorized. Please sign in again.");
            return (axum::http::StatusCode::UNAUTHORIZED, Json(response)).into_response();
        }
    };

    req.extensions_mut().insert(caller.clone());
    let mut response = next.run(req).await;

    match deployment.auth().issue_token(&caller) {
        Ok((refreshed, expires)) => {
            if let Ok(value) = session_cookie(&refreshed, expires).parse() {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "Failed to refresh session cookie");
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_parsing_accepts_common_header_shapes() {
        assert_eq!(parse_authorization_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_authorization_bearer("bearer  abc "), Some("abc"));
        assert_eq!(parse_authorization_bearer("Basic abc"), None);
        assert_eq!(parse_authorization_bearer("Bearer "), None);
    }

    #[test]
    fn cookie_strings_carry_http_only_and_path() {
        let cookie = session_cookie("tok", Utc::now());
        assert!(cookie.starts_with("session=tok; Path=/; HttpOnly"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
