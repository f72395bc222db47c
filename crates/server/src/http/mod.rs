use axum::{Router, middleware::from_fn_with_state, routing::get};
use tower_http::trace::TraceLayer;

use crate::{Deployment, routes};

pub mod session;

pub fn router(deployment: Deployment) -> Router {
    let protected = Router::new()
        .merge(routes::boards::router(&deployment))
        .merge(routes::columns::router(&deployment))
        .merge(routes::tasks::router(&deployment))
        .merge(routes::subtasks::router(&deployment))
        .merge(routes::users::router())
        .merge(routes::dashboard::router())
        .merge(routes::admin::router())
        .merge(routes::auth::session_router())
        .layer(from_fn_with_state(
            deployment.clone(),
            session::require_session,
        ));

    let public = Router::new()
        .merge(routes::auth::router())
        .merge(routes::settings::router());

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", public.merge(protected))
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{Deployment, test_support::TestEnvGuard};

    async fn setup_deployment() -> (TestEnvGuard, Deployment) {
        let temp_root = std::env::temp_dir().join(format!("flowt-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&temp_root).unwrap();

        let db_path = temp_root.join("db.sqlite");
        let db_url = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
        let env_guard = TestEnvGuard::new(&temp_root, db_url);

        let deployment = Deployment::new().await.unwrap();

        (env_guard, deployment)
    }

    fn request(
        method: &str,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn response_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn session_cookie_from(response: &axum::response::Response) -> String {
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("Set-Cookie header")
            .to_str()
            .unwrap();
        set_cookie
            .split(';')
            .next()
            .expect("cookie pair")
            .to_string()
    }

    async fn setup_admin(app: &Router, username: &str) -> String {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/auth/setup",
                Some(json!({ "username": username, "password": "hunter2" })),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie_from(&response)
    }

    #[tokio::test]
    async fn health_is_public() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);

        let response = app
            .oneshot(request("GET", "/health", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn branding_is_public_and_defaults_apply() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);

        let response = app
            .oneshot(request("GET", "/api/settings/branding", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json.pointer("/data/logo_text").and_then(Value::as_str), Some("Flowt"));
    }

    #[tokio::test]
    async fn api_requires_a_session() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);

        let response = app
            .oneshot(request("GET", "/api/boards", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = response_json(response).await;
        assert_eq!(json.get("success").and_then(Value::as_bool), Some(false));
        assert_eq!(
            json.get("message").and_then(Value::as_str),
            Some("Unauthorized")
        );
    }

    #[tokio::test]
    async fn setup_signs_in_and_is_single_use() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);

        let cookie = setup_admin(&app, "root").await;

        // The fresh session works and gets refreshed on use.
        let response = app
            .clone()
            .oneshot(request("GET", "/api/boards", None, Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::SET_COOKIE));

        // Second setup attempt is refused.
        let response = app
            .oneshot(request(
                "POST",
                "/api/auth/setup",
                Some(json!({ "username": "evil", "password": "hunter2" })),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);
        setup_admin(&app, "root").await;

        let response = app
            .oneshot(request(
                "POST",
                "/api/auth/login",
                Some(json!({ "username": "root", "password": "wrong" })),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = response_json(response).await;
        assert_eq!(
            json.get("message").and_then(Value::as_str),
            Some("Invalid credentials")
        );
    }

    #[tokio::test]
    async fn board_creation_is_permission_gated() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);
        let admin_cookie = setup_admin(&app, "root").await;

        // Admin provisions a user with no group.
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/admin/users",
                Some(json!({ "username": "worker", "password": "hunter2" })),
                Some(&admin_cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/auth/login",
                Some(json!({ "username": "worker", "password": "hunter2" })),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let worker_cookie = session_cookie_from(&response);

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/boards",
                Some(json!({ "title": "Skunkworks" })),
                Some(&worker_cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = response_json(response).await;
        assert_eq!(
            json.get("message").and_then(Value::as_str),
            Some("You do not have permission to create boards.")
        );

        // No board row was created.
        let response = app
            .oneshot(request("GET", "/api/boards", None, Some(&admin_cookie)))
            .await
            .unwrap();
        let json = response_json(response).await;
        assert_eq!(
            json.pointer("/data").and_then(Value::as_array).map(Vec::len),
            Some(0)
        );
    }

    #[tokio::test]
    async fn admin_routes_reject_non_admins() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);
        let admin_cookie = setup_admin(&app, "root").await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/admin/users",
                Some(json!({ "username": "worker", "password": "hunter2" })),
                Some(&admin_cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/auth/login",
                Some(json!({ "username": "worker", "password": "hunter2" })),
                None,
            ))
            .await
            .unwrap();
        let worker_cookie = session_cookie_from(&response);

        let response = app
            .oneshot(request(
                "GET",
                "/api/admin/users",
                None,
                Some(&worker_cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn completion_is_blocked_until_dependencies_resolve() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);
        let cookie = setup_admin(&app, "root").await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/boards",
                Some(json!({ "title": "Launch" })),
                Some(&cookie),
            ))
            .await
            .unwrap();
        let board_id = response_json(response)
            .await
            .pointer("/data/id")
            .and_then(Value::as_str)
            .unwrap()
            .to_string();

        let response = app
            .clone()
            .oneshot(request(
                "GET",
                &format!("/api/boards/{board_id}"),
                None,
                Some(&cookie),
            ))
            .await
            .unwrap();
        let column_id = response_json(response)
            .await
            .pointer("/data/columns/0/id")
            .and_then(Value::as_str)
            .unwrap()
            .to_string();

        let mut task_ids = Vec::new();
        for (index, title) in ["blocked", "blocker"].iter().enumerate() {
            let response = app
                .clone()
                .oneshot(request(
                    "POST",
                    &format!("/api/columns/{column_id}/tasks"),
                    Some(json!({ "title": title, "position": index })),
                    Some(&cookie),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            task_ids.push(
                response_json(response)
                    .await
                    .pointer("/data/id")
                    .and_then(Value::as_str)
                    .unwrap()
                    .to_string(),
            );
        }
        let (blocked, blocker) = (&task_ids[0], &task_ids[1]);

        // Self-dependency is refused outright.
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/tasks/{blocked}/dependencies"),
                Some(json!({ "blocking_task_id": blocked })),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(
            json.get("message").and_then(Value::as_str),
            Some("Cannot depend on self")
        );

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/tasks/{blocked}/dependencies"),
                Some(json!({ "blocking_task_id": blocker })),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Completing the blocked task is refused while the edge exists.
        let response = app
            .clone()
            .oneshot(request(
                "PUT",
                &format!("/api/tasks/{blocked}/completion"),
                Some(json!({ "is_completed": true })),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = response_json(response).await;
        assert_eq!(
            json.get("message").and_then(Value::as_str),
            Some("Resolve dependencies first")
        );

        // Marking incomplete is always allowed.
        let response = app
            .clone()
            .oneshot(request(
                "PUT",
                &format!("/api/tasks/{blocked}/completion"),
                Some(json!({ "is_completed": false })),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Removing the edge unblocks completion.
        let response = app
            .clone()
            .oneshot(request(
                "DELETE",
                &format!("/api/tasks/{blocked}/dependencies/{blocker}"),
                None,
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(request(
                "PUT",
                &format!("/api/tasks/{blocked}/completion"),
                Some(json!({ "is_completed": true })),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn column_reorder_round_trips_through_the_api() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);
        let cookie = setup_admin(&app, "root").await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/boards",
                Some(json!({ "title": "Launch" })),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let board_id = response_json(response)
            .await
            .pointer("/data/id")
            .and_then(Value::as_str)
            .unwrap()
            .to_string();

        let response = app
            .clone()
            .oneshot(request(
                "GET",
                &format!("/api/boards/{board_id}"),
                None,
                Some(&cookie),
            ))
            .await
            .unwrap();
        let board = response_json(response).await;
        let column_ids: Vec<String> = board
            .pointer("/data/columns")
            .and_then(Value::as_array)
            .unwrap()
            .iter()
            .map(|column| column.get("id").and_then(Value::as_str).unwrap().to_string())
            .collect();
        assert_eq!(column_ids.len(), 3);

        let reversed: Vec<String> = column_ids.iter().rev().cloned().collect();
        let response = app
            .clone()
            .oneshot(request(
                "PUT",
                &format!("/api/boards/{board_id}/columns/order"),
                Some(json!({ "column_ids": reversed })),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(request(
                "GET",
                &format!("/api/boards/{board_id}"),
                None,
                Some(&cookie),
            ))
            .await
            .unwrap();
        let board = response_json(response).await;
        let titles: Vec<&str> = board
            .pointer("/data/columns")
            .and_then(Value::as_array)
            .unwrap()
            .iter()
            .map(|column| column.get("title").and_then(Value::as_str).unwrap())
            .collect();
        assert_eq!(titles, vec!["Done", "In Progress", "To Do"]);
    }
}
