#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use keyforge::api::AppState;
use keyforge::config::Config;
use keyforge::db::NewUser;
use keyforge::domain::UserType;

pub async fn spawn_app() -> (Arc<AppState>, Router) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // Keep password hashing cheap in tests.
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let state = keyforge::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    let app = keyforge::api::router(state.clone()).await;
    (state, app)
}

pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> Response<axum::body::Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(json_body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

pub async fn json_body(response: Response<axum::body::Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register an organization owner and return (access token, refresh token).
pub async fn register_owner(app: &Router, email: &str, org_name: &str) -> (String, String) {
    let response = request(
        app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({
            "email": email,
            "password": "Str0ng!Pass1",
            "firstName": "Alice",
            "lastName": "Anders",
            "organizationName": org_name,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    (
        body["data"]["accessToken"].as_str().unwrap().to_string(),
        body["data"]["refreshToken"].as_str().unwrap().to_string(),
    )
}

/// Create a member user directly in the store (no invite flow in the API).
pub async fn create_member(state: &Arc<AppState>, email: &str, organization_id: i32) -> i32 {
    let security = state.config().read().await.security.clone();
    let user = state
        .store()
        .create_user(
            NewUser {
                email: email.to_string(),
                password: "Str0ng!Pass1".to_string(),
                first_name: "Mia".to_string(),
                last_name: "Member".to_string(),
                user_type: UserType::Member,
                organization_id,
            },
            &security,
        )
        .await
        .expect("Failed to create member");

    state
        .store()
        .role_repo()
        .assign_role(user.id, "member")
        .await
        .expect("Failed to assign member role");

    user.id
}

/// Organization id of the caller, via /auth/me.
pub async fn org_id_of(app: &Router, access_token: &str) -> i32 {
    let response = request(app, "GET", "/api/v1/auth/me", Some(access_token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    i32::try_from(body["data"]["user"]["organizationId"].as_i64().unwrap()).unwrap()
}

/// Start an individual login for a member and return the request id.
pub async fn start_individual_login(app: &Router, email: &str) -> String {
    let response = request(
        app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({
            "email": email,
            "password": "Str0ng!Pass1",
            "loginType": "individual",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    body["data"]["requestId"].as_str().unwrap().to_string()
}
