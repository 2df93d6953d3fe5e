mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{json_body, register_owner, request, spawn_app};

#[tokio::test]
async fn register_creates_owner_and_session() {
    let (_state, app) = spawn_app().await;

    let response = request(
        &app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({
            "email": "alice@co.com",
            "password": "Str0ng!Pass1",
            "firstName": "Alice",
            "lastName": "Anders",
            "organizationName": "Acme",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["email"], "alice@co.com");
    assert_eq!(body["data"]["user"]["userType"], "owner");
    assert_eq!(body["data"]["organization"]["slug"], "acme");
    assert!(body["data"]["accessToken"].is_string());
    assert!(body["data"]["refreshToken"].is_string());
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let (_state, app) = spawn_app().await;
    register_owner(&app, "alice@co.com", "Acme").await;

    let response = request(
        &app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({
            "email": "alice@co.com",
            "password": "Str0ng!Pass1",
            "firstName": "Alice",
            "lastName": "Anders",
            "organizationName": "Other Org",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_validates_input() {
    let (_state, app) = spawn_app().await;

    for (email, password, org) in [
        ("not-an-email", "Str0ng!Pass1", "Acme"),
        ("ok@co.com", "short1", "Acme"),
        ("ok@co.com", "nodigitshere", "Acme"),
        ("ok@co.com", "Str0ng!Pass1", ""),
    ] {
        let response = request(
            &app,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({
                "email": email,
                "password": password,
                "firstName": "Alice",
                "lastName": "Anders",
                "organizationName": org,
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn organization_login_returns_session() {
    let (_state, app) = spawn_app().await;
    register_owner(&app, "alice@co.com", "Acme").await;

    let response = request(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({
            "email": "alice@co.com",
            "password": "Str0ng!Pass1",
            "loginType": "organization",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert!(body["data"]["accessToken"].is_string());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (_state, app) = spawn_app().await;
    register_owner(&app, "alice@co.com", "Acme").await;

    let response = request(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({
            "email": "alice@co.com",
            "password": "Wrong!Pass1",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_email_gets_same_error_as_wrong_password() {
    let (_state, app) = spawn_app().await;
    register_owner(&app, "alice@co.com", "Acme").await;

    let wrong_password = request(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"email": "alice@co.com", "password": "Wrong!Pass1"})),
    )
    .await;
    let unknown_email = request(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"email": "nobody@co.com", "password": "Wrong!Pass1"})),
    )
    .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);

    let a = json_body(wrong_password).await;
    let b = json_body(unknown_email).await;
    assert_eq!(a["error"], b["error"]);
}

#[tokio::test]
async fn account_locks_after_five_failures() {
    let (_state, app) = spawn_app().await;
    register_owner(&app, "alice@co.com", "Acme").await;

    for _ in 0..5 {
        let response = request(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "alice@co.com", "password": "Wrong!Pass1"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // The sixth attempt is locked out even with the correct password.
    let response = request(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"email": "alice@co.com", "password": "Str0ng!Pass1"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::LOCKED);
    assert!(response.headers().contains_key("retry-after"));
}

#[tokio::test]
async fn failure_counter_resets_after_success() {
    let (state, app) = spawn_app().await;
    register_owner(&app, "alice@co.com", "Acme").await;

    for _ in 0..3 {
        let response = request(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "alice@co.com", "password": "Wrong!Pass1"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = request(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"email": "alice@co.com", "password": "Str0ng!Pass1"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let user = state
        .store()
        .get_user_by_email("alice@co.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.failed_login_attempts, 0);
    assert!(user.locked_until.is_none());
    assert!(user.last_login_at.is_some());
}

#[tokio::test]
async fn refresh_rotates_and_consumes_the_token() {
    let (_state, app) = spawn_app().await;
    let (_access, refresh) = register_owner(&app, "alice@co.com", "Acme").await;

    let response = request(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let new_access = body["data"]["accessToken"].as_str().unwrap().to_string();
    let new_refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(new_refresh, refresh);

    // The new pair is live.
    let me = request(&app, "GET", "/api/v1/auth/me", Some(&new_access), None).await;
    assert_eq!(me.status(), StatusCode::OK);
    let again = request(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({"refreshToken": new_refresh})),
    )
    .await;
    assert_eq!(again.status(), StatusCode::OK);
    let body = json_body(again).await;
    let live_refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();

    // The consumed token must not work a second time, and replaying it
    // takes down every other refresh token the user holds.
    let replay = request(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);

    let after_replay = request(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({"refreshToken": live_refresh})),
    )
    .await;
    assert_eq!(after_replay.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rejects_access_tokens_and_garbage() {
    let (_state, app) = spawn_app().await;
    let (access, _refresh) = register_owner(&app, "alice@co.com", "Acme").await;

    let with_access = request(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({"refreshToken": access})),
    )
    .await;
    assert_eq!(with_access.status(), StatusCode::UNAUTHORIZED);

    let with_garbage = request(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({"refreshToken": "not-a-jwt"})),
    )
    .await;
    assert_eq!(with_garbage.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_refresh_token() {
    let (_state, app) = spawn_app().await;
    let (access, refresh) = register_owner(&app, "alice@co.com", "Acme").await;

    let response = request(
        &app,
        "POST",
        "/api/v1/auth/logout",
        Some(&access),
        Some(json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let replay = request(
        &app,
        "POST",
        "/api/v1/auth/refresh",
        None,
        Some(json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_roles_and_flattened_permissions() {
    let (_state, app) = spawn_app().await;
    let (access, _refresh) = register_owner(&app, "alice@co.com", "Acme").await;

    let response = request(&app, "GET", "/api/v1/auth/me", Some(&access), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let roles: Vec<&str> = body["data"]["roles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r.as_str().unwrap())
        .collect();
    assert!(roles.contains(&"org_owner"));

    let permissions = body["data"]["permissions"].as_array().unwrap();
    assert!(permissions.iter().any(|p| {
        p["resource"] == "game_keys" && p["action"] == "create"
    }));
    assert!(permissions.iter().any(|p| {
        p["resource"] == "games" && p["action"] == "read"
    }));
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer_token() {
    let (_state, app) = spawn_app().await;

    let no_token = request(&app, "GET", "/api/v1/auth/me", None, None).await;
    assert_eq!(no_token.status(), StatusCode::UNAUTHORIZED);

    let bad_token = request(&app, "GET", "/api/v1/auth/me", Some("bogus"), None).await;
    assert_eq!(bad_token.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn system_status_reports_health() {
    let (_state, app) = spawn_app().await;
    let (access, _refresh) = register_owner(&app, "alice@co.com", "Acme").await;

    let response = request(&app, "GET", "/api/v1/system/status", Some(&access), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["data"]["databaseOk"], true);
    assert!(body["data"]["version"].is_string());
}

#[tokio::test]
async fn back_to_back_logins_issue_distinct_refresh_tokens() {
    // Registration and an immediate login mint refresh tokens within the
    // same second; both must persist, so their hashes cannot collide.
    let (_state, app) = spawn_app().await;
    let (_access, register_refresh) = register_owner(&app, "alice@co.com", "Acme").await;

    let mut refreshes = vec![register_refresh];
    for _ in 0..2 {
        let response = request(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({
                "email": "alice@co.com",
                "password": "Str0ng!Pass1",
                "loginType": "organization",
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        refreshes.push(
            json_body(response).await["data"]["refreshToken"]
                .as_str()
                .unwrap()
                .to_string(),
        );
    }

    let unique: std::collections::HashSet<&String> = refreshes.iter().collect();
    assert_eq!(unique.len(), refreshes.len());
}

#[tokio::test]
async fn losing_registration_racer_leaves_no_orphan_organization() {
    use keyforge::db::NewUser;
    use keyforge::domain::UserType;
    use sea_orm::{EntityTrait, PaginatorTrait};

    let (state, _app) = spawn_app().await;
    let security = state.config().read().await.security.clone();

    let new_user = |org_id| NewUser {
        email: "alice@co.com".to_string(),
        password: "Str0ng!Pass1".to_string(),
        first_name: "Alice".to_string(),
        last_name: "Anders".to_string(),
        user_type: UserType::Owner,
        organization_id: org_id,
    };

    state
        .store()
        .register_owner("Acme", "acme", new_user(0), &security)
        .await
        .expect("first registration");

    // Same email under a fresh slug, past the handler's pre-checks. The
    // unique index rejects the user insert and the organization row must
    // roll back with it.
    let err = state
        .store()
        .register_owner("Bravo", "bravo", new_user(0), &security)
        .await
        .expect_err("duplicate email must fail");
    assert!(format!("{err:#}").contains("UNIQUE constraint failed"));

    let orgs = keyforge::entities::organizations::Entity::find()
        .count(&state.store().conn)
        .await
        .unwrap();
    let users = keyforge::entities::users::Entity::find()
        .count(&state.store().conn)
        .await
        .unwrap();
    assert_eq!(orgs, 1);
    assert_eq!(users, 1);
}
