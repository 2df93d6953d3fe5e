mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

use common::{
    create_member, json_body, org_id_of, register_owner, request, spawn_app,
    start_individual_login,
};
use keyforge::entities::login_requests;

#[tokio::test]
async fn individual_login_flow_approve_then_complete() {
    let (state, app) = spawn_app().await;
    let (owner_access, _) = register_owner(&app, "alice@co.com", "Acme").await;
    let org_id = org_id_of(&app, &owner_access).await;
    create_member(&state, "member@co.com", org_id).await;

    let request_id = start_individual_login(&app, "member@co.com").await;

    // Client polls: pending.
    let status_uri = format!("/api/v1/auth/login-requests/{request_id}/status");
    let response = request(&app, "GET", &status_uri, None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["status"], "pending");

    // Owner sees it in the queue.
    let response = request(
        &app,
        "GET",
        "/api/v1/auth/login-requests/pending",
        Some(&owner_access),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let queue = body["data"].as_array().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["userEmail"], "member@co.com");

    // Approve.
    let approve_uri = format!("/api/v1/auth/login-requests/{request_id}/approve");
    let response = request(&app, "PUT", &approve_uri, Some(&owner_access), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["status"], "approved");

    let response = request(&app, "GET", &status_uri, None, None).await;
    assert_eq!(json_body(response).await["data"]["status"], "approved");

    // Complete mints a session for the member.
    let complete_uri = format!("/api/v1/auth/login-requests/{request_id}/complete");
    let response = request(&app, "POST", &complete_uri, None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let member_access = body["data"]["accessToken"].as_str().unwrap().to_string();

    let me = request(&app, "GET", "/api/v1/auth/me", Some(&member_access), None).await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(json_body(me).await["data"]["user"]["email"], "member@co.com");

    // Completion is one-shot.
    let second = request(&app, "POST", &complete_uri, None, None).await;
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn approve_twice_conflicts() {
    let (state, app) = spawn_app().await;
    let (owner_access, _) = register_owner(&app, "alice@co.com", "Acme").await;
    let org_id = org_id_of(&app, &owner_access).await;
    create_member(&state, "member@co.com", org_id).await;

    let request_id = start_individual_login(&app, "member@co.com").await;
    let approve_uri = format!("/api/v1/auth/login-requests/{request_id}/approve");

    let first = request(&app, "PUT", &approve_uri, Some(&owner_access), None).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = request(&app, "PUT", &approve_uri, Some(&owner_access), None).await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reject_stores_the_reason_and_is_terminal() {
    let (state, app) = spawn_app().await;
    let (owner_access, _) = register_owner(&app, "alice@co.com", "Acme").await;
    let org_id = org_id_of(&app, &owner_access).await;
    create_member(&state, "member@co.com", org_id).await;

    let request_id = start_individual_login(&app, "member@co.com").await;
    let reject_uri = format!("/api/v1/auth/login-requests/{request_id}/reject");

    let response = request(
        &app,
        "PUT",
        &reject_uri,
        Some(&owner_access),
        Some(json!({"reason": "unrecognized device"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "rejected");
    assert_eq!(body["data"]["rejectionReason"], "unrecognized device");

    // Rejected is terminal: no approval and no completion afterwards.
    let approve_uri = format!("/api/v1/auth/login-requests/{request_id}/approve");
    let approve = request(&app, "PUT", &approve_uri, Some(&owner_access), None).await;
    assert_eq!(approve.status(), StatusCode::BAD_REQUEST);

    let complete_uri = format!("/api/v1/auth/login-requests/{request_id}/complete");
    let complete = request(&app, "POST", &complete_uri, None, None).await;
    assert_eq!(complete.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn past_expiry_request_always_reads_expired() {
    let (state, app) = spawn_app().await;
    let (owner_access, _) = register_owner(&app, "alice@co.com", "Acme").await;
    let org_id = org_id_of(&app, &owner_access).await;
    create_member(&state, "member@co.com", org_id).await;

    let request_id = start_individual_login(&app, "member@co.com").await;

    // Backdate the deadline.
    login_requests::Entity::update_many()
        .col_expr(
            login_requests::Column::ExpiresAt,
            Expr::value(Utc::now() - Duration::hours(1)),
        )
        .filter(login_requests::Column::Id.eq(request_id.clone()))
        .exec(&state.store().conn)
        .await
        .unwrap();

    let status_uri = format!("/api/v1/auth/login-requests/{request_id}/status");
    for _ in 0..3 {
        let response = request(&app, "GET", &status_uri, None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["data"]["status"], "expired");
    }

    // Expired is terminal for approval too.
    let approve_uri = format!("/api/v1/auth/login-requests/{request_id}/approve");
    let approve = request(&app, "PUT", &approve_uri, Some(&owner_access), None).await;
    assert_eq!(approve.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn complete_after_grace_window_expires_the_request() {
    let (state, app) = spawn_app().await;
    let (owner_access, _) = register_owner(&app, "alice@co.com", "Acme").await;
    let org_id = org_id_of(&app, &owner_access).await;
    create_member(&state, "member@co.com", org_id).await;

    let request_id = start_individual_login(&app, "member@co.com").await;
    let approve_uri = format!("/api/v1/auth/login-requests/{request_id}/approve");
    let response = request(&app, "PUT", &approve_uri, Some(&owner_access), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Pretend the approval happened 11 minutes ago.
    login_requests::Entity::update_many()
        .col_expr(
            login_requests::Column::ApprovedAt,
            Expr::value(Utc::now() - Duration::minutes(11)),
        )
        .filter(login_requests::Column::Id.eq(request_id.clone()))
        .exec(&state.store().conn)
        .await
        .unwrap();

    let complete_uri = format!("/api/v1/auth/login-requests/{request_id}/complete");
    let response = request(&app, "POST", &complete_uri, None, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let status_uri = format!("/api/v1/auth/login-requests/{request_id}/status");
    let response = request(&app, "GET", &status_uri, None, None).await;
    assert_eq!(json_body(response).await["data"]["status"], "expired");
}

#[tokio::test]
async fn complete_before_approve_is_not_found() {
    let (state, app) = spawn_app().await;
    let (owner_access, _) = register_owner(&app, "alice@co.com", "Acme").await;
    let org_id = org_id_of(&app, &owner_access).await;
    create_member(&state, "member@co.com", org_id).await;

    let request_id = start_individual_login(&app, "member@co.com").await;

    let complete_uri = format!("/api/v1/auth/login-requests/{request_id}/complete");
    let response = request(&app, "POST", &complete_uri, None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deactivated_user_is_approvable_but_cannot_complete() {
    let (state, app) = spawn_app().await;
    let (owner_access, _) = register_owner(&app, "alice@co.com", "Acme").await;
    let org_id = org_id_of(&app, &owner_access).await;
    let member_id = create_member(&state, "member@co.com", org_id).await;

    let request_id = start_individual_login(&app, "member@co.com").await;

    state
        .store()
        .user_repo()
        .set_active(member_id, false)
        .await
        .unwrap();

    // Approval stays legal after deactivation.
    let approve_uri = format!("/api/v1/auth/login-requests/{request_id}/approve");
    let response = request(&app, "PUT", &approve_uri, Some(&owner_access), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Completion is where the deactivated user is stopped.
    let complete_uri = format!("/api/v1/auth/login-requests/{request_id}/complete");
    let response = request(&app, "POST", &complete_uri, None, None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn pending_queue_excludes_owner_requests() {
    let (state, app) = spawn_app().await;
    let (owner_access, _) = register_owner(&app, "alice@co.com", "Acme").await;
    let org_id = org_id_of(&app, &owner_access).await;
    create_member(&state, "member@co.com", org_id).await;

    // Both the owner and a member start individual logins.
    start_individual_login(&app, "alice@co.com").await;
    start_individual_login(&app, "member@co.com").await;

    let response = request(
        &app,
        "GET",
        "/api/v1/auth/login-requests/pending",
        Some(&owner_access),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let queue = body["data"].as_array().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["userEmail"], "member@co.com");
}

#[tokio::test]
async fn cross_organization_approval_is_forbidden() {
    let (state, app) = spawn_app().await;
    let (owner_access, _) = register_owner(&app, "alice@co.com", "Acme").await;
    let org_id = org_id_of(&app, &owner_access).await;
    create_member(&state, "member@co.com", org_id).await;

    let (other_owner_access, _) = register_owner(&app, "bob@other.com", "Other Org").await;

    let request_id = start_individual_login(&app, "member@co.com").await;
    let approve_uri = format!("/api/v1/auth/login-requests/{request_id}/approve");

    let response = request(&app, "PUT", &approve_uri, Some(&other_owner_access), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The request is untouched.
    let status_uri = format!("/api/v1/auth/login-requests/{request_id}/status");
    let response = request(&app, "GET", &status_uri, None, None).await;
    assert_eq!(json_body(response).await["data"]["status"], "pending");
}

#[tokio::test]
async fn member_cannot_use_owner_endpoints() {
    let (state, app) = spawn_app().await;
    let (owner_access, _) = register_owner(&app, "alice@co.com", "Acme").await;
    let org_id = org_id_of(&app, &owner_access).await;
    create_member(&state, "member@co.com", org_id).await;

    // Walk the member through the approval flow to get a session.
    let request_id = start_individual_login(&app, "member@co.com").await;
    let approve_uri = format!("/api/v1/auth/login-requests/{request_id}/approve");
    request(&app, "PUT", &approve_uri, Some(&owner_access), None).await;
    let complete_uri = format!("/api/v1/auth/login-requests/{request_id}/complete");
    let response = request(&app, "POST", &complete_uri, None, None).await;
    let member_access = json_body(response).await["data"]["accessToken"]
        .as_str()
        .unwrap()
        .to_string();

    let response = request(
        &app,
        "GET",
        "/api/v1/auth/login-requests/pending",
        Some(&member_access),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn organization_login_by_member_is_forbidden() {
    let (state, app) = spawn_app().await;
    let (owner_access, _) = register_owner(&app, "alice@co.com", "Acme").await;
    let org_id = org_id_of(&app, &owner_access).await;
    create_member(&state, "member@co.com", org_id).await;

    let response = request(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({
            "email": "member@co.com",
            "password": "Str0ng!Pass1",
            "loginType": "organization",
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn pending_individual_login_still_writes_a_login_audit_entry() {
    let (state, app) = spawn_app().await;
    let (owner_access, _) = register_owner(&app, "alice@co.com", "Acme").await;
    let org_id = org_id_of(&app, &owner_access).await;
    let member_id = create_member(&state, "member@co.com", org_id).await;

    start_individual_login(&app, "member@co.com").await;

    // Audit writes happen off the request path; give the listener a moment.
    let mut logged = false;
    for _ in 0..40 {
        let rows = state.store().audit_repo().recent(50).await.unwrap();
        logged = rows.iter().any(|r| {
            r.action == "user_login"
                && r.user_id == Some(member_id)
                && r.metadata.as_deref().is_some_and(|m| m.contains("individual"))
        });
        if logged {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    assert!(logged, "expected a user_login audit entry for the pending login");
}

#[tokio::test]
async fn failed_completion_leaves_the_request_approved() {
    use sea_orm::ConnectionTrait;

    let (state, app) = spawn_app().await;
    let (owner_access, _) = register_owner(&app, "alice@co.com", "Acme").await;
    let org_id = org_id_of(&app, &owner_access).await;
    create_member(&state, "member@co.com", org_id).await;

    let request_id = start_individual_login(&app, "member@co.com").await;
    let approve_uri = format!("/api/v1/auth/login-requests/{request_id}/approve");
    let response = request(&app, "PUT", &approve_uri, Some(&owner_access), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Sabotage the refresh-token write; the status flip must roll back
    // with it instead of spending the request without a session.
    state
        .store()
        .conn
        .execute_unprepared("ALTER TABLE refresh_tokens RENAME TO refresh_tokens_hidden")
        .await
        .unwrap();

    let complete_uri = format!("/api/v1/auth/login-requests/{request_id}/complete");
    let response = request(&app, "POST", &complete_uri, None, None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let status_uri = format!("/api/v1/auth/login-requests/{request_id}/status");
    let response = request(&app, "GET", &status_uri, None, None).await;
    assert_eq!(json_body(response).await["data"]["status"], "approved");

    // With the store healthy again the client can retry successfully.
    state
        .store()
        .conn
        .execute_unprepared("ALTER TABLE refresh_tokens_hidden RENAME TO refresh_tokens")
        .await
        .unwrap();

    let response = request(&app, "POST", &complete_uri, None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json_body(response).await["data"]["accessToken"].is_string());
}
