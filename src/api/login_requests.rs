use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::AuthContext;
use super::{ApiError, ApiResponse, AppState, LoginRequestStatusDto, PendingLoginRequestDto, SessionDto};
use crate::domain::UserType;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    pub reason: Option<String>,
}

/// Owner-only actions double-check the caller's type here so a member with
/// a valid token gets 403 before the service looks at the request row.
fn require_owner(ctx: &AuthContext) -> Result<(), ApiError> {
    if ctx.user.user_type == UserType::Owner {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Owner access required".to_string()))
    }
}

/// GET /auth/login-requests/{id}/status
/// Polling endpoint for the waiting client. Public: the client holds no
/// token yet, possession of the uuid is the capability.
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<LoginRequestStatusDto>>, ApiError> {
    let snapshot = state.approvals().check_status(&id).await?;
    Ok(Json(ApiResponse::success(LoginRequestStatusDto::from(
        snapshot,
    ))))
}

/// PUT /auth/login-requests/{id}/approve
pub async fn approve(
    State(state): State<Arc<AppState>>,
    axum::Extension(ctx): axum::Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<LoginRequestStatusDto>>, ApiError> {
    require_owner(&ctx)?;

    let snapshot = state.approvals().approve(&id, &ctx.user).await?;
    Ok(Json(ApiResponse::success(LoginRequestStatusDto::from(
        snapshot,
    ))))
}

/// PUT /auth/login-requests/{id}/reject
pub async fn reject(
    State(state): State<Arc<AppState>>,
    axum::Extension(ctx): axum::Extension<AuthContext>,
    Path(id): Path<String>,
    payload: Option<Json<RejectRequest>>,
) -> Result<Json<ApiResponse<LoginRequestStatusDto>>, ApiError> {
    require_owner(&ctx)?;

    let reason = payload.and_then(|Json(body)| body.reason);
    let snapshot = state
        .approvals()
        .reject(&id, &ctx.user, reason.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(LoginRequestStatusDto::from(
        snapshot,
    ))))
}

/// GET /auth/login-requests/pending
/// The owner's approval queue; member requests only.
pub async fn pending(
    State(state): State<Arc<AppState>>,
    axum::Extension(ctx): axum::Extension<AuthContext>,
) -> Result<Json<ApiResponse<Vec<PendingLoginRequestDto>>>, ApiError> {
    require_owner(&ctx)?;

    let requests = state
        .approvals()
        .list_pending(ctx.user.organization_id)
        .await?;

    Ok(Json(ApiResponse::success(
        requests.into_iter().map(PendingLoginRequestDto::from).collect(),
    )))
}

/// POST /auth/login-requests/{id}/complete
/// Exchange an approved request for a session. One shot: a completed
/// request reads as not-found afterwards.
pub async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SessionDto>>, ApiError> {
    let session = state.approvals().complete(&id).await?;
    Ok(Json(ApiResponse::success(SessionDto::from(session))))
}
