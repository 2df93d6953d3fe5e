use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{
    validate_email, validate_organization_name, validate_password, validate_person_name,
};
use super::{
    ApiError, ApiResponse, AppState, LoginResponseDto, MeDto, OrganizationDto, PermissionDto,
    RegistrationDto, SessionDto, UserDto,
};
use crate::auth::jwt::{self, TokenKind};
use crate::db::{FingerprintPayload, User};
use crate::domain::LoginType;
use crate::services::{LoginContext, LoginOutcome};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub organization_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default = "default_login_type")]
    pub login_type: LoginType,
    pub device_fingerprint: Option<FingerprintPayload>,
}

const fn default_login_type() -> LoginType {
    LoginType::Organization
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Authenticated caller, injected as a request extension by the bearer
/// middleware. Handlers receive it explicitly; there is no ambient
/// current-user state.
#[derive(Clone)]
pub struct AuthContext {
    pub user: User,
}

/// Bearer middleware: verifies the access token statelessly, loads the
/// user row, and attaches an [`AuthContext`] to the request.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_bearer_token(&headers) else {
        return Err(ApiError::unauthorized("Missing bearer token"));
    };

    let jwt_secret = state.config().read().await.auth.jwt_secret.clone();
    let claims = jwt::verify_token(&token, &jwt_secret, TokenKind::Access)
        .map_err(crate::services::AuthError::from)?;
    let user_id = claims
        .user_id()
        .map_err(crate::services::AuthError::from)?;

    let user = state
        .store()
        .get_user_by_id(user_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?
        .ok_or_else(|| ApiError::unauthorized("Invalid token"))?;

    if !user.is_active {
        return Err(ApiError::Forbidden("Account deactivated".to_string()));
    }

    tracing::Span::current().record("user_id", user.id);

    request.extensions_mut().insert(AuthContext { user });
    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get("Authorization")?;
    let auth_str = auth_header.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?;
    Some(token.trim().to_string())
}

fn login_context(headers: &HeaderMap) -> LoginContext {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());

    let user_agent = headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(ToString::to_string);

    LoginContext {
        ip_address,
        user_agent,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
/// Create an organization with its owner user and issue a session.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = validate_email(&payload.email)?;
    validate_password(&payload.password)?;
    let first_name = validate_person_name(&payload.first_name, "First name")?;
    let last_name = validate_person_name(&payload.last_name, "Last name")?;
    let organization_name = validate_organization_name(&payload.organization_name)?;

    let result = state
        .auth_service()
        .register(
            email,
            &payload.password,
            first_name,
            last_name,
            organization_name,
        )
        .await?;

    let body = ApiResponse::success(RegistrationDto {
        user: UserDto::from(result.user),
        organization: OrganizationDto::from(result.organization),
        session: SessionDto::from(result.session),
    });

    Ok((StatusCode::CREATED, Json(body)))
}

/// POST /auth/login
/// Verify credentials; organization logins get a session, individual
/// logins get a pollable request id.
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponseDto>>, ApiError> {
    let email = validate_email(&payload.email)?;
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let outcome = state
        .auth_service()
        .login(
            email,
            &payload.password,
            payload.login_type,
            payload.device_fingerprint,
            login_context(&headers),
        )
        .await?;

    let dto = match outcome {
        LoginOutcome::Session(session) => LoginResponseDto::Session(SessionDto::from(session)),
        LoginOutcome::PendingApproval { request_id } => LoginResponseDto::Pending { request_id },
    };

    Ok(Json(ApiResponse::success(dto)))
}

/// POST /auth/refresh
/// Exchange a refresh token for a new pair. The presented token is
/// consumed; replaying it fails.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<SessionDto>>, ApiError> {
    if payload.refresh_token.is_empty() {
        return Err(ApiError::validation("Refresh token is required"));
    }

    let session = state.tokens().refresh(&payload.refresh_token).await?;

    Ok(Json(ApiResponse::success(SessionDto::from(session))))
}

/// POST /auth/logout
/// Revoke the presented refresh token. Idempotent.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    axum::Extension(ctx): axum::Extension<AuthContext>,
    payload: Option<Json<LogoutRequest>>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let refresh_token = payload.and_then(|Json(body)| body.refresh_token);

    state
        .auth_service()
        .logout(ctx.user.id, refresh_token.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(())))
}

/// GET /auth/me
/// Current user with organization and flattened roles/permissions.
pub async fn me(
    State(state): State<Arc<AppState>>,
    axum::Extension(ctx): axum::Extension<AuthContext>,
) -> Result<Json<ApiResponse<MeDto>>, ApiError> {
    let current = state.auth_service().current_user(ctx.user.id).await?;

    let mut permissions: Vec<PermissionDto> = current
        .permissions
        .into_iter()
        .map(|(resource, action)| PermissionDto { resource, action })
        .collect();
    permissions.sort_by(|a, b| (&a.resource, &a.action).cmp(&(&b.resource, &b.action)));

    Ok(Json(ApiResponse::success(MeDto {
        user: UserDto::from(current.user),
        organization: current.organization.map(OrganizationDto::from),
        roles: current.roles,
        permissions,
    })))
}
