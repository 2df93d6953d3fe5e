use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{Organization, PendingLoginRequest, User};
use crate::domain::LoginRequestStatus;
use crate::services::{LoginRequestSnapshot, SessionResult};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: String,
    pub organization_id: i32,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            user_type: user.user_type.as_str().to_string(),
            organization_id: user.organization_id,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationDto {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub subscription_tier: String,
    pub is_active: bool,
}

impl From<Organization> for OrganizationDto {
    fn from(org: Organization) -> Self {
        Self {
            id: org.id,
            name: org.name,
            slug: org.slug,
            subscription_tier: org.subscription_tier,
            is_active: org.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

impl From<SessionResult> for SessionDto {
    fn from(session: SessionResult) -> Self {
        Self {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_in: session.expires_in,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDto {
    pub user: UserDto,
    pub organization: OrganizationDto,
    #[serde(flatten)]
    pub session: SessionDto,
}

/// Login either yields a session or, for approval-gated logins, a request
/// id the client polls.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LoginResponseDto {
    Session(SessionDto),
    #[serde(rename_all = "camelCase")]
    Pending { request_id: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequestStatusDto {
    pub id: String,
    pub status: LoginRequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl From<LoginRequestSnapshot> for LoginRequestStatusDto {
    fn from(snapshot: LoginRequestSnapshot) -> Self {
        Self {
            id: snapshot.id,
            status: snapshot.status,
            rejection_reason: snapshot.rejection_reason,
            expires_at: snapshot.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingLoginRequestDto {
    pub id: String,
    pub user_email: String,
    pub user_first_name: String,
    pub user_last_name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<PendingLoginRequest> for PendingLoginRequestDto {
    fn from(pending: PendingLoginRequest) -> Self {
        Self {
            id: pending.request.id,
            user_email: pending.user_email,
            user_first_name: pending.user_first_name,
            user_last_name: pending.user_last_name,
            created_at: pending.request.created_at,
            expires_at: pending.request.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeDto {
    pub user: UserDto,
    pub organization: Option<OrganizationDto>,
    pub roles: Vec<String>,
    pub permissions: Vec<PermissionDto>,
}

#[derive(Debug, Serialize)]
pub struct PermissionDto {
    pub resource: String,
    pub action: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: String,
    pub uptime: u64,
    pub database_ok: bool,
}
