//! Domain service for authentication.
//!
//! Covers registration, credential verification with progressive lockout,
//! and the split between direct organization logins and approval-gated
//! individual logins.

use serde::Serialize;
use thiserror::Error;

use crate::db::{Organization, User};

/// Errors surfaced by the authentication pipeline. The HTTP layer maps
/// these onto status codes; messages stay generic so the API never reveals
/// whether an identifier exists.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account locked")]
    AccountLocked {
        /// Seconds until the lock expires. Lockout state is not a secret.
        retry_after_seconds: i64,
    },

    #[error("Access denied")]
    AccessDenied,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Login request not found")]
    RequestNotFound,

    #[error("Login request already processed")]
    RequestAlreadyProcessed,

    #[error("Login request expired")]
    RequestExpired,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A minted access/refresh token pair.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResult {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Outcome of a login attempt: a session for organization logins, or a
/// pollable request id for approval-gated individual logins.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Session(SessionResult),
    PendingApproval { request_id: String },
}

#[derive(Debug, Clone)]
pub struct RegistrationResult {
    pub user: User,
    pub organization: Organization,
    pub session: SessionResult,
}

/// Everything the `/auth/me` endpoint needs, loaded in one pass.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub organization: Option<Organization>,
    pub roles: Vec<String>,
    pub permissions: Vec<(String, String)>,
}

/// Inputs a login attempt carries besides the credentials.
#[derive(Debug, Clone, Default)]
pub struct LoginContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new organization with its owner user and issue a session.
    async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        organization_name: &str,
    ) -> Result<RegistrationResult, AuthError>;

    /// Verify credentials and either issue a session (organization login)
    /// or create a pending approval request (individual login).
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] on unknown identifier or password
    /// mismatch, [`AuthError::AccountLocked`] while a lockout window is
    /// open, [`AuthError::AccessDenied`] when an organization login is
    /// attempted by a non-owner.
    async fn login(
        &self,
        email: &str,
        password: &str,
        login_type: crate::domain::LoginType,
        fingerprint: Option<crate::db::FingerprintPayload>,
        context: LoginContext,
    ) -> Result<LoginOutcome, AuthError>;

    /// Revoke the presented refresh token (idempotent) and audit the logout.
    async fn logout(&self, user_id: i32, refresh_token: Option<&str>) -> Result<(), AuthError>;

    /// Load the current user with organization and flattened access.
    async fn current_user(&self, user_id: i32) -> Result<CurrentUser, AuthError>;
}
