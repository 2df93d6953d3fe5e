//! Login-approval state machine for individual logins.
//!
//! ```text
//! pending --approve--> approved --complete (within grace)--> completed
//! pending --reject---> rejected                               [terminal]
//! pending --expiry (lazy, on read)--> expired                 [terminal]
//! approved --grace elapsed before complete--> expired         [terminal]
//! ```
//!
//! Every transition is a conditional update filtered on the current status,
//! so concurrent actors race at the store and exactly one wins; the loser
//! observes the committed state and fails cleanly.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::TransactionTrait;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

use crate::config::AuthConfig;
use crate::db::repositories::login_request::LoginRequestRepository;
use crate::db::{LoginRequestRow, PendingLoginRequest, Store, User};
use crate::domain::events::AuditEvent;
use crate::domain::{LoginRequestStatus, UserType};
use crate::services::audit;
use crate::services::auth_service::{AuthError, SessionResult};
use crate::services::token_issuer::TokenIssuer;

/// Read-model returned by status checks and approval actions.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequestSnapshot {
    pub id: String,
    pub status: LoginRequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl From<LoginRequestRow> for LoginRequestSnapshot {
    fn from(row: LoginRequestRow) -> Self {
        Self {
            id: row.id,
            status: row.status,
            rejection_reason: row.rejection_reason,
            expires_at: row.expires_at,
        }
    }
}

pub struct LoginApprovalService {
    store: Store,
    tokens: Arc<TokenIssuer>,
    request_ttl_seconds: u64,
    completion_grace_seconds: u64,
    event_bus: broadcast::Sender<AuditEvent>,
}

impl LoginApprovalService {
    pub fn new(
        store: Store,
        tokens: Arc<TokenIssuer>,
        auth: &AuthConfig,
        event_bus: broadcast::Sender<AuditEvent>,
    ) -> Self {
        Self {
            store,
            tokens,
            request_ttl_seconds: auth.login_request_ttl_seconds,
            completion_grace_seconds: auth.completion_grace_seconds,
            event_bus,
        }
    }

    /// Create a pending request for an individual login. No token is issued
    /// until an owner approves and the client completes.
    pub async fn create(
        &self,
        user_id: i32,
        organization_id: i32,
        device_fingerprint_id: Option<i32>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<LoginRequestRow, AuthError> {
        let expires_at = Utc::now()
            + Duration::seconds(i64::try_from(self.request_ttl_seconds).unwrap_or(i64::MAX));

        let request = self
            .store
            .login_request_repo()
            .create(
                user_id,
                organization_id,
                device_fingerprint_id,
                ip_address,
                user_agent,
                expires_at,
            )
            .await?;

        info!(request_id = %request.id, user_id, "Created login approval request");
        audit::publish(
            &self.event_bus,
            AuditEvent::LoginRequestCreated {
                request_id: request.id.clone(),
                user_id,
                organization_id,
            },
        );

        Ok(request)
    }

    /// Lazy expiry as a first-class operation: flip pending → expired when
    /// the deadline has passed. Idempotent; returns whether this call did
    /// the flip.
    pub async fn resolve_if_expired(&self, id: &str) -> Result<bool, AuthError> {
        self.store
            .expire_login_request_if_pending(id, Utc::now())
            .await
            .map_err(AuthError::from)
    }

    /// Status snapshot for polling clients. Runs lazy expiry first, so a
    /// request past its deadline always reads as expired.
    pub async fn check_status(&self, id: &str) -> Result<LoginRequestSnapshot, AuthError> {
        self.resolve_if_expired(id).await?;

        let row = self
            .store
            .get_login_request(id)
            .await?
            .ok_or(AuthError::RequestNotFound)?;

        Ok(LoginRequestSnapshot::from(row))
    }

    /// Load the request and verify the approver owns its organization.
    async fn load_for_approver(
        &self,
        id: &str,
        approver: &User,
    ) -> Result<LoginRequestRow, AuthError> {
        let row = self
            .store
            .get_login_request(id)
            .await?
            .ok_or(AuthError::RequestNotFound)?;

        if approver.organization_id != row.organization_id
            || approver.user_type != UserType::Owner
        {
            audit::publish(
                &self.event_bus,
                AuditEvent::SecurityError {
                    user_id: Some(approver.id),
                    organization_id: Some(row.organization_id),
                    reason: "login request access denied".to_string(),
                },
            );
            return Err(AuthError::AccessDenied);
        }

        Ok(row)
    }

    /// Approve a pending request. A request whose user has since been
    /// deactivated is still approvable; completion is where that fails.
    pub async fn approve(
        &self,
        id: &str,
        approver: &User,
    ) -> Result<LoginRequestSnapshot, AuthError> {
        let row = self.load_for_approver(id, approver).await?;

        self.resolve_if_expired(id).await?;

        let flipped = self
            .store
            .login_request_repo()
            .approve_if_pending(id, approver.id, Utc::now())
            .await?;
        if !flipped {
            return Err(AuthError::RequestAlreadyProcessed);
        }

        audit::publish(
            &self.event_bus,
            AuditEvent::LoginRequestApproved {
                request_id: id.to_string(),
                approved_by: approver.id,
                organization_id: row.organization_id,
            },
        );

        self.check_status(id).await
    }

    pub async fn reject(
        &self,
        id: &str,
        approver: &User,
        reason: Option<&str>,
    ) -> Result<LoginRequestSnapshot, AuthError> {
        let row = self.load_for_approver(id, approver).await?;

        self.resolve_if_expired(id).await?;

        let flipped = self
            .store
            .login_request_repo()
            .reject_if_pending(id, approver.id, reason, Utc::now())
            .await?;
        if !flipped {
            return Err(AuthError::RequestAlreadyProcessed);
        }

        audit::publish(
            &self.event_bus,
            AuditEvent::LoginRequestRejected {
                request_id: id.to_string(),
                rejected_by: approver.id,
                organization_id: row.organization_id,
            },
        );

        self.check_status(id).await
    }

    /// Complete an approved request: mint the session and mark the request
    /// completed. Not idempotent: a second call fails with not-found so a
    /// spent request can never re-issue tokens.
    pub async fn complete(&self, id: &str) -> Result<SessionResult, AuthError> {
        self.resolve_if_expired(id).await?;

        let row = self
            .store
            .get_login_request(id)
            .await?
            .ok_or(AuthError::RequestNotFound)?;

        match row.status {
            LoginRequestStatus::Approved => {}
            // Completion is only legal from approved; anything else reads
            // as not-found so a spent or never-approved id leaks nothing.
            _ => return Err(AuthError::RequestNotFound),
        }

        let now = Utc::now();
        let grace =
            Duration::seconds(i64::try_from(self.completion_grace_seconds).unwrap_or(i64::MAX));
        let approved_at = row.approved_at.ok_or(AuthError::RequestNotFound)?;
        if now > approved_at + grace {
            self.store
                .login_request_repo()
                .expire_if_approved(id, now)
                .await?;
            return Err(AuthError::RequestExpired);
        }

        let user = self
            .store
            .get_user_by_id(row.user_id)
            .await?
            .ok_or(AuthError::RequestNotFound)?;
        if !user.is_active {
            return Err(AuthError::AccessDenied);
        }

        // The status flip and the refresh-token write commit together. If
        // token persistence fails the request stays approved and the client
        // can retry within the grace window.
        let txn = self.store.conn.begin().await.map_err(AuthError::from)?;

        let flipped = LoginRequestRepository::complete_if_approved_on(&txn, id, now).await?;
        if !flipped {
            // Lost a race with a concurrent complete or expiry.
            return Err(AuthError::RequestNotFound);
        }

        let session = self
            .tokens
            .issue_on(&txn, row.user_id, Some(row.organization_id), row.device_fingerprint_id)
            .await?;

        txn.commit().await.map_err(AuthError::from)?;

        audit::publish(
            &self.event_bus,
            AuditEvent::LoginRequestCompleted {
                request_id: id.to_string(),
                user_id: row.user_id,
                organization_id: row.organization_id,
            },
        );

        Ok(session)
    }

    /// Pending requests for an organization's approval queue. Owner login
    /// attempts never appear here, only members'.
    pub async fn list_pending(
        &self,
        organization_id: i32,
    ) -> Result<Vec<PendingLoginRequest>, AuthError> {
        self.store
            .login_request_repo()
            .list_pending_members(organization_id)
            .await
            .map_err(AuthError::from)
    }
}
