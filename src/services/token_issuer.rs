//! Token issuance and rotation.
//!
//! Access tokens are stateless JWTs. Refresh tokens are also JWTs (so their
//! signature and `typ` claim can be checked before touching the store) but
//! only their SHA-256 hash is persisted, and each one is single-use: a
//! successful refresh deactivates the presented token before minting the
//! replacement pair.

use chrono::{Duration, Utc};
use sea_orm::ConnectionTrait;
use tokio::sync::broadcast;
use tracing::warn;

use crate::auth::jwt::{self, JwtError, TokenKind};
use crate::auth::token::hash_token;
use crate::config::AuthConfig;
use crate::db::Store;
use crate::db::repositories::refresh_token::RefreshTokenRepository;
use crate::domain::events::AuditEvent;
use crate::services::audit;
use crate::services::auth_service::{AuthError, SessionResult};

pub struct TokenIssuer {
    store: Store,
    jwt_secret: String,
    access_ttl_seconds: u64,
    refresh_ttl_seconds: u64,
    event_bus: broadcast::Sender<AuditEvent>,
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => Self::TokenExpired,
            JwtError::Invalid | JwtError::WrongKind => Self::InvalidToken,
        }
    }
}

impl TokenIssuer {
    pub fn new(store: Store, auth: &AuthConfig, event_bus: broadcast::Sender<AuditEvent>) -> Self {
        Self {
            store,
            jwt_secret: auth.jwt_secret.clone(),
            access_ttl_seconds: auth.access_token_ttl_seconds,
            refresh_ttl_seconds: auth.refresh_token_ttl_seconds,
            event_bus,
        }
    }

    /// Mint an access/refresh pair and persist the refresh token's hash.
    pub async fn issue(
        &self,
        user_id: i32,
        organization_id: Option<i32>,
        device_fingerprint_id: Option<i32>,
    ) -> Result<SessionResult, AuthError> {
        self.issue_on(&self.store.conn, user_id, organization_id, device_fingerprint_id)
            .await
    }

    /// Connection-generic issuance, so a caller can persist the refresh
    /// token inside its own transaction alongside other writes.
    pub async fn issue_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i32,
        organization_id: Option<i32>,
        device_fingerprint_id: Option<i32>,
    ) -> Result<SessionResult, AuthError> {
        let access_token = jwt::create_token(
            user_id,
            organization_id,
            TokenKind::Access,
            &self.jwt_secret,
            self.access_ttl_seconds,
        )?;
        let refresh_token = jwt::create_token(
            user_id,
            organization_id,
            TokenKind::Refresh,
            &self.jwt_secret,
            self.refresh_ttl_seconds,
        )?;

        let expires_at = Utc::now()
            + Duration::seconds(i64::try_from(self.refresh_ttl_seconds).unwrap_or(i64::MAX));
        RefreshTokenRepository::create_on(
            conn,
            user_id,
            &hash_token(&refresh_token),
            device_fingerprint_id,
            expires_at,
        )
        .await
        .map_err(AuthError::from)?;

        Ok(SessionResult {
            access_token,
            refresh_token,
            expires_in: self.access_ttl_seconds,
        })
    }

    /// Rotate a refresh token: verify it, consume it, issue a new pair.
    ///
    /// The consume step is a conditional write on the active flag, so a
    /// token replayed concurrently wins at most once; every other caller
    /// gets [`AuthError::InvalidToken`].
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionResult, AuthError> {
        let claims = jwt::verify_token(refresh_token, &self.jwt_secret, TokenKind::Refresh)?;
        let user_id = claims.user_id()?;

        let hash = hash_token(refresh_token);
        let repo = self.store.refresh_token_repo();

        let row = repo
            .find_by_hash(&hash)
            .await
            .map_err(AuthError::from)?
            .ok_or(AuthError::InvalidToken)?;

        if !row.is_active {
            // A previously rotated token coming back means either the client
            // or a thief holds a stale copy, and there is no telling which.
            // Invalidate the user's whole token family.
            warn!(user_id, "Replay of rotated refresh token, revoking all sessions");
            let revoked = self.revoke_all(user_id).await?;
            audit::publish(
                &self.event_bus,
                AuditEvent::SecurityError {
                    user_id: Some(user_id),
                    organization_id: claims.org,
                    reason: format!("refresh token replay, {revoked} sessions revoked"),
                },
            );
            return Err(AuthError::InvalidToken);
        }
        if row.expires_at <= Utc::now() {
            return Err(AuthError::TokenExpired);
        }

        // Single-use: consume before minting. Losing this race means the
        // token was spent by a concurrent request.
        let consumed = repo.deactivate_by_hash(&hash).await.map_err(AuthError::from)?;
        if !consumed {
            return Err(AuthError::InvalidToken);
        }

        let user = self
            .store
            .get_user_by_id(user_id)
            .await
            .map_err(AuthError::from)?
            .ok_or(AuthError::InvalidToken)?;
        if !user.is_active {
            return Err(AuthError::AccessDenied);
        }

        let session = self
            .issue(user_id, claims.org, row.device_fingerprint_id)
            .await?;

        audit::publish(&self.event_bus, AuditEvent::TokenRefreshed { user_id });

        Ok(session)
    }

    /// Revoke a single refresh token. Idempotent.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        let hash = hash_token(refresh_token);
        self.store
            .refresh_token_repo()
            .deactivate_by_hash(&hash)
            .await
            .map_err(AuthError::from)?;
        Ok(())
    }

    /// Revoke every active refresh token a user holds.
    pub async fn revoke_all(&self, user_id: i32) -> Result<u64, AuthError> {
        self.store
            .refresh_token_repo()
            .deactivate_all_for_user(user_id)
            .await
            .map_err(AuthError::from)
    }
}
