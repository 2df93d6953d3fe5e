//! `SeaORM`-backed implementation of the authentication service.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::{FingerprintPayload, NewUser, Store};
use crate::domain::events::AuditEvent;
use crate::domain::{LoginType, UserType};
use crate::services::audit;
use crate::services::auth_service::{
    AuthError, AuthService, CurrentUser, LoginContext, LoginOutcome, RegistrationResult,
};
use crate::services::login_approval::LoginApprovalService;
use crate::services::token_issuer::TokenIssuer;

pub struct SeaOrmAuthService {
    store: Store,
    tokens: Arc<TokenIssuer>,
    approvals: Arc<LoginApprovalService>,
    security: SecurityConfig,
    event_bus: broadcast::Sender<AuditEvent>,
}

impl SeaOrmAuthService {
    pub fn new(
        store: Store,
        tokens: Arc<TokenIssuer>,
        approvals: Arc<LoginApprovalService>,
        security: SecurityConfig,
        event_bus: broadcast::Sender<AuditEvent>,
    ) -> Self {
        Self {
            store,
            tokens,
            approvals,
            security,
            event_bus,
        }
    }

    async fn record_attempt(
        &self,
        user_id: Option<i32>,
        email: &str,
        context: &LoginContext,
        success: bool,
        failure_reason: Option<&str>,
    ) {
        // Attempt history is best-effort bookkeeping; a failed insert must
        // not change the login outcome.
        if let Err(err) = self
            .store
            .login_attempt_repo()
            .record(
                user_id,
                email,
                context.ip_address.as_deref(),
                context.user_agent.as_deref(),
                success,
                failure_reason,
            )
            .await
        {
            warn!("Failed to record login attempt: {err}");
        }
    }

    fn security_event(&self, user_id: Option<i32>, organization_id: Option<i32>, reason: &str) {
        audit::publish(
            &self.event_bus,
            AuditEvent::SecurityError {
                user_id,
                organization_id,
                reason: reason.to_string(),
            },
        );
    }
}

/// Map a registration failure to a validation error when it is a unique
/// constraint violation. Pre-checks catch duplicates on the fast path, but
/// a concurrent registration can still lose the race at the insert.
fn map_registration_error(err: anyhow::Error) -> AuthError {
    let conflicts = |column: &str| {
        let needle = format!("UNIQUE constraint failed: {column}");
        err.chain().any(|cause| cause.to_string().contains(&needle))
    };

    if conflicts("users.email") {
        AuthError::Validation("Email already registered".into())
    } else if conflicts("organizations.slug") {
        AuthError::Validation("Organization name already taken".into())
    } else {
        AuthError::from(err)
    }
}

#[async_trait::async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        organization_name: &str,
    ) -> Result<RegistrationResult, AuthError> {
        let email = email.trim().to_lowercase();

        if self.store.user_repo().email_exists(&email).await? {
            return Err(AuthError::Validation("Email already registered".into()));
        }

        let org_repo = self.store.organization_repo();
        let slug = crate::db::repositories::organization::slugify(organization_name);
        if slug.is_empty() {
            return Err(AuthError::Validation("Organization name required".into()));
        }
        if org_repo.slug_exists(&slug).await? {
            return Err(AuthError::Validation(
                "Organization name already taken".into(),
            ));
        }

        let (organization, user) = self
            .store
            .register_owner(
                organization_name,
                &slug,
                NewUser {
                    email,
                    password: password.to_string(),
                    first_name: first_name.trim().to_string(),
                    last_name: last_name.trim().to_string(),
                    user_type: UserType::Owner,
                    organization_id: 0,
                },
                &self.security,
            )
            .await
            .map_err(map_registration_error)?;

        let session = self.tokens.issue(user.id, Some(organization.id), None).await?;

        info!(
            user_id = user.id,
            organization_id = organization.id,
            "Registered organization owner"
        );
        audit::publish(
            &self.event_bus,
            AuditEvent::UserRegistered {
                user_id: user.id,
                organization_id: organization.id,
            },
        );

        Ok(RegistrationResult {
            user,
            organization,
            session,
        })
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        login_type: LoginType,
        fingerprint: Option<FingerprintPayload>,
        context: LoginContext,
    ) -> Result<LoginOutcome, AuthError> {
        let email = email.trim().to_lowercase();
        let user_repo = self.store.user_repo();

        let Some((user, password_hash)) =
            user_repo.get_by_email_with_password(&email).await?
        else {
            // Unknown identifier is indistinguishable from a bad password.
            self.record_attempt(None, &email, &context, false, Some("unknown_email"))
                .await;
            self.security_event(None, None, "invalid credentials");
            return Err(AuthError::InvalidCredentials);
        };

        let now = Utc::now();
        if let Some(locked_until) = user.locked_until {
            if locked_until > now {
                self.record_attempt(Some(user.id), &email, &context, false, Some("locked"))
                    .await;
                self.security_event(
                    Some(user.id),
                    Some(user.organization_id),
                    "login attempt while locked",
                );
                return Err(AuthError::AccountLocked {
                    retry_after_seconds: (locked_until - now).num_seconds().max(1),
                });
            }
        }

        let password_ok = user_repo.verify_password(password_hash, password).await?;
        if !password_ok {
            let failures = user_repo
                .record_failed_attempt(
                    user.id,
                    self.security.max_failed_attempts,
                    self.security.lockout_seconds,
                )
                .await?;
            self.record_attempt(Some(user.id), &email, &context, false, Some("bad_password"))
                .await;

            if failures >= self.security.max_failed_attempts {
                warn!(user_id = user.id, failures, "Account locked after repeated failures");
                audit::publish(
                    &self.event_bus,
                    AuditEvent::AccountLocked {
                        user_id: user.id,
                        organization_id: user.organization_id,
                    },
                );
            } else {
                self.security_event(
                    Some(user.id),
                    Some(user.organization_id),
                    "invalid credentials",
                );
            }
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            self.record_attempt(Some(user.id), &email, &context, false, Some("inactive"))
                .await;
            self.security_event(
                Some(user.id),
                Some(user.organization_id),
                "login by deactivated user",
            );
            return Err(AuthError::AccessDenied);
        }

        user_repo.record_successful_login(user.id).await?;

        let fingerprint_id = match fingerprint {
            Some(payload) => Some(self.store.register_fingerprint(&payload).await?),
            None => None,
        };

        self.record_attempt(Some(user.id), &email, &context, true, None)
            .await;

        match login_type {
            LoginType::Organization => {
                let organization = self
                    .store
                    .get_organization(user.organization_id)
                    .await?
                    .ok_or(AuthError::AccessDenied)?;

                if user.user_type != UserType::Owner
                    || organization.owner_user_id != user.id
                    || !organization.is_active
                {
                    self.security_event(
                        Some(user.id),
                        Some(user.organization_id),
                        "organization login by non-owner",
                    );
                    return Err(AuthError::AccessDenied);
                }

                let session = self
                    .tokens
                    .issue(user.id, Some(organization.id), fingerprint_id)
                    .await?;

                audit::publish(
                    &self.event_bus,
                    AuditEvent::UserLogin {
                        user_id: user.id,
                        organization_id: organization.id,
                        login_type: "organization".to_string(),
                    },
                );

                Ok(LoginOutcome::Session(session))
            }
            LoginType::Individual => {
                let request = self
                    .approvals
                    .create(
                        user.id,
                        user.organization_id,
                        fingerprint_id,
                        context.ip_address.as_deref(),
                        context.user_agent.as_deref(),
                    )
                    .await?;

                // Credentials checked out even though no session exists yet;
                // the login entry lands here, not at completion.
                audit::publish(
                    &self.event_bus,
                    AuditEvent::UserLogin {
                        user_id: user.id,
                        organization_id: user.organization_id,
                        login_type: "individual".to_string(),
                    },
                );

                Ok(LoginOutcome::PendingApproval {
                    request_id: request.id,
                })
            }
        }
    }

    async fn logout(&self, user_id: i32, refresh_token: Option<&str>) -> Result<(), AuthError> {
        if let Some(token) = refresh_token {
            self.tokens.revoke(token).await?;
        }

        let organization_id = self
            .store
            .get_user_by_id(user_id)
            .await?
            .map(|u| u.organization_id);

        audit::publish(
            &self.event_bus,
            AuditEvent::UserLogout {
                user_id,
                organization_id,
            },
        );

        Ok(())
    }

    async fn current_user(&self, user_id: i32) -> Result<CurrentUser, AuthError> {
        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let organization = self.store.get_organization(user.organization_id).await?;
        let access = self.store.load_user_access(user_id).await?;

        let roles = access.roles.iter().map(|g| g.role.clone()).collect();
        let permissions = crate::services::permission::flatten(&access)
            .into_iter()
            .collect();

        Ok(CurrentUser {
            user,
            organization,
            roles,
            permissions,
        })
    }
}
