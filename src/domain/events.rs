//! Security audit events.
//!
//! Events are published on the broadcast bus and persisted off the request
//! path by the audit listener. Publishing never blocks or fails the caller.

use serde::Serialize;

use super::Severity;

/// A security-relevant event destined for the audit log.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum AuditEvent {
    UserLogin {
        user_id: i32,
        organization_id: i32,
        login_type: String,
    },
    UserRegistered {
        user_id: i32,
        organization_id: i32,
    },
    UserLogout {
        user_id: i32,
        organization_id: Option<i32>,
    },
    SecurityError {
        user_id: Option<i32>,
        organization_id: Option<i32>,
        reason: String,
    },
    AccountLocked {
        user_id: i32,
        organization_id: i32,
    },
    TokenRefreshed {
        user_id: i32,
    },
    LoginRequestCreated {
        request_id: String,
        user_id: i32,
        organization_id: i32,
    },
    LoginRequestApproved {
        request_id: String,
        approved_by: i32,
        organization_id: i32,
    },
    LoginRequestRejected {
        request_id: String,
        rejected_by: i32,
        organization_id: i32,
    },
    LoginRequestCompleted {
        request_id: String,
        user_id: i32,
        organization_id: i32,
    },
}

impl AuditEvent {
    /// Stable action name stored in the `audit_logs.action` column.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::UserLogin { .. } => "user_login",
            Self::UserRegistered { .. } => "user_registered",
            Self::UserLogout { .. } => "user_logout",
            Self::SecurityError { .. } => "security_error",
            Self::AccountLocked { .. } => "account_locked",
            Self::TokenRefreshed { .. } => "token_refreshed",
            Self::LoginRequestCreated { .. } => "login_request_created",
            Self::LoginRequestApproved { .. } => "login_request_approved",
            Self::LoginRequestRejected { .. } => "login_request_rejected",
            Self::LoginRequestCompleted { .. } => "login_request_completed",
        }
    }

    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::UserLogin { .. }
            | Self::UserRegistered { .. }
            | Self::UserLogout { .. }
            | Self::TokenRefreshed { .. }
            | Self::LoginRequestCreated { .. }
            | Self::LoginRequestCompleted { .. } => Severity::Low,
            Self::LoginRequestApproved { .. } | Self::LoginRequestRejected { .. } => {
                Severity::Medium
            }
            Self::SecurityError { .. } => Severity::High,
            Self::AccountLocked { .. } => Severity::Critical,
        }
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<i32> {
        match self {
            Self::UserLogin { user_id, .. }
            | Self::UserRegistered { user_id, .. }
            | Self::UserLogout { user_id, .. }
            | Self::AccountLocked { user_id, .. }
            | Self::TokenRefreshed { user_id }
            | Self::LoginRequestCreated { user_id, .. }
            | Self::LoginRequestCompleted { user_id, .. } => Some(*user_id),
            Self::SecurityError { user_id, .. } => *user_id,
            Self::LoginRequestApproved { approved_by, .. } => Some(*approved_by),
            Self::LoginRequestRejected { rejected_by, .. } => Some(*rejected_by),
        }
    }

    #[must_use]
    pub const fn organization_id(&self) -> Option<i32> {
        match self {
            Self::UserLogin {
                organization_id, ..
            }
            | Self::UserRegistered {
                organization_id, ..
            }
            | Self::AccountLocked {
                organization_id, ..
            }
            | Self::LoginRequestCreated {
                organization_id, ..
            }
            | Self::LoginRequestApproved {
                organization_id, ..
            }
            | Self::LoginRequestRejected {
                organization_id, ..
            }
            | Self::LoginRequestCompleted {
                organization_id, ..
            } => Some(*organization_id),
            Self::UserLogout {
                organization_id, ..
            }
            | Self::SecurityError {
                organization_id, ..
            } => *organization_id,
            Self::TokenRefreshed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_errors_are_at_least_high() {
        let e = AuditEvent::SecurityError {
            user_id: None,
            organization_id: None,
            reason: "invalid credentials".to_string(),
        };
        assert!(e.severity() >= Severity::High);
    }

    #[test]
    fn actions_are_stable() {
        let e = AuditEvent::UserLogin {
            user_id: 1,
            organization_id: 1,
            login_type: "organization".to_string(),
        };
        assert_eq!(e.action(), "user_login");
        assert_eq!(e.severity(), Severity::Low);
        assert_eq!(e.user_id(), Some(1));
        assert_eq!(e.organization_id(), Some(1));
    }
}
