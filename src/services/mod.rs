pub mod audit;
pub mod auth_service;
pub mod auth_service_impl;
pub mod login_approval;
pub mod permission;
pub mod token_issuer;

pub use audit::AuditService;
pub use auth_service::{
    AuthError, AuthService, CurrentUser, LoginContext, LoginOutcome, RegistrationResult,
    SessionResult,
};
pub use auth_service_impl::SeaOrmAuthService;
pub use login_approval::{LoginApprovalService, LoginRequestSnapshot};
pub use token_issuer::TokenIssuer;
