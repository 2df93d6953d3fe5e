pub mod prelude;

pub mod audit_logs;
pub mod device_fingerprints;
pub mod login_attempts;
pub mod login_requests;
pub mod organizations;
pub mod permissions;
pub mod refresh_tokens;
pub mod role_permissions;
pub mod roles;
pub mod user_roles;
pub mod users;
