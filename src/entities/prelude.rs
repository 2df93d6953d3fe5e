pub use super::audit_logs::Entity as AuditLogs;
pub use super::device_fingerprints::Entity as DeviceFingerprints;
pub use super::login_attempts::Entity as LoginAttempts;
pub use super::login_requests::Entity as LoginRequests;
pub use super::organizations::Entity as Organizations;
pub use super::permissions::Entity as Permissions;
pub use super::refresh_tokens::Entity as RefreshTokens;
pub use super::role_permissions::Entity as RolePermissions;
pub use super::roles::Entity as Roles;
pub use super::user_roles::Entity as UserRoles;
pub use super::users::Entity as Users;
