use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement, TransactionTrait,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::device_fingerprint::FingerprintPayload;
pub use repositories::login_request::{LoginRequestRow, PendingLoginRequest};
pub use repositories::organization::Organization;
pub use repositories::role::{RoleGrant, UserAccess};
pub use repositories::user::{NewUser, User};

use crate::config::SecurityConfig;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains("memory");
        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Every pooled connection to an in-memory sqlite db sees a distinct
        // database; pin the pool to one connection there.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn organization_repo(&self) -> repositories::organization::OrganizationRepository {
        repositories::organization::OrganizationRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn role_repo(&self) -> repositories::role::RoleRepository {
        repositories::role::RoleRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn fingerprint_repo(&self) -> repositories::device_fingerprint::DeviceFingerprintRepository
    {
        repositories::device_fingerprint::DeviceFingerprintRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn login_attempt_repo(&self) -> repositories::login_attempt::LoginAttemptRepository {
        repositories::login_attempt::LoginAttemptRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn refresh_token_repo(&self) -> repositories::refresh_token::RefreshTokenRepository {
        repositories::refresh_token::RefreshTokenRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn login_request_repo(&self) -> repositories::login_request::LoginRequestRepository {
        repositories::login_request::LoginRequestRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn audit_repo(&self) -> repositories::audit::AuditRepository {
        repositories::audit::AuditRepository::new(self.conn.clone())
    }

    // ========== Convenience delegations ==========

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn create_user(&self, new_user: NewUser, config: &SecurityConfig) -> Result<User> {
        self.user_repo().create(new_user, config).await
    }

    /// Create an organization and its owner account atomically: the org row,
    /// the user row, the owner backreference, and the role grant either all
    /// commit or none do. The password is hashed before the transaction
    /// opens. The `organization_id` on `new_user` is ignored.
    pub async fn register_owner(
        &self,
        organization_name: &str,
        slug: &str,
        mut new_user: NewUser,
        config: &SecurityConfig,
    ) -> Result<(Organization, User)> {
        use repositories::organization::OrganizationRepository;
        use repositories::role::RoleRepository;
        use repositories::user::UserRepository;

        let password_hash =
            UserRepository::hash_new_password(&new_user.password, config).await?;

        let txn = self.conn.begin().await?;

        let mut organization =
            OrganizationRepository::create_on(&txn, organization_name, slug).await?;
        new_user.organization_id = organization.id;
        let user = UserRepository::insert_on(&txn, new_user, password_hash).await?;
        OrganizationRepository::set_owner_on(&txn, organization.id, user.id).await?;
        RoleRepository::assign_role_on(&txn, user.id, "org_owner").await?;

        txn.commit().await?;

        organization.owner_user_id = user.id;
        Ok((organization, user))
    }

    pub async fn get_organization(&self, id: i32) -> Result<Option<Organization>> {
        self.organization_repo().get_by_id(id).await
    }

    pub async fn load_user_access(&self, user_id: i32) -> Result<UserAccess> {
        self.role_repo().load_user_access(user_id).await
    }

    pub async fn register_fingerprint(&self, payload: &FingerprintPayload) -> Result<i32> {
        self.fingerprint_repo().get_or_create(payload).await
    }

    pub async fn get_login_request(&self, id: &str) -> Result<Option<LoginRequestRow>> {
        self.login_request_repo().get(id).await
    }

    pub async fn expire_login_request_if_pending(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.login_request_repo().expire_if_pending(id, now).await
    }

    pub async fn append_audit_log(
        &self,
        organization_id: Option<i32>,
        user_id: Option<i32>,
        action: &str,
        severity: &str,
        metadata: Option<String>,
    ) -> Result<()> {
        self.audit_repo()
            .append(organization_id, user_id, action, severity, metadata)
            .await
    }
}
