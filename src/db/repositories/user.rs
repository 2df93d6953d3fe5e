use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set,
};
use tokio::task;

use crate::auth::password;
use crate::config::SecurityConfig;
use crate::domain::UserType;
use crate::entities::users;

/// User data returned from the repository (without the password hash).
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
    pub organization_id: i32,
    pub is_active: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            user_type: UserType::parse(&model.user_type).unwrap_or(UserType::Member),
            organization_id: model.organization_id,
            is_active: model.is_active,
            failed_login_attempts: model.failed_login_attempts,
            locked_until: model.locked_until,
            last_login_at: model.last_login_at,
            created_at: model.created_at,
        }
    }
}

pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
    pub organization_id: i32,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by id")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    /// Get user by email together with the stored password hash. Only the
    /// credential verifier needs the hash.
    pub async fn get_by_email_with_password(&self, email: &str) -> Result<Option<(User, String)>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    /// Create a user with a freshly hashed password.
    /// Note: Argon2 hashing is CPU-intensive and runs in `spawn_blocking`
    /// so it does not stall the async runtime.
    pub async fn create(&self, new_user: NewUser, config: &SecurityConfig) -> Result<User> {
        let password_hash = Self::hash_new_password(&new_user.password, config).await?;
        Self::insert_on(&self.conn, new_user, password_hash).await
    }

    /// Hash a candidate password off the async runtime. Split from the
    /// insert so transactional callers can hash before opening the
    /// transaction instead of holding it across the Argon2 work.
    pub async fn hash_new_password(password: &str, config: &SecurityConfig) -> Result<String> {
        let config = config.clone();
        let pw = password.to_string();
        task::spawn_blocking(move || password::hash_password(&pw, Some(&config)))
            .await
            .context("Password hashing task panicked")?
    }

    /// Insert a user row with a precomputed password hash.
    pub async fn insert_on<C: ConnectionTrait>(
        conn: &C,
        new_user: NewUser,
        password_hash: String,
    ) -> Result<User> {
        let now = Utc::now();

        let model = users::ActiveModel {
            email: Set(new_user.email),
            password_hash: Set(password_hash),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            user_type: Set(new_user.user_type.as_str().to_string()),
            organization_id: Set(new_user.organization_id),
            is_active: Set(true),
            failed_login_attempts: Set(0),
            locked_until: Set(None),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = model
            .insert(conn)
            .await
            .context("Failed to insert user")?;

        Ok(User::from(inserted))
    }

    /// Verify a password against the stored hash.
    pub async fn verify_password(&self, password_hash: String, candidate: &str) -> Result<bool> {
        let candidate = candidate.to_string();

        task::spawn_blocking(move || password::verify_password(&candidate, &password_hash))
            .await
            .context("Password verification task panicked")?
    }

    /// Atomically bump the failure counter, then assign the lock timestamp
    /// with a second conditional write guarded on the counter and on no
    /// active lock being present. Concurrent failures cannot each slip
    /// past the threshold or extend a live lock; an expired lock is
    /// replaced once the counter is at the threshold again.
    ///
    /// Returns the counter value after the increment.
    pub async fn record_failed_attempt(
        &self,
        user_id: i32,
        max_attempts: i32,
        lockout_seconds: u64,
    ) -> Result<i32> {
        let now = Utc::now();

        users::Entity::update_many()
            .col_expr(
                users::Column::FailedLoginAttempts,
                Expr::col(users::Column::FailedLoginAttempts).add(1),
            )
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to increment failure counter")?;

        let locked_until = now + Duration::seconds(i64::try_from(lockout_seconds).unwrap_or(0));

        users::Entity::update_many()
            .col_expr(users::Column::LockedUntil, Expr::value(locked_until))
            .filter(users::Column::Id.eq(user_id))
            .filter(
                Condition::any()
                    .add(users::Column::LockedUntil.is_null())
                    .add(users::Column::LockedUntil.lt(now)),
            )
            .filter(users::Column::FailedLoginAttempts.gte(max_attempts))
            .exec(&self.conn)
            .await
            .context("Failed to apply lockout")?;

        let count = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await?
            .map_or(0, |u| u.failed_login_attempts);

        Ok(count)
    }

    /// Reset the failure counter and lock after a successful login, and
    /// stamp the login time.
    pub async fn record_successful_login(&self, user_id: i32) -> Result<()> {
        let now = Utc::now();

        users::Entity::update_many()
            .col_expr(users::Column::FailedLoginAttempts, Expr::value(0))
            .col_expr(
                users::Column::LockedUntil,
                Expr::value(None::<DateTime<Utc>>),
            )
            .col_expr(users::Column::LastLoginAt, Expr::value(now))
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to reset failure counter")?;

        Ok(())
    }

    /// Activate or deactivate an account. Deactivated users can no longer
    /// complete login requests.
    pub async fn set_active(&self, user_id: i32, is_active: bool) -> Result<()> {
        users::Entity::update_many()
            .col_expr(users::Column::IsActive, Expr::value(is_active))
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to update user active flag")?;

        Ok(())
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .count(&self.conn)
            .await
            .context("Failed to count users by email")?;

        Ok(count > 0)
    }
}
