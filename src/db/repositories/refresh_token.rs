use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};

use crate::entities::refresh_tokens;

#[derive(Debug, Clone)]
pub struct RefreshTokenRow {
    pub id: i32,
    pub user_id: i32,
    pub device_fingerprint_id: Option<i32>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<refresh_tokens::Model> for RefreshTokenRow {
    fn from(model: refresh_tokens::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            device_fingerprint_id: model.device_fingerprint_id,
            expires_at: model.expires_at,
            is_active: model.is_active,
        }
    }
}

pub struct RefreshTokenRepository {
    conn: DatabaseConnection,
}

impl RefreshTokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Persist the hash of a freshly issued refresh token. The raw value
    /// goes to the client only. Connection-generic so completion can write
    /// it inside the status-flip transaction.
    pub async fn create_on<C: ConnectionTrait>(
        conn: &C,
        user_id: i32,
        token_hash: &str,
        device_fingerprint_id: Option<i32>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let model = refresh_tokens::ActiveModel {
            user_id: Set(user_id),
            token_hash: Set(token_hash.to_string()),
            device_fingerprint_id: Set(device_fingerprint_id),
            expires_at: Set(expires_at),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        model
            .insert(conn)
            .await
            .context("Failed to insert refresh token")?;

        Ok(())
    }

    pub async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshTokenRow>> {
        let row = refresh_tokens::Entity::find()
            .filter(refresh_tokens::Column::TokenHash.eq(token_hash))
            .one(&self.conn)
            .await
            .context("Failed to query refresh token")?;

        Ok(row.map(RefreshTokenRow::from))
    }

    /// Deactivate a token by hash. Idempotent: deactivating an absent or
    /// already inactive token is a no-op. Returns whether a row flipped.
    pub async fn deactivate_by_hash(&self, token_hash: &str) -> Result<bool> {
        let result = refresh_tokens::Entity::update_many()
            .col_expr(refresh_tokens::Column::IsActive, Expr::value(false))
            .filter(refresh_tokens::Column::TokenHash.eq(token_hash))
            .filter(refresh_tokens::Column::IsActive.eq(true))
            .exec(&self.conn)
            .await
            .context("Failed to deactivate refresh token")?;

        Ok(result.rows_affected > 0)
    }

    /// Deactivate every active token for a user (logout-all / security event).
    pub async fn deactivate_all_for_user(&self, user_id: i32) -> Result<u64> {
        let result = refresh_tokens::Entity::update_many()
            .col_expr(refresh_tokens::Column::IsActive, Expr::value(false))
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .filter(refresh_tokens::Column::IsActive.eq(true))
            .exec(&self.conn)
            .await
            .context("Failed to deactivate user refresh tokens")?;

        Ok(result.rows_affected)
    }
}
