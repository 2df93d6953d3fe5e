use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::entities::login_attempts;

pub struct LoginAttemptRepository {
    conn: DatabaseConnection,
}

impl LoginAttemptRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Append one attempt row. Written on every path, success or failure.
    pub async fn record(
        &self,
        user_id: Option<i32>,
        email: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        success: bool,
        failure_reason: Option<&str>,
    ) -> Result<()> {
        let model = login_attempts::ActiveModel {
            user_id: Set(user_id),
            email: Set(email.to_string()),
            ip_address: Set(ip_address.map(str::to_string)),
            user_agent: Set(user_agent.map(str::to_string)),
            success: Set(success),
            failure_reason: Set(failure_reason.map(str::to_string)),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        model
            .insert(&self.conn)
            .await
            .context("Failed to record login attempt")?;

        Ok(())
    }
}
