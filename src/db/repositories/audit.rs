use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, QuerySelect, Set};

use crate::entities::audit_logs;

pub struct AuditRepository {
    conn: DatabaseConnection,
}

impl AuditRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn append(
        &self,
        organization_id: Option<i32>,
        user_id: Option<i32>,
        action: &str,
        severity: &str,
        metadata: Option<String>,
    ) -> Result<()> {
        let model = audit_logs::ActiveModel {
            organization_id: Set(organization_id),
            user_id: Set(user_id),
            action: Set(action.to_string()),
            severity: Set(severity.to_string()),
            metadata: Set(metadata),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        model
            .insert(&self.conn)
            .await
            .context("Failed to append audit log")?;

        Ok(())
    }

    pub async fn recent(&self, limit: u64) -> Result<Vec<audit_logs::Model>> {
        let rows = audit_logs::Entity::find()
            .order_by_desc(audit_logs::Column::CreatedAt)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query audit logs")?;

        Ok(rows)
    }
}
