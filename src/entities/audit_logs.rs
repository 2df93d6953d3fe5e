use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Append-only security audit trail. Writes happen off the request path;
/// a failed write never fails the request that produced it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub organization_id: Option<i32>,

    pub user_id: Option<i32>,

    pub action: String,

    /// "low" | "medium" | "high" | "critical"
    pub severity: String,

    pub metadata: Option<String>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
