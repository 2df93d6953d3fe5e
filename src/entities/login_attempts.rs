use sea_orm::entity::prelude::*;

/// Append-only record of every login attempt, success or failure.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "login_attempts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub user_id: Option<i32>,

    /// The identifier as supplied, even when no user matched.
    pub email: String,

    pub ip_address: Option<String>,

    pub user_agent: Option<String>,

    pub success: bool,

    pub failure_reason: Option<String>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
