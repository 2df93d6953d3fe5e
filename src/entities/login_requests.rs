use sea_orm::entity::prelude::*;

/// A pending individual-login approval record. Status is one of
/// pending / approved / rejected / expired / completed; the last three
/// are terminal.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "login_requests")]
pub struct Model {
    /// UUID v4, handed to the requesting client for polling.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: i32,

    pub organization_id: i32,

    pub device_fingerprint_id: Option<i32>,

    pub ip_address: Option<String>,

    pub user_agent: Option<String>,

    pub status: String,

    pub approved_by: Option<i32>,

    pub approved_at: Option<DateTimeUtc>,

    pub rejection_reason: Option<String>,

    pub expires_at: DateTimeUtc,

    pub completed_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::organizations::Entity",
        from = "Column::OrganizationId",
        to = "super::organizations::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Organization,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::organizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
