use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "device_fingerprints")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// SHA-256 of the normalized attribute bundle. Same browser config,
    /// same hash.
    #[sea_orm(unique)]
    pub fingerprint_hash: String,

    pub user_agent: Option<String>,

    pub screen_resolution: Option<String>,

    pub timezone: Option<String>,

    pub fonts_hash: Option<String>,

    pub canvas_hash: Option<String>,

    pub webgl_hash: Option<String>,

    pub audio_hash: Option<String>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
