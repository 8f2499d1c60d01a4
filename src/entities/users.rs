use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Stored lowercase; login lookups case-fold before comparison.
    #[sea_orm(unique)]
    pub username: String,

    /// External Slack identity, linked on first Slack login.
    #[sea_orm(unique)]
    pub slack_id: Option<String>,

    pub slack_email: Option<String>,

    /// One of "regular", "admin", "superadmin".
    pub role: String,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
