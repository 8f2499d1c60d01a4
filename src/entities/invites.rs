use sea_orm::entity::prelude::*;

/// Single-use, email-scoped registration invite.
///
/// A partial unique index (created in the initial migration) guarantees at
/// most one unused invite per email; used invites are kept for the audit view.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "invites")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub email: String,

    #[sea_orm(unique)]
    pub invite_code: String,

    pub invited_by: String,

    pub created_at: String,

    pub is_used: bool,

    pub used_at: Option<String>,

    pub used_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
