use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "admin_keys")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Opaque bearer secret (64-char hex string), compared verbatim at login.
    #[sea_orm(unique)]
    pub key: String,

    /// Username this key logs in as. A claim, not a foreign key: the user
    /// row may not exist until the key is first redeemed.
    pub name: String,

    pub generated_by: String,

    pub generated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
