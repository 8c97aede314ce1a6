use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_skill")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,
    /// Normalized: trimmed and lowercased.
    #[sea_orm(primary_key, auto_increment = false)]
    pub skill: String,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    /// Display order within the user's profile.
    pub position: i32,
}

impl ActiveModelBehavior for ActiveModel {}
