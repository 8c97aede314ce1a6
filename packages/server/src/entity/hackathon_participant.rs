use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "hackathon_participant")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub hackathon_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "hackathon_id", to = "id")]
    pub hackathon: HasOne<super::hackathon::Entity>,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    /// Looking for a team.
    pub ready: bool,
    pub registered_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
