use sea_orm::entity::prelude::*;

/// Keyed by `(hackathon_id, user_id)` so a user can be in at most one team
/// per hackathon.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "team_member")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub hackathon_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub team_id: i32,
    #[sea_orm(belongs_to, from = "team_id", to = "id")]
    pub team: HasOne<super::team::Entity>,

    pub joined_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
