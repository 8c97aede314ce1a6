use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "team")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub hackathon_id: i32,
    #[sea_orm(belongs_to, from = "hackathon_id", to = "id")]
    pub hackathon: HasOne<super::hackathon::Entity>,

    pub name: String,
    pub leader_id: i32,

    #[sea_orm(has_many)]
    pub members: HasMany<super::team_member::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
