use sea_orm::entity::prelude::*;

use super::enums::HackathonMode;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "hackathon")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String, // in Markdown
    pub location: Option<String>,
    pub mode: HackathonMode,
    pub prize: Option<String>,
    pub max_team_size: i32,

    pub registration_deadline: DateTimeUtc,
    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,

    pub organizer_id: i32,
    #[sea_orm(belongs_to, from = "organizer_id", to = "id")]
    pub organizer: HasOne<super::user::Entity>,

    #[sea_orm(has_many)]
    pub teams: HasMany<super::team::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
