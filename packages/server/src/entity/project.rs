use sea_orm::entity::prelude::*;

use super::enums::ProjectStatus;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "project")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub owner_id: i32,
    #[sea_orm(belongs_to, from = "owner_id", to = "id")]
    pub owner: HasOne<super::user::Entity>,

    /// Plain references: projects outlive the hackathon or team they were
    /// built for, the links are cleared instead.
    pub hackathon_id: Option<i32>,
    pub team_id: Option<i32>,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub status: ProjectStatus,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,

    #[sea_orm(has_many)]
    pub tasks: HasMany<super::task::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
