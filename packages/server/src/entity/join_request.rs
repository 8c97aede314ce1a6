use sea_orm::entity::prelude::*;

use super::enums::{JoinRequestKind, JoinRequestStatus};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "join_request")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub hackathon_id: i32,
    #[sea_orm(belongs_to, from = "hackathon_id", to = "id")]
    pub hackathon: HasOne<super::hackathon::Entity>,

    pub sender_id: i32,
    pub recipient_id: i32,
    pub kind: JoinRequestKind,
    /// Team the request was about when it was sent. NULL for pair requests.
    pub team_id: Option<i32>,
    pub message: Option<String>,
    pub status: JoinRequestStatus,

    pub created_at: DateTimeUtc,
    pub responded_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
