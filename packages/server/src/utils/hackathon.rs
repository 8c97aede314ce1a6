use sea_orm::sea_query::LockType;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect,
};

use crate::entity::{hackathon, hackathon_participant, team};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::hackathon::HackathonCounts;

/// Look up a hackathon by ID, returning 404 if not found.
pub async fn find_hackathon<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<hackathon::Model, AppError> {
    hackathon::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Hackathon not found".into()))
}

/// Same as [`find_hackathon`] but takes a row lock, serializing membership
/// changes within one hackathon.
pub async fn find_hackathon_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<hackathon::Model, AppError> {
    hackathon::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Hackathon not found".into()))
}

/// The organizer of a hackathon and holders of `hackathon:manage` may edit it.
pub fn require_hackathon_authority(
    auth_user: &AuthUser,
    hackathon: &hackathon::Model,
) -> Result<(), AppError> {
    if hackathon.organizer_id == auth_user.user_id || auth_user.has_permission("hackathon:manage")
    {
        return Ok(());
    }
    Err(AppError::PermissionDenied)
}

pub async fn find_participant<C: ConnectionTrait>(
    db: &C,
    hackathon_id: i32,
    user_id: i32,
) -> Result<Option<hackathon_participant::Model>, AppError> {
    Ok(hackathon_participant::Entity::find_by_id((hackathon_id, user_id))
        .one(db)
        .await?)
}

/// Fail with 403 unless the caller is registered for the hackathon.
pub async fn require_participant<C: ConnectionTrait>(
    db: &C,
    hackathon_id: i32,
    user_id: i32,
) -> Result<hackathon_participant::Model, AppError> {
    find_participant(db, hackathon_id, user_id)
        .await?
        .ok_or_else(|| {
            tracing::debug!(hackathon_id, user_id, "caller is not a registered participant");
            AppError::PermissionDenied
        })
}

/// Set a participant's readiness flag, ignoring users that are not registered.
pub async fn set_ready<C: ConnectionTrait>(
    db: &C,
    hackathon_id: i32,
    user_ids: &[i32],
    ready: bool,
) -> Result<(), AppError> {
    if user_ids.is_empty() {
        return Ok(());
    }
    hackathon_participant::Entity::update_many()
        .filter(hackathon_participant::Column::HackathonId.eq(hackathon_id))
        .filter(hackathon_participant::Column::UserId.is_in(user_ids.iter().copied()))
        .col_expr(
            hackathon_participant::Column::Ready,
            sea_orm::prelude::Expr::value(ready),
        )
        .exec(db)
        .await?;
    Ok(())
}

pub async fn hackathon_counts<C: ConnectionTrait>(
    db: &C,
    hackathon_id: i32,
) -> Result<HackathonCounts, AppError> {
    let participants = hackathon_participant::Entity::find()
        .filter(hackathon_participant::Column::HackathonId.eq(hackathon_id))
        .count(db)
        .await?;
    let ready = hackathon_participant::Entity::find()
        .filter(hackathon_participant::Column::HackathonId.eq(hackathon_id))
        .filter(hackathon_participant::Column::Ready.eq(true))
        .count(db)
        .await?;
    let teams = team::Entity::find()
        .filter(team::Column::HackathonId.eq(hackathon_id))
        .count(db)
        .await?;
    Ok(HackathonCounts {
        participants,
        ready,
        teams,
    })
}

/// Registered participant IDs, used to check a whole group at once.
pub async fn registered_user_ids<C: ConnectionTrait>(
    db: &C,
    hackathon_id: i32,
    user_ids: &[i32],
) -> Result<Vec<i32>, AppError> {
    Ok(hackathon_participant::Entity::find()
        .filter(hackathon_participant::Column::HackathonId.eq(hackathon_id))
        .filter(hackathon_participant::Column::UserId.is_in(user_ids.iter().copied()))
        .select_only()
        .column(hackathon_participant::Column::UserId)
        .into_tuple::<i32>()
        .all(db)
        .await?)
}
