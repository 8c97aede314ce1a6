use std::collections::HashMap;

use sea_orm::sea_query::LockType;
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};

use crate::entity::enums::JoinRequestStatus;
use crate::entity::{join_request, project, team, team_member, user};
use crate::error::AppError;
use crate::models::join_request::TeamPosition;
use crate::models::team::{TeamMemberResponse, TeamResponse};

/// Look up a team by ID, returning 404 if not found.
pub async fn find_team<C: ConnectionTrait>(db: &C, id: i32) -> Result<team::Model, AppError> {
    team::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".into()))
}

pub async fn find_team_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<team::Model, AppError> {
    team::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Team not found".into()))
}

/// The caller's membership row in a hackathon, if any.
pub async fn find_membership<C: ConnectionTrait>(
    db: &C,
    hackathon_id: i32,
    user_id: i32,
) -> Result<Option<team_member::Model>, AppError> {
    Ok(team_member::Entity::find_by_id((hackathon_id, user_id))
        .one(db)
        .await?)
}

/// Where a participant stands: which team, and whether they lead it.
pub async fn team_position<C: ConnectionTrait>(
    db: &C,
    hackathon_id: i32,
    user_id: i32,
) -> Result<Option<TeamPosition>, AppError> {
    let Some(membership) = find_membership(db, hackathon_id, user_id).await? else {
        return Ok(None);
    };
    let team = find_team(db, membership.team_id).await?;
    Ok(Some(TeamPosition {
        team_id: team.id,
        is_leader: team.leader_id == user_id,
    }))
}

pub async fn team_size<C: ConnectionTrait>(db: &C, team_id: i32) -> Result<u64, AppError> {
    Ok(team_member::Entity::find()
        .filter(team_member::Column::TeamId.eq(team_id))
        .count(db)
        .await?)
}

pub async fn is_team_member<C: ConnectionTrait>(
    db: &C,
    team_id: i32,
    user_id: i32,
) -> Result<bool, AppError> {
    Ok(team_member::Entity::find()
        .filter(team_member::Column::TeamId.eq(team_id))
        .filter(team_member::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .is_some())
}

/// Names already used in a hackathon.
pub async fn team_names<C: ConnectionTrait>(
    db: &C,
    hackathon_id: i32,
) -> Result<Vec<String>, AppError> {
    Ok(team::Entity::find()
        .filter(team::Column::HackathonId.eq(hackathon_id))
        .select_only()
        .column(team::Column::Name)
        .into_tuple::<String>()
        .all(db)
        .await?)
}

/// Case-insensitive name check, optionally ignoring one team (for renames).
pub async fn ensure_team_name_free<C: ConnectionTrait>(
    db: &C,
    hackathon_id: i32,
    name: &str,
    except_team: Option<i32>,
) -> Result<(), AppError> {
    let mut select = team::Entity::find().filter(team::Column::HackathonId.eq(hackathon_id));
    if let Some(id) = except_team {
        select = select.filter(team::Column::Id.ne(id));
    }
    let taken = select
        .all(db)
        .await?
        .iter()
        .any(|t| t.name.to_lowercase() == name.to_lowercase());
    if taken {
        return Err(AppError::Conflict(format!(
            "Team name '{name}' is already used in this hackathon"
        )));
    }
    Ok(())
}

/// Create a team and add its members, the first one becoming leader.
pub async fn create_team<C: ConnectionTrait>(
    db: &C,
    hackathon_id: i32,
    name: String,
    member_ids: &[i32],
) -> Result<team::Model, AppError> {
    let leader_id = *member_ids
        .first()
        .ok_or_else(|| AppError::Internal("team created without members".into()))?;
    let now = chrono::Utc::now();

    let team = team::ActiveModel {
        hackathon_id: Set(hackathon_id),
        name: Set(name),
        leader_id: Set(leader_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!(hackathon_id, "team name taken concurrently");
            AppError::Conflict("Team name is already used in this hackathon".into())
        }
        _ => AppError::from(e),
    })?;

    for &user_id in member_ids {
        add_member(db, &team, user_id).await?;
    }
    Ok(team)
}

/// Insert a membership row. Fails with 409 if the user is already in a team
/// of this hackathon.
pub async fn add_member<C: ConnectionTrait>(
    db: &C,
    team: &team::Model,
    user_id: i32,
) -> Result<(), AppError> {
    let row = team_member::ActiveModel {
        hackathon_id: Set(team.hackathon_id),
        user_id: Set(user_id),
        team_id: Set(team.id),
        joined_at: Set(chrono::Utc::now()),
    };
    match team_member::Entity::insert(row).exec_without_returning(db).await {
        Ok(_) => Ok(()),
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(AppError::Conflict(
                "User is already in a team for this hackathon".into(),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// Build the API view of several teams with their members in two queries.
pub async fn team_responses<C: ConnectionTrait>(
    db: &C,
    teams: Vec<team::Model>,
) -> Result<Vec<TeamResponse>, AppError> {
    if teams.is_empty() {
        return Ok(Vec::new());
    }
    let team_ids: Vec<i32> = teams.iter().map(|t| t.id).collect();
    let rows = team_member::Entity::find()
        .filter(team_member::Column::TeamId.is_in(team_ids))
        .find_also_related(user::Entity)
        .order_by_asc(team_member::Column::JoinedAt)
        .order_by_asc(team_member::Column::UserId)
        .all(db)
        .await?;

    let mut members: HashMap<i32, Vec<TeamMemberResponse>> = HashMap::new();
    for (member, usr) in rows {
        members
            .entry(member.team_id)
            .or_default()
            .push(TeamMemberResponse {
                user_id: member.user_id,
                username: usr.map(|u| u.username).unwrap_or_default(),
                joined_at: member.joined_at,
            });
    }

    Ok(teams
        .into_iter()
        .map(|t| TeamResponse {
            members: members.remove(&t.id).unwrap_or_default(),
            id: t.id,
            hackathon_id: t.hackathon_id,
            name: t.name,
            leader_id: t.leader_id,
            created_at: t.created_at,
        })
        .collect())
}

pub async fn team_response<C: ConnectionTrait>(
    db: &C,
    team: team::Model,
) -> Result<TeamResponse, AppError> {
    team_responses(db, vec![team])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("team response missing".into()))
}

/// Members of a team, earliest joiner first.
pub async fn members_by_join_order<C: ConnectionTrait>(
    db: &C,
    team_id: i32,
) -> Result<Vec<team_member::Model>, AppError> {
    Ok(team_member::Entity::find()
        .filter(team_member::Column::TeamId.eq(team_id))
        .order_by_asc(team_member::Column::JoinedAt)
        .order_by_asc(team_member::Column::UserId)
        .all(db)
        .await?)
}

/// Delete an empty team along with its pending join requests. Projects built
/// by the team are kept but unlinked.
pub async fn dissolve_team<C: ConnectionTrait>(db: &C, team_id: i32) -> Result<(), AppError> {
    join_request::Entity::delete_many()
        .filter(join_request::Column::TeamId.eq(team_id))
        .filter(join_request::Column::Status.eq(JoinRequestStatus::Pending))
        .exec(db)
        .await?;
    project::Entity::update_many()
        .filter(project::Column::TeamId.eq(team_id))
        .col_expr(project::Column::TeamId, Expr::value(Option::<i32>::None))
        .exec(db)
        .await?;
    team::Entity::delete_by_id(team_id).exec(db).await?;
    tracing::info!(team_id, "Team dissolved");
    Ok(())
}
