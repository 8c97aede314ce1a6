use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};

use crate::entity::{project, team_member};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;

/// Team IDs the user belongs to, across all hackathons.
pub async fn team_ids_of<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<i32>, AppError> {
    Ok(team_member::Entity::find()
        .filter(team_member::Column::UserId.eq(user_id))
        .select_only()
        .column(team_member::Column::TeamId)
        .into_tuple::<i32>()
        .all(db)
        .await?)
}

/// Filter matching projects the caller may see: their own, and those of
/// teams they belong to. `None` means no restriction (`project:manage`).
pub async fn project_access_condition<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
) -> Result<Option<Condition>, AppError> {
    if auth_user.has_permission("project:manage") {
        return Ok(None);
    }
    let mut cond = Condition::any().add(project::Column::OwnerId.eq(auth_user.user_id));
    let team_ids = team_ids_of(db, auth_user.user_id).await?;
    if !team_ids.is_empty() {
        cond = cond.add(project::Column::TeamId.is_in(team_ids));
    }
    Ok(Some(cond))
}

pub async fn can_access_project<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    project: &project::Model,
) -> Result<bool, AppError> {
    if project.owner_id == auth_user.user_id || auth_user.has_permission("project:manage") {
        return Ok(true);
    }
    let Some(team_id) = project.team_id else {
        return Ok(false);
    };
    crate::utils::team::is_team_member(db, team_id, auth_user.user_id).await
}

/// Load a project the caller can see. Projects outside the caller's reach
/// answer 404 so their existence is not revealed.
pub async fn find_accessible_project<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    id: i32,
) -> Result<project::Model, AppError> {
    let not_found = || AppError::NotFound("Project not found".into());
    let project = project::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(not_found)?;
    if !can_access_project(db, auth_user, &project).await? {
        return Err(not_found());
    }
    Ok(project)
}

/// Only the owner (or a project manager) may delete a project.
pub fn require_project_owner(
    auth_user: &AuthUser,
    project: &project::Model,
) -> Result<(), AppError> {
    if project.owner_id == auth_user.user_id || auth_user.has_permission("project:manage") {
        return Ok(());
    }
    Err(AppError::PermissionDenied)
}

/// Tasks may be assigned to the project owner or members of its team.
pub async fn require_valid_assignee<C: ConnectionTrait>(
    db: &C,
    project: &project::Model,
    assignee_id: i32,
) -> Result<(), AppError> {
    if assignee_id == project.owner_id {
        return Ok(());
    }
    if let Some(team_id) = project.team_id
        && crate::utils::team::is_team_member(db, team_id, assignee_id).await?
    {
        return Ok(());
    }
    Err(AppError::Validation(
        "Assignee must be the project owner or a member of its team".into(),
    ))
}
