use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{team, team_member};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::team::*;
use crate::state::AppState;
use crate::utils::hackathon::{
    find_hackathon, find_hackathon_for_update, require_participant, set_ready,
};
use crate::utils::team::{
    create_team as insert_team, dissolve_team, ensure_team_name_free, find_membership, find_team,
    find_team_for_update, members_by_join_order, team_response, team_responses,
};

#[utoipa::path(
    post,
    path = "/{id}/teams",
    tag = "Teams",
    operation_id = "createTeam",
    summary = "Create a team",
    description = "Creates a team in the hackathon with the caller as leader and only member. The caller must be registered and not already in a team. Their readiness flag is cleared.",
    params(("id" = i32, Path, description = "Hackathon ID")),
    request_body = CreateTeamRequest,
    responses(
        (status = 201, description = "Team created", body = TeamResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not registered (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Hackathon not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already in a team or name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state, payload), fields(id, user_id = auth_user.user_id))]
pub async fn create_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CreateTeamRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_team_name(&payload.name)?;
    let name = payload.name.trim().to_string();

    let txn = state.db.begin().await?;
    find_hackathon_for_update(&txn, id).await?;
    require_participant(&txn, id, auth_user.user_id).await?;

    if find_membership(&txn, id, auth_user.user_id).await?.is_some() {
        return Err(AppError::Conflict(
            "You are already in a team for this hackathon".into(),
        ));
    }
    ensure_team_name_free(&txn, id, &name, None).await?;

    let team = insert_team(&txn, id, name, &[auth_user.user_id]).await?;
    set_ready(&txn, id, &[auth_user.user_id], false).await?;
    let response = team_response(&txn, team).await?;
    txn.commit().await?;

    tracing::info!(team_id = response.id, "Team created");
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/{id}/teams",
    tag = "Teams",
    operation_id = "listTeams",
    summary = "List the teams of a hackathon",
    params(("id" = i32, Path, description = "Hackathon ID")),
    responses(
        (status = 200, description = "Teams with members", body = Vec<TeamResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Hackathon not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(_auth_user, state), fields(id))]
pub async fn list_teams(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<TeamResponse>>, AppError> {
    find_hackathon(&state.db, id).await?;
    let teams = team::Entity::find()
        .filter(team::Column::HackathonId.eq(id))
        .order_by_asc(team::Column::CreatedAt)
        .order_by_asc(team::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(team_responses(&state.db, teams).await?))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Teams",
    operation_id = "getTeam",
    summary = "Get a team",
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Team with members", body = TeamResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Team not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(_auth_user, state), fields(id))]
pub async fn get_team(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TeamResponse>, AppError> {
    let team = find_team(&state.db, id).await?;
    Ok(Json(team_response(&state.db, team).await?))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Teams",
    operation_id = "renameTeam",
    summary = "Rename a team",
    description = "Leader only. Names are unique within the hackathon, compared case-insensitively.",
    params(("id" = i32, Path, description = "Team ID")),
    request_body = UpdateTeamRequest,
    responses(
        (status = 200, description = "Team renamed", body = TeamResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the leader (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Team not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Name taken (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state, payload), fields(id))]
pub async fn update_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateTeamRequest>,
) -> Result<Json<TeamResponse>, AppError> {
    validate_team_name(&payload.name)?;
    let name = payload.name.trim().to_string();

    let hackathon_id = find_team(&state.db, id).await?.hackathon_id;

    let txn = state.db.begin().await?;
    find_hackathon_for_update(&txn, hackathon_id).await?;
    let existing = find_team_for_update(&txn, id).await?;
    if existing.leader_id != auth_user.user_id {
        return Err(AppError::PermissionDenied);
    }
    ensure_team_name_free(&txn, existing.hackathon_id, &name, Some(id)).await?;

    let mut active: team::ActiveModel = existing.into();
    active.name = Set(name);
    let model = active.update(&txn).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Team name is already used in this hackathon".into())
        }
        _ => AppError::from(e),
    })?;
    let response = team_response(&txn, model).await?;
    txn.commit().await?;

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/{id}/leave",
    tag = "Teams",
    operation_id = "leaveTeam",
    summary = "Leave a team",
    description = "Removes the caller from the team. A departing leader hands over to the earliest-joined remaining member. When the last member leaves, the team is deleted with its pending join requests and its projects are unlinked.",
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 204, description = "Left the team"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Team not found or not a member (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state), fields(id, user_id = auth_user.user_id))]
pub async fn leave_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let hackathon_id = find_team(&state.db, id).await?.hackathon_id;

    let txn = state.db.begin().await?;
    find_hackathon_for_update(&txn, hackathon_id).await?;
    let team = find_team_for_update(&txn, id).await?;

    let is_member = find_membership(&txn, hackathon_id, auth_user.user_id)
        .await?
        .is_some_and(|m| m.team_id == team.id);
    if !is_member {
        return Err(AppError::NotFound("You are not a member of this team".into()));
    }

    team_member::Entity::delete_by_id((hackathon_id, auth_user.user_id))
        .exec(&txn)
        .await?;

    let remaining = members_by_join_order(&txn, team.id).await?;
    match remaining.first() {
        None => dissolve_team(&txn, team.id).await?,
        Some(successor) if team.leader_id == auth_user.user_id => {
            let successor_id = successor.user_id;
            let mut active: team::ActiveModel = team.into();
            active.leader_id = Set(successor_id);
            active.update(&txn).await?;
            tracing::info!(team_id = id, successor_id, "Team leadership passed on");
        }
        Some(_) => {}
    }

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/{id}/members/{user_id}",
    tag = "Teams",
    operation_id = "removeTeamMember",
    summary = "Remove a member",
    description = "Leader only. The leader cannot remove themself; use leave instead.",
    params(
        ("id" = i32, Path, description = "Team ID"),
        ("user_id" = i32, Path, description = "Member's user ID"),
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 400, description = "Leader removing themself (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the leader (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Team or member not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state), fields(id, user_id))]
pub async fn remove_member(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    let hackathon_id = find_team(&state.db, id).await?.hackathon_id;

    let txn = state.db.begin().await?;
    find_hackathon_for_update(&txn, hackathon_id).await?;
    let team = find_team_for_update(&txn, id).await?;

    if team.leader_id != auth_user.user_id {
        return Err(AppError::PermissionDenied);
    }
    if user_id == auth_user.user_id {
        return Err(AppError::Validation(
            "The leader cannot remove themself; leave the team instead".into(),
        ));
    }
    let is_member = find_membership(&txn, hackathon_id, user_id)
        .await?
        .is_some_and(|m| m.team_id == team.id);
    if !is_member {
        return Err(AppError::NotFound("Member not found".into()));
    }

    team_member::Entity::delete_by_id((hackathon_id, user_id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
