use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::instrument;

use crate::entity::enums::{JoinRequestStatus, parse_enum};
use crate::entity::{hackathon, join_request};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::join_request::*;
use crate::models::team::pair_team_name;
use crate::state::AppState;
use crate::utils::hackathon::{
    find_hackathon_for_update, find_participant, registered_user_ids, require_participant,
    set_ready,
};
use crate::utils::team::{
    add_member, create_team, find_team_for_update, team_names, team_position, team_response,
    team_size,
};
use crate::utils::user::{find_user, usernames};

#[utoipa::path(
    post,
    path = "/{id}/join-requests",
    tag = "Join Requests",
    operation_id = "sendJoinRequest",
    summary = "Send a join request",
    description = "Sends a team request to another participant of the hackathon. What it means is decided by team membership: a sender in a team invites the recipient; an unassigned sender applies to the team the recipient leads; two unassigned participants pair up into a new team.",
    params(("id" = i32, Path, description = "Hackathon ID")),
    request_body = SendJoinRequest,
    responses(
        (status = 201, description = "Request sent", body = JoinRequestResponse),
        (status = 400, description = "Self-request or applying to a non-leader (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Sender not registered (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Hackathon not found or recipient not registered (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Duplicate pending request, both in teams, or team full (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state, payload), fields(id, sender_id = auth_user.user_id, recipient_id = payload.recipient_id))]
pub async fn send_join_request(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<SendJoinRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_send_join_request(&payload, auth_user.user_id)?;
    let sender_id = auth_user.user_id;
    let recipient_id = payload.recipient_id;

    let txn = state.db.begin().await?;
    let hackathon = find_hackathon_for_update(&txn, id).await?;

    require_participant(&txn, id, sender_id).await?;
    if find_participant(&txn, id, recipient_id).await?.is_none() {
        return Err(AppError::NotFound(
            "Recipient is not registered for this hackathon".into(),
        ));
    }

    let formation = Formation::classify(
        team_position(&txn, id, sender_id).await?,
        team_position(&txn, id, recipient_id).await?,
    )?;

    let duplicate = join_request::Entity::find()
        .filter(join_request::Column::HackathonId.eq(id))
        .filter(join_request::Column::Status.eq(JoinRequestStatus::Pending))
        .filter(
            Condition::any()
                .add(
                    Condition::all()
                        .add(join_request::Column::SenderId.eq(sender_id))
                        .add(join_request::Column::RecipientId.eq(recipient_id)),
                )
                .add(
                    Condition::all()
                        .add(join_request::Column::SenderId.eq(recipient_id))
                        .add(join_request::Column::RecipientId.eq(sender_id)),
                ),
        )
        .one(&txn)
        .await?;
    if duplicate.is_some() {
        return Err(AppError::Conflict(
            "A pending request between you two already exists".into(),
        ));
    }

    if let Some(team_id) = formation.team_id() {
        ensure_room(&txn, &hackathon, team_id).await?;
    }

    let model = join_request::ActiveModel {
        hackathon_id: Set(id),
        sender_id: Set(sender_id),
        recipient_id: Set(recipient_id),
        kind: Set(formation.kind()),
        team_id: Set(formation.team_id()),
        message: Set(payload
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())),
        status: Set(JoinRequestStatus::Pending),
        created_at: Set(chrono::Utc::now()),
        responded_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    let response = request_response(&txn, model).await?;
    txn.commit().await?;

    tracing::info!(request_id = response.id, kind = ?response.kind, "Join request sent");
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Join Requests",
    operation_id = "listJoinRequests",
    summary = "List the caller's join requests",
    description = "Incoming (default) or outgoing requests of the caller, newest first. Filter by `status` and `hackathon_id`.",
    params(JoinRequestListQuery),
    responses(
        (status = 200, description = "Join requests", body = Vec<JoinRequestResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state, query), fields(user_id = auth_user.user_id))]
pub async fn list_join_requests(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<JoinRequestListQuery>,
) -> Result<Json<Vec<JoinRequestResponse>>, AppError> {
    let mut select = match Direction::parse(query.direction.as_deref())? {
        Direction::Incoming => join_request::Entity::find()
            .filter(join_request::Column::RecipientId.eq(auth_user.user_id)),
        Direction::Outgoing => join_request::Entity::find()
            .filter(join_request::Column::SenderId.eq(auth_user.user_id)),
    };
    if let Some(ref raw) = query.status {
        let status: JoinRequestStatus = parse_enum(raw, "status")?;
        select = select.filter(join_request::Column::Status.eq(status));
    }
    if let Some(hackathon_id) = query.hackathon_id {
        select = select.filter(join_request::Column::HackathonId.eq(hackathon_id));
    }

    let requests = select
        .order_by_desc(join_request::Column::CreatedAt)
        .order_by_desc(join_request::Column::Id)
        .all(&state.db)
        .await?;

    let names = usernames(
        &state.db,
        requests.iter().flat_map(|r| [r.sender_id, r.recipient_id]),
    )
    .await?;
    let data = requests
        .into_iter()
        .map(|r| {
            let sender = names.get(&r.sender_id).cloned().unwrap_or_default();
            let recipient = names.get(&r.recipient_id).cloned().unwrap_or_default();
            JoinRequestResponse::new(r, sender, recipient)
        })
        .collect();

    Ok(Json(data))
}

#[utoipa::path(
    post,
    path = "/{id}/accept",
    tag = "Join Requests",
    operation_id = "acceptJoinRequest",
    summary = "Accept a join request",
    description = "Recipient only. Team membership is re-evaluated under lock; if the request no longer fits the current teams (a side joined or left a team, the team is full or gone, a side unregistered) the call fails with 409 and the request stays pending. Everyone who joins a team stops being ready.",
    params(("id" = i32, Path, description = "Join request ID")),
    responses(
        (status = 200, description = "Request accepted", body = AcceptJoinRequestResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Request not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Not pending or no longer applicable (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state), fields(id, user_id = auth_user.user_id))]
pub async fn accept_join_request(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AcceptJoinRequestResponse>, AppError> {
    let hackathon_id = find_request(&state.db, id).await?.hackathon_id;

    let txn = state.db.begin().await?;
    let hackathon = find_hackathon_for_update(&txn, hackathon_id).await?;
    let request = find_request_for_update(&txn, id, auth_user.user_id, Side::Recipient).await?;

    let (sender_id, recipient_id) = (request.sender_id, request.recipient_id);
    let changed = || AppError::Conflict("Team situation changed since the request was sent".into());

    if registered_user_ids(&txn, hackathon_id, &[sender_id, recipient_id])
        .await?
        .len()
        != 2
    {
        return Err(changed());
    }

    let current = Formation::classify(
        team_position(&txn, hackathon_id, sender_id).await?,
        team_position(&txn, hackathon_id, recipient_id).await?,
    )
    .map_err(|_| changed())?;
    if Formation::from_stored(request.kind, request.team_id) != Some(current) {
        return Err(changed());
    }

    let (team, joined) = match current {
        Formation::Invite { team_id } | Formation::Apply { team_id } => {
            let team = find_team_for_update(&txn, team_id).await?;
            ensure_room(&txn, &hackathon, team_id).await?;
            let joiner = if matches!(current, Formation::Invite { .. }) {
                recipient_id
            } else {
                sender_id
            };
            add_member(&txn, &team, joiner).await?;
            (team, vec![joiner])
        }
        Formation::Pair => {
            let sender = find_user(&txn, sender_id).await?;
            let name = pair_team_name(&sender.username, &team_names(&txn, hackathon_id).await?);
            let team = create_team(&txn, hackathon_id, name, &[sender_id, recipient_id]).await?;
            (team, vec![sender_id, recipient_id])
        }
    };
    set_ready(&txn, hackathon_id, &joined, false).await?;

    let mut active: join_request::ActiveModel = request.into();
    active.status = Set(JoinRequestStatus::Accepted);
    active.responded_at = Set(Some(chrono::Utc::now()));
    let request = active.update(&txn).await?;

    let team = team_response(&txn, team).await?;
    let request = request_response(&txn, request).await?;
    txn.commit().await?;

    tracing::info!(request_id = id, team_id = team.id, "Join request accepted");
    Ok(Json(AcceptJoinRequestResponse { request, team }))
}

#[utoipa::path(
    post,
    path = "/{id}/reject",
    tag = "Join Requests",
    operation_id = "rejectJoinRequest",
    summary = "Reject a join request",
    description = "Recipient only; the request must be pending.",
    params(("id" = i32, Path, description = "Join request ID")),
    responses(
        (status = 200, description = "Request rejected", body = JoinRequestResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Request not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Not pending (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state), fields(id, user_id = auth_user.user_id))]
pub async fn reject_join_request(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<JoinRequestResponse>, AppError> {
    let txn = state.db.begin().await?;
    let request = find_request_for_update(&txn, id, auth_user.user_id, Side::Recipient).await?;

    let mut active: join_request::ActiveModel = request.into();
    active.status = Set(JoinRequestStatus::Rejected);
    active.responded_at = Set(Some(chrono::Utc::now()));
    let request = active.update(&txn).await?;
    let response = request_response(&txn, request).await?;
    txn.commit().await?;

    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Join Requests",
    operation_id = "withdrawJoinRequest",
    summary = "Withdraw a join request",
    description = "Sender only; the request must be pending.",
    params(("id" = i32, Path, description = "Join request ID")),
    responses(
        (status = 204, description = "Request withdrawn"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Request not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Not pending (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state), fields(id, user_id = auth_user.user_id))]
pub async fn withdraw_join_request(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    find_request_for_update(&txn, id, auth_user.user_id, Side::Sender).await?;
    join_request::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Which party of a request may act on it.
#[derive(Clone, Copy)]
enum Side {
    Sender,
    Recipient,
}

async fn find_request<C: ConnectionTrait>(db: &C, id: i32) -> Result<join_request::Model, AppError> {
    join_request::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Join request not found".into()))
}

/// Lock a pending request the caller may act on. Requests belonging to
/// someone else look like 404.
async fn find_request_for_update(
    txn: &DatabaseTransaction,
    id: i32,
    user_id: i32,
    side: Side,
) -> Result<join_request::Model, AppError> {
    let request = join_request::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Join request not found".into()))?;
    let owner = match side {
        Side::Sender => request.sender_id,
        Side::Recipient => request.recipient_id,
    };
    if owner != user_id {
        return Err(AppError::NotFound("Join request not found".into()));
    }
    if request.status != JoinRequestStatus::Pending {
        return Err(AppError::Conflict("Join request is no longer pending".into()));
    }
    Ok(request)
}

async fn ensure_room<C: ConnectionTrait>(
    db: &C,
    hackathon: &hackathon::Model,
    team_id: i32,
) -> Result<(), AppError> {
    let size = team_size(db, team_id).await?;
    if size >= u64::try_from(hackathon.max_team_size).unwrap_or(0) {
        return Err(AppError::Conflict("Team is full".into()));
    }
    Ok(())
}

async fn request_response<C: ConnectionTrait>(
    db: &C,
    model: join_request::Model,
) -> Result<JoinRequestResponse, AppError> {
    let names = usernames(db, [model.sender_id, model.recipient_id]).await?;
    let sender = names.get(&model.sender_id).cloned().unwrap_or_default();
    let recipient = names.get(&model.recipient_id).cloned().unwrap_or_default();
    Ok(JoinRequestResponse::new(model, sender, recipient))
}
