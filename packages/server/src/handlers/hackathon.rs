use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, Query as SeaQuery};
use sea_orm::*;
use tracing::instrument;

use crate::entity::enums::{HackathonMode, JoinRequestStatus, parse_enum};
use crate::entity::{
    hackathon, hackathon_participant, join_request, project, team, team_member, user, user_skill,
};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::hackathon::*;
use crate::models::shared::{Pagination, escape_like, page_params, trim_optional};
use crate::models::user::normalize_skill;
use crate::state::AppState;
use crate::utils::hackathon::{
    find_hackathon, find_hackathon_for_update, find_participant, hackathon_counts,
    require_hackathon_authority,
};
use crate::utils::team::{find_membership, team_size};
use crate::utils::user::{find_user, skills_by_user};

#[utoipa::path(
    post,
    path = "/",
    tag = "Hackathons",
    operation_id = "createHackathon",
    summary = "Create a hackathon",
    description = "Creates a hackathon organized by the caller. Requires `hackathon:create`. `registration_deadline` defaults to `start_time`.",
    request_body = CreateHackathonRequest,
    responses(
        (status = 201, description = "Hackathon created", body = HackathonResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state, payload), fields(title = %payload.title))]
pub async fn create_hackathon(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateHackathonRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("hackathon:create")?;
    validate_create_hackathon(&payload)?;

    let now = chrono::Utc::now();
    let model = hackathon::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description),
        location: Set(trim_optional(payload.location)),
        mode: Set(payload.mode),
        prize: Set(trim_optional(payload.prize)),
        max_team_size: Set(payload.max_team_size),
        registration_deadline: Set(payload.registration_deadline.unwrap_or(payload.start_time)),
        start_time: Set(payload.start_time),
        end_time: Set(payload.end_time),
        organizer_id: Set(auth_user.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(hackathon_id = model.id, "Hackathon created");
    Ok((
        StatusCode::CREATED,
        Json(HackathonResponse::new(
            model,
            auth_user.username,
            HackathonCounts::default(),
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Hackathons",
    operation_id = "listHackathons",
    summary = "List hackathons",
    description = "Paginated list with optional title search and `status`/`mode` filters. Sorts by `start_time` (ascending by default), `created_at` or `title` (descending by default); an explicit `sort_order` wins.",
    params(HackathonListQuery),
    responses(
        (status = 200, description = "Hackathons", body = HackathonListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(_auth_user, state, query))]
pub async fn list_hackathons(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<HackathonListQuery>,
) -> Result<Json<HackathonListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = hackathon::Entity::find();

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(hackathon::Column::Title)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    if let Some(ref raw) = query.status {
        let now = chrono::Utc::now();
        select = match HackathonStatus::parse(raw)? {
            HackathonStatus::Upcoming => select.filter(hackathon::Column::StartTime.gt(now)),
            HackathonStatus::Ongoing => select
                .filter(hackathon::Column::StartTime.lte(now))
                .filter(hackathon::Column::EndTime.gt(now)),
            HackathonStatus::Completed => select.filter(hackathon::Column::EndTime.lte(now)),
        };
    }

    if let Some(ref raw) = query.mode {
        let mode: HackathonMode = parse_enum(raw, "mode")?;
        select = select.filter(hackathon::Column::Mode.eq(mode));
    }

    let (sort_column, default_order) = match query.sort_by.as_deref().unwrap_or("start_time") {
        "start_time" => (hackathon::Column::StartTime, Order::Asc),
        "created_at" => (hackathon::Column::CreatedAt, Order::Desc),
        "title" => (hackathon::Column::Title, Order::Desc),
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: start_time, created_at, title".into(),
            ));
        }
    };
    let sort_order = match query.sort_order.as_deref() {
        None => default_order,
        Some("asc") => Order::Asc,
        Some("desc") => Order::Desc,
        Some(_) => {
            return Err(AppError::Validation(
                "sort_order must be one of: asc, desc".into(),
            ));
        }
    };

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by(sort_column, sort_order)
        .order_by_asc(hackathon::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(HackathonListItem::from)
        .collect();

    Ok(Json(HackathonListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Hackathons",
    operation_id = "getHackathon",
    summary = "Get a hackathon",
    description = "Returns the hackathon with its participant, ready and team counts.",
    params(("id" = i32, Path, description = "Hackathon ID")),
    responses(
        (status = 200, description = "Hackathon", body = HackathonResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Hackathon not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(_auth_user, state), fields(id))]
pub async fn get_hackathon(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<HackathonResponse>, AppError> {
    let model = find_hackathon(&state.db, id).await?;
    Ok(Json(hackathon_response(&state.db, model).await?))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Hackathons",
    operation_id = "updateHackathon",
    summary = "Update a hackathon",
    description = "Partially updates a hackathon. Allowed for its organizer and holders of `hackathon:manage`. `null` clears `location` or `prize`. Schedule checks run against the stored values; `max_team_size` cannot drop below the size of an existing team.",
    params(("id" = i32, Path, description = "Hackathon ID")),
    request_body = UpdateHackathonRequest,
    responses(
        (status = 200, description = "Hackathon updated", body = HackathonResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Hackathon not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "A team is larger than the new limit (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state, payload), fields(id))]
pub async fn update_hackathon(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateHackathonRequest>,
) -> Result<Json<HackathonResponse>, AppError> {
    validate_update_hackathon(&payload)?;

    if payload == UpdateHackathonRequest::default() {
        let existing = find_hackathon(&state.db, id).await?;
        require_hackathon_authority(&auth_user, &existing)?;
        return Ok(Json(hackathon_response(&state.db, existing).await?));
    }

    let txn = state.db.begin().await?;
    let existing = find_hackathon_for_update(&txn, id).await?;
    require_hackathon_authority(&auth_user, &existing)?;

    validate_schedule(
        payload
            .registration_deadline
            .unwrap_or(existing.registration_deadline),
        payload.start_time.unwrap_or(existing.start_time),
        payload.end_time.unwrap_or(existing.end_time),
    )?;

    if let Some(size) = payload.max_team_size {
        let largest = largest_team_size(&txn, id).await?;
        if largest > u64::try_from(size).unwrap_or(0) {
            return Err(AppError::Conflict(format!(
                "A team already has {largest} members; max_team_size cannot be lower"
            )));
        }
    }

    let mut active: hackathon::ActiveModel = existing.into();
    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(location) = payload.location {
        active.location = Set(trim_optional(location));
    }
    if let Some(mode) = payload.mode {
        active.mode = Set(mode);
    }
    if let Some(prize) = payload.prize {
        active.prize = Set(trim_optional(prize));
    }
    if let Some(size) = payload.max_team_size {
        active.max_team_size = Set(size);
    }
    if let Some(deadline) = payload.registration_deadline {
        active.registration_deadline = Set(deadline);
    }
    if let Some(start_time) = payload.start_time {
        active.start_time = Set(start_time);
    }
    if let Some(end_time) = payload.end_time {
        active.end_time = Set(end_time);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(hackathon_response(&state.db, model).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Hackathons",
    operation_id = "deleteHackathon",
    summary = "Delete a hackathon",
    description = "Deletes the hackathon with its participants, teams and join requests. Projects built for it are kept but unlinked. Allowed for its organizer and holders of `hackathon:manage`.",
    params(("id" = i32, Path, description = "Hackathon ID")),
    responses(
        (status = 204, description = "Hackathon deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Hackathon not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state), fields(id))]
pub async fn delete_hackathon(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let existing = find_hackathon_for_update(&txn, id).await?;
    require_hackathon_authority(&auth_user, &existing)?;

    let team_ids: Vec<i32> = team::Entity::find()
        .filter(team::Column::HackathonId.eq(id))
        .select_only()
        .column(team::Column::Id)
        .into_tuple()
        .all(&txn)
        .await?;

    join_request::Entity::delete_many()
        .filter(join_request::Column::HackathonId.eq(id))
        .exec(&txn)
        .await?;
    project::Entity::update_many()
        .filter(project::Column::HackathonId.eq(id))
        .col_expr(project::Column::HackathonId, Expr::value(Option::<i32>::None))
        .col_expr(project::Column::TeamId, Expr::value(Option::<i32>::None))
        .exec(&txn)
        .await?;
    if !team_ids.is_empty() {
        project::Entity::update_many()
            .filter(project::Column::TeamId.is_in(team_ids))
            .col_expr(project::Column::TeamId, Expr::value(Option::<i32>::None))
            .exec(&txn)
            .await?;
    }
    team_member::Entity::delete_many()
        .filter(team_member::Column::HackathonId.eq(id))
        .exec(&txn)
        .await?;
    team::Entity::delete_many()
        .filter(team::Column::HackathonId.eq(id))
        .exec(&txn)
        .await?;
    hackathon_participant::Entity::delete_many()
        .filter(hackathon_participant::Column::HackathonId.eq(id))
        .exec(&txn)
        .await?;
    hackathon::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!(hackathon_id = id, "Hackathon deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/register",
    tag = "Participation",
    operation_id = "registerForHackathon",
    summary = "Register for a hackathon",
    description = "Registers the caller as a participant. Closed after `registration_deadline`.",
    params(("id" = i32, Path, description = "Hackathon ID")),
    responses(
        (status = 201, description = "Registered", body = ParticipantResponse),
        (status = 400, description = "Registration closed (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Hackathon not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already registered (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state), fields(id, user_id = auth_user.user_id))]
pub async fn register(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let hackathon = find_hackathon_for_update(&txn, id).await?;
    if chrono::Utc::now() > hackathon.registration_deadline {
        return Err(AppError::Validation(
            "Registration for this hackathon is closed".into(),
        ));
    }
    if find_participant(&txn, id, auth_user.user_id).await?.is_some() {
        return Err(AppError::Conflict(
            "Already registered for this hackathon".into(),
        ));
    }

    let row = hackathon_participant::ActiveModel {
        hackathon_id: Set(id),
        user_id: Set(auth_user.user_id),
        ready: Set(false),
        registered_at: Set(chrono::Utc::now()),
    };
    let participant = row.insert(&txn).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Already registered for this hackathon".into())
        }
        _ => AppError::from(e),
    })?;

    let response = participant_response(&txn, participant).await?;
    txn.commit().await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    delete,
    path = "/{id}/register",
    tag = "Participation",
    operation_id = "unregisterFromHackathon",
    summary = "Unregister from a hackathon",
    description = "Removes the caller's registration and their pending join requests in this hackathon. The caller must leave their team first.",
    params(("id" = i32, Path, description = "Hackathon ID")),
    responses(
        (status = 204, description = "Unregistered"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not registered (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Still in a team (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state), fields(id, user_id = auth_user.user_id))]
pub async fn unregister(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    find_hackathon_for_update(&txn, id).await?;

    if find_participant(&txn, id, auth_user.user_id).await?.is_none() {
        return Err(AppError::NotFound(
            "You are not registered for this hackathon".into(),
        ));
    }
    if find_membership(&txn, id, auth_user.user_id).await?.is_some() {
        return Err(AppError::Conflict(
            "Leave your team before unregistering".into(),
        ));
    }

    join_request::Entity::delete_many()
        .filter(join_request::Column::HackathonId.eq(id))
        .filter(join_request::Column::Status.eq(JoinRequestStatus::Pending))
        .filter(
            Condition::any()
                .add(join_request::Column::SenderId.eq(auth_user.user_id))
                .add(join_request::Column::RecipientId.eq(auth_user.user_id)),
        )
        .exec(&txn)
        .await?;
    hackathon_participant::Entity::delete_by_id((id, auth_user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/{id}/ready",
    tag = "Participation",
    operation_id = "setReady",
    summary = "Set the caller's readiness",
    description = "Marks the caller as looking for a team (or not). A member of a full team cannot become ready.",
    params(("id" = i32, Path, description = "Hackathon ID")),
    request_body = SetReadyRequest,
    responses(
        (status = 200, description = "Readiness updated", body = ParticipantResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Hackathon not found or not registered (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Team is already full (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state, payload), fields(id, user_id = auth_user.user_id, ready = payload.ready))]
pub async fn set_ready(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<SetReadyRequest>,
) -> Result<Json<ParticipantResponse>, AppError> {
    let txn = state.db.begin().await?;
    let hackathon = find_hackathon_for_update(&txn, id).await?;

    let participant = find_participant(&txn, id, auth_user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("You are not registered for this hackathon".into()))?;

    if payload.ready
        && let Some(membership) = find_membership(&txn, id, auth_user.user_id).await?
    {
        let size = team_size(&txn, membership.team_id).await?;
        if size >= u64::try_from(hackathon.max_team_size).unwrap_or(0) {
            return Err(AppError::Conflict(
                "Your team is already full".into(),
            ));
        }
    }

    let mut active: hackathon_participant::ActiveModel = participant.into();
    active.ready = Set(payload.ready);
    let participant = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(participant_response(&state.db, participant).await?))
}

#[utoipa::path(
    get,
    path = "/{id}/participants",
    tag = "Participation",
    operation_id = "listParticipants",
    summary = "List participants",
    description = "All participants in registration order, with skills, readiness and team. Filter by `ready`, `skill`, or `unassigned=true` for participants without a team.",
    params(("id" = i32, Path, description = "Hackathon ID"), ParticipantListQuery),
    responses(
        (status = 200, description = "Participants", body = Vec<ParticipantResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Hackathon not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(_auth_user, state, query), fields(id))]
pub async fn list_participants(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<ParticipantListQuery>,
) -> Result<Json<Vec<ParticipantResponse>>, AppError> {
    find_hackathon(&state.db, id).await?;

    let mut select = hackathon_participant::Entity::find()
        .filter(hackathon_participant::Column::HackathonId.eq(id));

    if let Some(ready) = query.ready {
        select = select.filter(hackathon_participant::Column::Ready.eq(ready));
    }
    if let Some(ref skill) = query.skill {
        let skill = normalize_skill(skill)?;
        select = select.filter(
            hackathon_participant::Column::UserId.in_subquery(
                SeaQuery::select()
                    .column(user_skill::Column::UserId)
                    .from(user_skill::Entity)
                    .and_where(user_skill::Column::Skill.eq(skill))
                    .to_owned(),
            ),
        );
    }
    if query.unassigned == Some(true) {
        select = select.filter(
            hackathon_participant::Column::UserId.not_in_subquery(
                SeaQuery::select()
                    .column(team_member::Column::UserId)
                    .from(team_member::Entity)
                    .and_where(team_member::Column::HackathonId.eq(id))
                    .to_owned(),
            ),
        );
    }

    let rows = select
        .find_also_related(user::Entity)
        .order_by_asc(hackathon_participant::Column::RegisteredAt)
        .order_by_asc(hackathon_participant::Column::UserId)
        .all(&state.db)
        .await?;

    let teams: HashMap<i32, i32> = team_member::Entity::find()
        .filter(team_member::Column::HackathonId.eq(id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|m| (m.user_id, m.team_id))
        .collect();
    let mut skills = skills_by_user(&state.db, rows.iter().map(|(p, _)| p.user_id)).await?;

    let data = rows
        .into_iter()
        .map(|(p, u)| {
            let (username, display_name) = u
                .map(|u| (u.username, u.display_name))
                .unwrap_or_default();
            ParticipantResponse {
                hackathon_id: p.hackathon_id,
                user_id: p.user_id,
                username,
                display_name,
                skills: skills.remove(&p.user_id).unwrap_or_default(),
                ready: p.ready,
                team_id: teams.get(&p.user_id).copied(),
                registered_at: p.registered_at,
            }
        })
        .collect();

    Ok(Json(data))
}

async fn hackathon_response<C: ConnectionTrait>(
    db: &C,
    model: hackathon::Model,
) -> Result<HackathonResponse, AppError> {
    let organizer = find_user(db, model.organizer_id).await?;
    let counts = hackathon_counts(db, model.id).await?;
    Ok(HackathonResponse::new(model, organizer.username, counts))
}

async fn participant_response<C: ConnectionTrait>(
    db: &C,
    participant: hackathon_participant::Model,
) -> Result<ParticipantResponse, AppError> {
    let user = find_user(db, participant.user_id).await?;
    let skills = crate::utils::user::skills_of(db, user.id).await?;
    let team_id = find_membership(db, participant.hackathon_id, user.id)
        .await?
        .map(|m| m.team_id);
    Ok(ParticipantResponse {
        hackathon_id: participant.hackathon_id,
        user_id: user.id,
        username: user.username,
        display_name: user.display_name,
        skills,
        ready: participant.ready,
        team_id,
        registered_at: participant.registered_at,
    })
}

async fn largest_team_size<C: ConnectionTrait>(db: &C, hackathon_id: i32) -> Result<u64, AppError> {
    let mut sizes: HashMap<i32, u64> = HashMap::new();
    for member in team_member::Entity::find()
        .filter(team_member::Column::HackathonId.eq(hackathon_id))
        .all(db)
        .await?
    {
        *sizes.entry(member.team_id).or_default() += 1;
    }
    Ok(sizes.into_values().max().unwrap_or(0))
}
