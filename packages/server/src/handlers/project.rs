use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::enums::{ProjectStatus, parse_enum};
use crate::entity::{project, task};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::project::*;
use crate::models::shared::{Pagination, page_params, trim_optional};
use crate::state::AppState;
use crate::utils::hackathon::{find_hackathon, require_participant};
use crate::utils::project::{
    find_accessible_project, project_access_condition, require_project_owner,
};
use crate::utils::team::{find_team, is_team_member};

#[utoipa::path(
    post,
    path = "/",
    tag = "Projects",
    operation_id = "createProject",
    summary = "Create a project",
    description = "Creates a project owned by the caller. With `team_id` the caller must be a member and the project is attached to that team's hackathon. With only `hackathon_id` the caller must be registered for it.",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not a team member or not registered (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Team or hackathon not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state, payload), fields(title = %payload.title))]
pub async fn create_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_project(&payload)?;

    let hackathon_id = match payload.team_id {
        Some(team_id) => {
            let team = find_team(&state.db, team_id).await?;
            if !is_team_member(&state.db, team_id, auth_user.user_id).await? {
                return Err(AppError::PermissionDenied);
            }
            if payload.hackathon_id.is_some_and(|h| h != team.hackathon_id) {
                return Err(AppError::Validation(
                    "hackathon_id does not match the team's hackathon".into(),
                ));
            }
            Some(team.hackathon_id)
        }
        None => match payload.hackathon_id {
            Some(hackathon_id) => {
                find_hackathon(&state.db, hackathon_id).await?;
                require_participant(&state.db, hackathon_id, auth_user.user_id).await?;
                Some(hackathon_id)
            }
            None => None,
        },
    };

    let now = chrono::Utc::now();
    let model = project::ActiveModel {
        owner_id: Set(auth_user.user_id),
        hackathon_id: Set(hackathon_id),
        team_id: Set(payload.team_id),
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description),
        status: Set(payload.status.unwrap_or_default()),
        repo_url: Set(trim_optional(payload.repo_url)),
        demo_url: Set(trim_optional(payload.demo_url)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(ProjectResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Projects",
    operation_id = "listProjects",
    summary = "List accessible projects",
    description = "Paginated projects the caller owns or that belong to one of their teams (all projects with `project:manage`), newest first.",
    params(ProjectListQuery),
    responses(
        (status = 200, description = "Projects", body = ProjectListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state, query), fields(user_id = auth_user.user_id))]
pub async fn list_projects(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ProjectListQuery>,
) -> Result<Json<ProjectListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = project::Entity::find();
    if let Some(cond) = project_access_condition(&state.db, &auth_user).await? {
        select = select.filter(cond);
    }
    if let Some(ref raw) = query.status {
        let status: ProjectStatus = parse_enum(raw, "status")?;
        select = select.filter(project::Column::Status.eq(status));
    }
    if let Some(hackathon_id) = query.hackathon_id {
        select = select.filter(project::Column::HackathonId.eq(hackathon_id));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_desc(project::Column::CreatedAt)
        .order_by_desc(project::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(ProjectResponse::from)
        .collect();

    Ok(Json(ProjectListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Projects",
    operation_id = "getProject",
    summary = "Get a project",
    description = "Visible to the owner, members of the linked team and holders of `project:manage`. Returns 404 (not 403) otherwise.",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project", body = ProjectResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state), fields(id))]
pub async fn get_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProjectResponse>, AppError> {
    let model = find_accessible_project(&state.db, &auth_user, id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Projects",
    operation_id = "updateProject",
    summary = "Update a project",
    description = "Partially updates a project the caller can access. `null` clears `repo_url` or `demo_url`. An empty payload returns the project unchanged.",
    params(("id" = i32, Path, description = "Project ID")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated", body = ProjectResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state, payload), fields(id))]
pub async fn update_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateProjectRequest>,
) -> Result<Json<ProjectResponse>, AppError> {
    validate_update_project(&payload)?;

    let existing = find_accessible_project(&state.db, &auth_user, id).await?;
    if payload == UpdateProjectRequest::default() {
        return Ok(Json(existing.into()));
    }

    let mut active: project::ActiveModel = existing.into();
    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if let Some(repo_url) = payload.repo_url {
        active.repo_url = Set(trim_optional(repo_url));
    }
    if let Some(demo_url) = payload.demo_url {
        active.demo_url = Set(trim_optional(demo_url));
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&state.db).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Projects",
    operation_id = "deleteProject",
    summary = "Delete a project",
    description = "Deletes the project and its tasks. Allowed for the owner and holders of `project:manage`.",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state), fields(id))]
pub async fn delete_project(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let existing = find_accessible_project(&state.db, &auth_user, id).await?;
    require_project_owner(&auth_user, &existing)?;

    let txn = state.db.begin().await?;
    task::Entity::delete_many()
        .filter(task::Column::ProjectId.eq(id))
        .exec(&txn)
        .await?;
    project::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}
