use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::enums::{TaskStatus, parse_enum};
use crate::entity::task;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::task::*;
use crate::state::AppState;
use crate::utils::project::{find_accessible_project, require_valid_assignee};

#[utoipa::path(
    get,
    path = "/{id}/tasks",
    tag = "Tasks",
    operation_id = "listTasks",
    summary = "List a project's tasks",
    description = "Ordered by position, then ID. Filter by `status` or `assignee_id`.",
    params(("id" = i32, Path, description = "Project ID"), TaskListQuery),
    responses(
        (status = 200, description = "Tasks", body = Vec<TaskResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state, query), fields(id))]
pub async fn list_tasks(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    find_accessible_project(&state.db, &auth_user, id).await?;

    let mut select = task::Entity::find().filter(task::Column::ProjectId.eq(id));
    if let Some(ref raw) = query.status {
        let status: TaskStatus = parse_enum(raw, "status")?;
        select = select.filter(task::Column::Status.eq(status));
    }
    if let Some(assignee_id) = query.assignee_id {
        select = select.filter(task::Column::AssigneeId.eq(assignee_id));
    }

    let data = select
        .order_by_asc(task::Column::Position)
        .order_by_asc(task::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(TaskResponse::from)
        .collect();

    Ok(Json(data))
}

#[utoipa::path(
    post,
    path = "/{id}/tasks",
    tag = "Tasks",
    operation_id = "createTask",
    summary = "Create a task",
    description = "Adds a task to the project. Position defaults to the end of the list. The assignee must be the project owner or a member of its team.",
    params(("id" = i32, Path, description = "Project ID")),
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state, payload), fields(id, title = %payload.title))]
pub async fn create_task(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CreateTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_task(&payload)?;

    let txn = state.db.begin().await?;
    let project = find_accessible_project(&txn, &auth_user, id).await?;
    if let Some(assignee_id) = payload.assignee_id {
        require_valid_assignee(&txn, &project, assignee_id).await?;
    }

    let position = match payload.position {
        Some(p) => p,
        None => next_task_position(&txn, id).await?,
    };

    let now = chrono::Utc::now();
    let model = task::ActiveModel {
        project_id: Set(id),
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description),
        status: Set(payload.status.unwrap_or_default()),
        priority: Set(payload.priority.unwrap_or_default()),
        assignee_id: Set(payload.assignee_id),
        due_date: Set(payload.due_date),
        position: Set(position),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(TaskResponse::from(model))))
}

#[utoipa::path(
    patch,
    path = "/{id}/tasks/{task_id}",
    tag = "Tasks",
    operation_id = "updateTask",
    summary = "Update a task",
    description = "Partially updates a task. `null` unassigns it or clears the due date.",
    params(
        ("id" = i32, Path, description = "Project ID"),
        ("task_id" = i32, Path, description = "Task ID"),
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Project or task not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state, payload), fields(id, task_id))]
pub async fn update_task(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, task_id)): Path<(i32, i32)>,
    AppJson(payload): AppJson<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, AppError> {
    validate_update_task(&payload)?;

    let project = find_accessible_project(&state.db, &auth_user, id).await?;
    let existing = find_task(&state.db, id, task_id).await?;
    if payload == UpdateTaskRequest::default() {
        return Ok(Json(existing.into()));
    }
    if let Some(Some(assignee_id)) = payload.assignee_id {
        require_valid_assignee(&state.db, &project, assignee_id).await?;
    }

    let mut active: task::ActiveModel = existing.into();
    if let Some(ref title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if let Some(priority) = payload.priority {
        active.priority = Set(priority);
    }
    if let Some(assignee_id) = payload.assignee_id {
        active.assignee_id = Set(assignee_id);
    }
    if let Some(due_date) = payload.due_date {
        active.due_date = Set(due_date);
    }
    if let Some(position) = payload.position {
        active.position = Set(position);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&state.db).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}/tasks/{task_id}",
    tag = "Tasks",
    operation_id = "deleteTask",
    summary = "Delete a task",
    params(
        ("id" = i32, Path, description = "Project ID"),
        ("task_id" = i32, Path, description = "Task ID"),
    ),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Project or task not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state), fields(id, task_id))]
pub async fn delete_task(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, task_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    find_accessible_project(&state.db, &auth_user, id).await?;
    find_task(&state.db, id, task_id).await?;
    task::Entity::delete_by_id(task_id).exec(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn find_task<C: ConnectionTrait>(
    db: &C,
    project_id: i32,
    task_id: i32,
) -> Result<task::Model, AppError> {
    task::Entity::find_by_id(task_id)
        .filter(task::Column::ProjectId.eq(project_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))
}

async fn next_task_position<C: ConnectionTrait>(db: &C, project_id: i32) -> Result<i32, AppError> {
    let max_pos: Option<i32> = task::Entity::find()
        .filter(task::Column::ProjectId.eq(project_id))
        .select_only()
        .column_as(task::Column::Position.max(), "max_pos")
        .into_tuple::<Option<i32>>()
        .one(db)
        .await?
        .flatten();
    max_pos
        .unwrap_or(-1)
        .checked_add(1)
        .ok_or_else(|| AppError::Validation("Position overflow".into()))
}
