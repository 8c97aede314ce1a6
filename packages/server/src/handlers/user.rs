use axum::Json;
use axum::extract::{Path, Query, State};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, Query as SeaQuery};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{role, user, user_skill};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::shared::{Pagination, escape_like, page_params, trim_optional};
use crate::models::user::*;
use crate::state::AppState;
use crate::utils::user::{find_user, replace_skills, skills_by_user, skills_of};

#[utoipa::path(
    get,
    path = "/",
    tag = "Users",
    operation_id = "listUsers",
    summary = "Search user profiles",
    description = "Paginated list of users sorted by username. `search` matches username or display name case-insensitively; `skill` matches one normalized skill exactly.",
    params(UserListQuery),
    responses(
        (status = 200, description = "Users", body = UserListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(_auth_user, state, query))]
pub async fn list_users(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = user::Entity::find();

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim()).to_lowercase();
        if !term.is_empty() {
            let pattern = format!("%{}%", term);
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(user::Column::Username)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(user::Column::DisplayName)))
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }
    }

    if let Some(ref skill) = query.skill {
        let skill = normalize_skill(skill)?;
        select = select.filter(
            user::Column::Id.in_subquery(
                SeaQuery::select()
                    .column(user_skill::Column::UserId)
                    .from(user_skill::Entity)
                    .and_where(user_skill::Column::Skill.eq(skill))
                    .to_owned(),
            ),
        );
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let users = select
        .order_by_asc(user::Column::Username)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let mut skills = skills_by_user(&state.db, users.iter().map(|u| u.id)).await?;
    let data = users
        .into_iter()
        .map(|u| UserListItem {
            skills: skills.remove(&u.id).unwrap_or_default(),
            id: u.id,
            username: u.username,
            display_name: u.display_name,
            role: u.role,
        })
        .collect();

    Ok(Json(UserListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Users",
    operation_id = "getUser",
    summary = "Get a user profile",
    description = "Returns a public profile. The email address is only included for the user themselves and holders of `user:manage`.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Profile", body = UserProfileResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state), fields(id))]
pub async fn get_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserProfileResponse>, AppError> {
    let model = find_user(&state.db, id).await?;
    let skills = skills_of(&state.db, id).await?;
    let show_email = id == auth_user.user_id || auth_user.has_permission("user:manage");
    Ok(Json(UserProfileResponse::new(model, skills, show_email)))
}

#[utoipa::path(
    patch,
    path = "/me",
    tag = "Users",
    operation_id = "updateMyProfile",
    summary = "Update the caller's profile",
    description = "Partially updates the caller's profile. `null` clears `display_name`, `bio` or `github_url`; `skills` replaces the whole list. An empty payload returns the current profile unchanged.",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserProfileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state, payload), fields(user_id = auth_user.user_id))]
pub async fn update_me(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<UserProfileResponse>, AppError> {
    validate_update_profile(&payload)?;

    if payload == UpdateProfileRequest::default() {
        let existing = find_user(&state.db, auth_user.user_id).await?;
        let skills = skills_of(&state.db, existing.id).await?;
        return Ok(Json(UserProfileResponse::new(existing, skills, true)));
    }

    let txn = state.db.begin().await?;
    let existing = find_user(&txn, auth_user.user_id).await?;
    let mut active: user::ActiveModel = existing.into();

    if let Some(display_name) = payload.display_name {
        active.display_name = Set(trim_optional(display_name));
    }
    if let Some(bio) = payload.bio {
        active.bio = Set(bio);
    }
    if let Some(github_url) = payload.github_url {
        active.github_url = Set(trim_optional(github_url));
    }
    active.updated_at = Set(chrono::Utc::now());
    let model = active.update(&txn).await?;

    if let Some(ref raw) = payload.skills {
        replace_skills(&txn, model.id, &normalize_skills(raw)?).await?;
    }
    let skills = skills_of(&txn, model.id).await?;
    txn.commit().await?;

    Ok(Json(UserProfileResponse::new(model, skills, true)))
}

#[utoipa::path(
    patch,
    path = "/{id}/role",
    tag = "Users",
    operation_id = "updateUserRole",
    summary = "Change a user's role",
    description = "Assigns one of the seeded roles. Requires `user:manage`. The new permissions apply from the user's next login.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = UserProfileResponse),
        (status = 400, description = "Unknown role (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, state, payload), fields(id, role = %payload.role))]
pub async fn update_role(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateRoleRequest>,
) -> Result<Json<UserProfileResponse>, AppError> {
    auth_user.require_permission("user:manage")?;

    let role_name = payload.role.trim();
    if role::Entity::find_by_id(role_name)
        .one(&state.db)
        .await?
        .is_none()
    {
        return Err(AppError::Validation(format!("Unknown role '{role_name}'")));
    }

    let existing = find_user(&state.db, id).await?;
    let mut active: user::ActiveModel = existing.into();
    active.role = Set(role_name.to_string());
    active.updated_at = Set(chrono::Utc::now());
    let model = active.update(&state.db).await?;

    let skills = skills_of(&state.db, model.id).await?;
    Ok(Json(UserProfileResponse::new(model, skills, true)))
}
