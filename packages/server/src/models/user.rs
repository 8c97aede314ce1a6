use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{Pagination, double_option, validate_https_url, validate_max_chars};
use crate::error::AppError;

pub const MAX_SKILLS: usize = 20;

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    /// Display name (max 64 chars). `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, example = "Alice W.")]
    pub display_name: Option<Option<String>>,
    /// Short biography (max 2000 chars). `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub bio: Option<Option<String>>,
    /// GitHub profile URL (https only). `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, example = "https://github.com/alice")]
    pub github_url: Option<Option<String>>,
    /// Replaces the whole skill list.
    #[schema(example = json!(["rust", "react"]))]
    pub skills: Option<Vec<String>>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateRoleRequest {
    #[schema(example = "organizer")]
    pub role: String,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive substring of username or display name.
    pub search: Option<String>,
    /// Exact skill (case-insensitive).
    pub skill: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserProfileResponse {
    pub id: i32,
    pub username: String,
    /// Only present for the user themselves and user managers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub github_url: Option<String>,
    pub role: String,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListItem {
    pub id: i32,
    pub username: String,
    pub display_name: Option<String>,
    pub role: String,
    pub skills: Vec<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserListItem>,
    pub pagination: Pagination,
}

impl UserProfileResponse {
    pub fn new(user: crate::entity::user::Model, skills: Vec<String>, show_email: bool) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: show_email.then_some(user.email),
            display_name: user.display_name,
            bio: user.bio,
            github_url: user.github_url,
            role: user.role,
            skills,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Normalize a single skill tag: trimmed, lowercased, 1-32 characters.
pub fn normalize_skill(raw: &str) -> Result<String, AppError> {
    let skill = raw.trim().to_lowercase();
    if skill.is_empty() || skill.chars().count() > 32 {
        return Err(AppError::Validation("Skills must be 1-32 characters".into()));
    }
    Ok(skill)
}

/// Normalize a skill list, dropping duplicates while keeping first-seen order.
pub fn normalize_skills(raw: &[String]) -> Result<Vec<String>, AppError> {
    let mut seen = HashSet::new();
    let mut skills = Vec::with_capacity(raw.len());
    for item in raw {
        let skill = normalize_skill(item)?;
        if seen.insert(skill.clone()) {
            skills.push(skill);
        }
    }
    if skills.len() > MAX_SKILLS {
        return Err(AppError::Validation(format!(
            "At most {MAX_SKILLS} skills are allowed"
        )));
    }
    Ok(skills)
}

pub fn validate_update_profile(req: &UpdateProfileRequest) -> Result<(), AppError> {
    if let Some(Some(ref name)) = req.display_name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation(
                "Display name must not be blank; use null to clear it".into(),
            ));
        }
        validate_max_chars(name, "Display name", 64)?;
    }
    if let Some(Some(ref bio)) = req.bio {
        validate_max_chars(bio, "Bio", 2000)?;
    }
    if let Some(Some(ref url)) = req.github_url {
        validate_https_url(url, "github_url")?;
    }
    if let Some(ref skills) = req.skills {
        normalize_skills(skills)?;
    }
    Ok(())
}
