use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{Pagination, double_option, validate_https_url, validate_title};
use crate::entity::enums::ProjectStatus;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateProjectRequest {
    #[schema(example = "Teammate matcher")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to `planning`.
    pub status: Option<ProjectStatus>,
    pub hackathon_id: Option<i32>,
    /// Caller must be a member; implies the team's hackathon.
    pub team_id: Option<i32>,
    #[schema(example = "https://github.com/devmate/matcher")]
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub repo_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub demo_url: Option<Option<String>>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// `planning`, `in_progress` or `completed`.
    pub status: Option<String>,
    pub hackathon_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProjectResponse {
    pub id: i32,
    pub owner_id: i32,
    pub hackathon_id: Option<i32>,
    pub team_id: Option<i32>,
    pub title: String,
    pub description: String,
    pub status: ProjectStatus,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::project::Model> for ProjectResponse {
    fn from(m: crate::entity::project::Model) -> Self {
        Self {
            id: m.id,
            owner_id: m.owner_id,
            hackathon_id: m.hackathon_id,
            team_id: m.team_id,
            title: m.title,
            description: m.description,
            status: m.status,
            repo_url: m.repo_url,
            demo_url: m.demo_url,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProjectListResponse {
    pub data: Vec<ProjectResponse>,
    pub pagination: Pagination,
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.len() > 100_000 {
        return Err(AppError::Validation(
            "Description must be at most 100KB".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_project(req: &CreateProjectRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_description(&req.description)?;
    if let Some(ref url) = req.repo_url {
        validate_https_url(url, "repo_url")?;
    }
    if let Some(ref url) = req.demo_url {
        validate_https_url(url, "demo_url")?;
    }
    Ok(())
}

pub fn validate_update_project(req: &UpdateProjectRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref description) = req.description {
        validate_description(description)?;
    }
    if let Some(Some(ref url)) = req.repo_url {
        validate_https_url(url, "repo_url")?;
    }
    if let Some(Some(ref url)) = req.demo_url {
        validate_https_url(url, "demo_url")?;
    }
    Ok(())
}
