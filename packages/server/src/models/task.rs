use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{double_option, validate_optional_position, validate_title};
use crate::entity::enums::{TaskPriority, TaskStatus};
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTaskRequest {
    #[schema(example = "Wire up the invite button")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Defaults to `todo`.
    pub status: Option<TaskStatus>,
    /// Defaults to `medium`.
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    /// Appended at the end when omitted.
    pub position: Option<i32>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// `null` unassigns.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub assignee_id: Option<Option<i32>>,
    /// `null` clears the due date.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub position: Option<i32>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    /// `todo`, `in_progress` or `done`.
    pub status: Option<String>,
    pub assignee_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TaskResponse {
    pub id: i32,
    pub project_id: i32,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_id: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::task::Model> for TaskResponse {
    fn from(m: crate::entity::task::Model) -> Self {
        Self {
            id: m.id,
            project_id: m.project_id,
            title: m.title,
            description: m.description,
            status: m.status,
            priority: m.priority,
            assignee_id: m.assignee_id,
            due_date: m.due_date,
            position: m.position,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.len() > 10_000 {
        return Err(AppError::Validation(
            "Description must be at most 10KB".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_task(req: &CreateTaskRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_description(&req.description)?;
    validate_optional_position(req.position)
}

pub fn validate_update_task(req: &UpdateTaskRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref description) = req.description {
        validate_description(description)?;
    }
    validate_optional_position(req.position)
}
