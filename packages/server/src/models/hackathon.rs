use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{Pagination, double_option, validate_max_chars, validate_title};
use crate::entity::enums::HackathonMode;
use crate::error::AppError;

pub const MIN_TEAM_SIZE: i32 = 2;
pub const MAX_TEAM_SIZE: i32 = 10;

/// Phase of a hackathon, derived from its schedule at request time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HackathonStatus {
    Upcoming,
    Ongoing,
    Completed,
}

impl HackathonStatus {
    pub fn at(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if now < start {
            Self::Upcoming
        } else if now < end {
            Self::Ongoing
        } else {
            Self::Completed
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim() {
            "upcoming" => Ok(Self::Upcoming),
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            _ => Err(AppError::Validation(
                "status must be one of: upcoming, ongoing, completed".into(),
            )),
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateHackathonRequest {
    #[schema(example = "Rust Spring Jam")]
    pub title: String,
    /// Markdown description.
    pub description: String,
    #[schema(example = "Berlin")]
    pub location: Option<String>,
    pub mode: HackathonMode,
    #[schema(example = "$5,000 and cloud credits")]
    pub prize: Option<String>,
    /// Maximum members per team (2-10).
    #[schema(example = 4)]
    pub max_team_size: i32,
    /// Defaults to `start_time` when omitted.
    pub registration_deadline: Option<DateTime<Utc>>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateHackathonRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `null` clears the location.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
    pub mode: Option<HackathonMode>,
    /// `null` clears the prize.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub prize: Option<Option<String>>,
    pub max_team_size: Option<i32>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HackathonListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
    /// `upcoming`, `ongoing` or `completed`.
    pub status: Option<String>,
    /// `online`, `offline` or `hybrid`.
    pub mode: Option<String>,
    /// `start_time` (default), `created_at` or `title`.
    pub sort_by: Option<String>,
    /// `asc` or `desc`.
    pub sort_order: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SetReadyRequest {
    /// `true` when looking for a team.
    pub ready: bool,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ParticipantListQuery {
    /// Only participants with this readiness.
    pub ready: Option<bool>,
    /// Only participants with this skill.
    pub skill: Option<String>,
    /// Only participants without a team.
    pub unassigned: Option<bool>,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize, utoipa::ToSchema)]
pub struct HackathonResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub mode: HackathonMode,
    pub prize: Option<String>,
    pub max_team_size: i32,
    pub registration_deadline: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: HackathonStatus,
    pub organizer_id: i32,
    pub organizer_username: String,
    pub participant_count: u64,
    pub ready_count: u64,
    pub team_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Participation counters shown on the hackathon detail page.
#[derive(Default, Clone, Copy)]
pub struct HackathonCounts {
    pub participants: u64,
    pub ready: u64,
    pub teams: u64,
}

impl HackathonResponse {
    pub fn new(
        m: crate::entity::hackathon::Model,
        organizer_username: String,
        counts: HackathonCounts,
    ) -> Self {
        Self {
            status: HackathonStatus::at(m.start_time, m.end_time, Utc::now()),
            id: m.id,
            title: m.title,
            description: m.description,
            location: m.location,
            mode: m.mode,
            prize: m.prize,
            max_team_size: m.max_team_size,
            registration_deadline: m.registration_deadline,
            start_time: m.start_time,
            end_time: m.end_time,
            organizer_id: m.organizer_id,
            organizer_username,
            participant_count: counts.participants,
            ready_count: counts.ready,
            team_count: counts.teams,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HackathonListItem {
    pub id: i32,
    pub title: String,
    pub location: Option<String>,
    pub mode: HackathonMode,
    pub prize: Option<String>,
    pub max_team_size: i32,
    pub registration_deadline: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: HackathonStatus,
    pub organizer_id: i32,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::hackathon::Model> for HackathonListItem {
    fn from(m: crate::entity::hackathon::Model) -> Self {
        Self {
            status: HackathonStatus::at(m.start_time, m.end_time, Utc::now()),
            id: m.id,
            title: m.title,
            location: m.location,
            mode: m.mode,
            prize: m.prize,
            max_team_size: m.max_team_size,
            registration_deadline: m.registration_deadline,
            start_time: m.start_time,
            end_time: m.end_time,
            organizer_id: m.organizer_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HackathonListResponse {
    pub data: Vec<HackathonListItem>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ParticipantResponse {
    pub hackathon_id: i32,
    pub user_id: i32,
    pub username: String,
    pub display_name: Option<String>,
    pub skills: Vec<String>,
    pub ready: bool,
    pub team_id: Option<i32>,
    pub registered_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.trim().is_empty() || description.len() > 100_000 {
        return Err(AppError::Validation(
            "Description must be non-empty and at most 100KB".into(),
        ));
    }
    Ok(())
}

fn validate_team_size(size: i32) -> Result<(), AppError> {
    if !(MIN_TEAM_SIZE..=MAX_TEAM_SIZE).contains(&size) {
        return Err(AppError::Validation(format!(
            "max_team_size must be between {MIN_TEAM_SIZE} and {MAX_TEAM_SIZE}"
        )));
    }
    Ok(())
}

/// Cross-field schedule check: start < end and deadline <= end.
pub fn validate_schedule(
    registration_deadline: DateTime<Utc>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Result<(), AppError> {
    if end_time <= start_time {
        return Err(AppError::Validation(
            "end_time must be after start_time".into(),
        ));
    }
    if registration_deadline > end_time {
        return Err(AppError::Validation(
            "registration_deadline must not be after end_time".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_hackathon(req: &CreateHackathonRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_description(&req.description)?;
    if let Some(ref location) = req.location {
        validate_max_chars(location.trim(), "Location", 256)?;
    }
    if let Some(ref prize) = req.prize {
        validate_max_chars(prize.trim(), "Prize", 256)?;
    }
    validate_team_size(req.max_team_size)?;
    validate_schedule(
        req.registration_deadline.unwrap_or(req.start_time),
        req.start_time,
        req.end_time,
    )
}

pub fn validate_update_hackathon(req: &UpdateHackathonRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref description) = req.description {
        validate_description(description)?;
    }
    if let Some(Some(ref location)) = req.location {
        validate_max_chars(location.trim(), "Location", 256)?;
    }
    if let Some(Some(ref prize)) = req.prize {
        validate_max_chars(prize.trim(), "Prize", 256)?;
    }
    if let Some(size) = req.max_team_size {
        validate_team_size(size)?;
    }
    Ok(())
}
