use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTeamRequest {
    #[schema(example = "Borrow Checkers")]
    pub name: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateTeamRequest {
    #[schema(example = "Lifetime Elision")]
    pub name: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamMemberResponse {
    pub user_id: i32,
    pub username: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TeamResponse {
    pub id: i32,
    pub hackathon_id: i32,
    pub name: String,
    pub leader_id: i32,
    /// Ordered by join time; the leader is not necessarily first.
    pub members: Vec<TeamMemberResponse>,
    pub created_at: DateTime<Utc>,
}

/// Validate a trimmed team name (1-64 characters).
pub fn validate_team_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 64 {
        return Err(AppError::Validation(
            "Team name must be 1-64 characters".into(),
        ));
    }
    Ok(())
}

/// Name for a team formed by accepting a pair request, avoiding names already taken
/// (compared case-insensitively).
pub fn pair_team_name(sender_username: &str, taken: &[String]) -> String {
    let base = format!("{sender_username}'s team");
    let is_taken = |candidate: &str| {
        taken
            .iter()
            .any(|t| t.to_lowercase() == candidate.to_lowercase())
    };
    if !is_taken(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base} {n}");
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
