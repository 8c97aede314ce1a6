use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::validate_max_chars;
use super::team::TeamResponse;
use crate::entity::enums::{JoinRequestKind, JoinRequestStatus};
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SendJoinRequest {
    /// Participant the request is addressed to.
    #[schema(example = 7)]
    pub recipient_id: i32,
    /// Optional note (max 500 chars).
    #[schema(example = "We need a frontend dev, interested?")]
    pub message: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JoinRequestListQuery {
    /// `incoming` (default) or `outgoing`.
    pub direction: Option<String>,
    /// `pending`, `accepted` or `rejected`.
    pub status: Option<String>,
    pub hackathon_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct JoinRequestResponse {
    pub id: i32,
    pub hackathon_id: i32,
    pub sender_id: i32,
    pub sender_username: String,
    pub recipient_id: i32,
    pub recipient_username: String,
    pub kind: JoinRequestKind,
    pub team_id: Option<i32>,
    pub message: Option<String>,
    pub status: JoinRequestStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl JoinRequestResponse {
    pub fn new(
        m: crate::entity::join_request::Model,
        sender_username: String,
        recipient_username: String,
    ) -> Self {
        Self {
            id: m.id,
            hackathon_id: m.hackathon_id,
            sender_id: m.sender_id,
            sender_username,
            recipient_id: m.recipient_id,
            recipient_username,
            kind: m.kind,
            team_id: m.team_id,
            message: m.message,
            status: m.status,
            created_at: m.created_at,
            responded_at: m.responded_at,
        }
    }
}

/// Result of accepting a request: the updated request and the team it produced.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AcceptJoinRequestResponse {
    pub request: JoinRequestResponse,
    pub team: TeamResponse,
}

/// Which side of the request is currently in a team.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TeamPosition {
    pub team_id: i32,
    pub is_leader: bool,
}

/// The membership change a join request stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Formation {
    /// Recipient joins the sender's team.
    Invite { team_id: i32 },
    /// Sender joins the recipient's team.
    Apply { team_id: i32 },
    /// Both form a new team led by the sender.
    Pair,
}

impl Formation {
    /// Decide what a request between these two participants means.
    pub fn classify(
        sender: Option<TeamPosition>,
        recipient: Option<TeamPosition>,
    ) -> Result<Self, AppError> {
        match (sender, recipient) {
            (Some(s), None) => Ok(Self::Invite { team_id: s.team_id }),
            (None, Some(r)) if r.is_leader => Ok(Self::Apply { team_id: r.team_id }),
            (None, Some(_)) => Err(AppError::Validation(
                "Requests to join a team must be sent to its leader".into(),
            )),
            (None, None) => Ok(Self::Pair),
            (Some(_), Some(_)) => Err(AppError::Conflict(
                "Both participants are already in teams".into(),
            )),
        }
    }

    /// Rebuild the formation stored on a request row.
    pub fn from_stored(kind: JoinRequestKind, team_id: Option<i32>) -> Option<Self> {
        match (kind, team_id) {
            (JoinRequestKind::Invite, Some(team_id)) => Some(Self::Invite { team_id }),
            (JoinRequestKind::Apply, Some(team_id)) => Some(Self::Apply { team_id }),
            (JoinRequestKind::Pair, None) => Some(Self::Pair),
            _ => None,
        }
    }

    pub fn kind(&self) -> JoinRequestKind {
        match self {
            Self::Invite { .. } => JoinRequestKind::Invite,
            Self::Apply { .. } => JoinRequestKind::Apply,
            Self::Pair => JoinRequestKind::Pair,
        }
    }

    pub fn team_id(&self) -> Option<i32> {
        match *self {
            Self::Invite { team_id } | Self::Apply { team_id } => Some(team_id),
            Self::Pair => None,
        }
    }
}

pub fn validate_send_join_request(req: &SendJoinRequest, sender_id: i32) -> Result<(), AppError> {
    if req.recipient_id == sender_id {
        return Err(AppError::Validation(
            "You cannot send a join request to yourself".into(),
        ));
    }
    if let Some(ref message) = req.message {
        validate_max_chars(message, "Message", 500)?;
    }
    Ok(())
}

/// Requests are listed from the caller's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw.map(str::trim) {
            None | Some("incoming") => Ok(Self::Incoming),
            Some("outgoing") => Ok(Self::Outgoing),
            Some(_) => Err(AppError::Validation(
                "direction must be one of: incoming, outgoing".into(),
            )),
        }
    }
}
