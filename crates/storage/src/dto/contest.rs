use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dto::user::UserResponse;
use crate::models::{Contest, ContestStatus, RatingHistoryEntry};
use crate::services::tier::Tier;

/// Request payload for creating a new contest
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateContestRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Name must be between 1 and 255 characters"
    ))]
    pub name: String,

    #[validate(range(min = 1, message = "Total participants must be at least 1"))]
    pub total_participants: i32,

    /// Defaults to the creation time
    pub date: Option<NaiveDateTime>,
}

/// Contest fields embedded in rating history rows
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContestSummary {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDateTime,
    pub total_participants: i32,
}

impl From<Contest> for ContestSummary {
    fn from(contest: Contest) -> Self {
        Self {
            id: contest.id,
            name: contest.name,
            date: contest.date,
            total_participants: contest.total_participants,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContestResponse {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDateTime,
    pub total_participants: i32,
    pub status: ContestStatus,
}

impl From<Contest> for ContestResponse {
    fn from(contest: Contest) -> Self {
        Self {
            id: contest.id,
            name: contest.name,
            date: contest.date,
            total_participants: contest.total_participants,
            status: contest.status,
        }
    }
}

/// Final placing of one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContestResult {
    pub user_id: Uuid,
    pub rank: i32,
}

/// Request payload for `POST /api/contests/end` and its dry-run twin
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct EndContestRequest {
    pub contest_id: Uuid,

    #[validate(length(min = 1, message = "At least one result is required"))]
    pub results: Vec<ContestResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantResultResponse {
    pub user: UserResponse,
    pub entry: RatingHistoryEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EndContestResponse {
    pub contest: ContestResponse,
    pub participants: Vec<ParticipantResultResponse>,
}

/// Rating change a participant would receive if the contest ended now
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PreviewEntry {
    pub user_id: Uuid,
    pub rank: i32,
    pub old_rating: i32,
    pub new_rating: i32,
    pub performance_rating: i32,
    pub percentile: f64,
    pub rating_change: i32,
    pub tier_before: Tier,
    pub tier_after: Tier,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PreviewResponse {
    pub contest_id: Uuid,
    pub participants: Vec<PreviewEntry>,
}
