use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dto::contest::ContestSummary;
use crate::models::{RatingHistoryEntry, RatingHistoryWithContest, User};
use crate::services::tier::{Tier, TierClassifier};

/// Request payload for registering a new user
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Name must be between 1 and 255 characters"
    ))]
    pub name: String,

    /// Starting rating, defaults to 1500
    #[validate(range(min = 0, max = 4000, message = "Initial rating must be between 0 and 4000"))]
    pub initial_rating: Option<i32>,
}

/// User without rating history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub current_rating: i32,
    pub max_rating: i32,
    pub contests_played: i32,
    pub tier: Tier,
}

impl UserResponse {
    pub fn from_user(user: User, classifier: &TierClassifier) -> Self {
        Self {
            tier: classifier.classify(user.current_rating),
            id: user.id,
            name: user.name,
            current_rating: user.current_rating,
            max_rating: user.max_rating,
            contests_played: user.contests_played,
        }
    }
}

/// One point of a user's rating history, with the contest it came from
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RatingHistoryResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub contest_id: Uuid,
    pub old_rating: i32,
    pub new_rating: i32,
    pub performance_rating: i32,
    pub rank: i32,
    pub percentile: f64,
    pub rating_change: i32,
    pub contest: ContestSummary,
}

impl From<RatingHistoryWithContest> for RatingHistoryResponse {
    fn from(row: RatingHistoryWithContest) -> Self {
        let RatingHistoryWithContest { entry, contest } = row;
        let RatingHistoryEntry {
            id,
            user_id,
            contest_id,
            old_rating,
            new_rating,
            performance_rating,
            rank,
            percentile,
            rating_change,
            ..
        } = entry;

        Self {
            id,
            user_id,
            contest_id,
            old_rating,
            new_rating,
            performance_rating,
            rank,
            percentile,
            rating_change,
            contest: ContestSummary::from(contest),
        }
    }
}

/// Profile payload consumed by the profile page
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub current_rating: i32,
    pub max_rating: i32,
    pub contests_played: i32,
    pub tier: Tier,
    #[serde(rename = "ratingHistory")]
    pub rating_history: Vec<RatingHistoryResponse>,
}

impl UserProfileResponse {
    pub fn new(
        user: User,
        history: Vec<RatingHistoryWithContest>,
        classifier: &TierClassifier,
    ) -> Self {
        let summary = UserResponse::from_user(user, classifier);
        Self {
            id: summary.id,
            name: summary.name,
            current_rating: summary.current_rating,
            max_rating: summary.max_rating,
            contests_played: summary.contests_played,
            tier: summary.tier,
            rating_history: history.into_iter().map(RatingHistoryResponse::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_request_validation() {
        let ok = CreateUserRequest {
            name: "ada".to_string(),
            initial_rating: None,
        };
        assert!(ok.validate().is_ok());

        let empty_name = CreateUserRequest {
            name: String::new(),
            initial_rating: None,
        };
        assert!(empty_name.validate().is_err());

        let negative = CreateUserRequest {
            name: "ada".to_string(),
            initial_rating: Some(-5),
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_profile_uses_camel_case_history_key() {
        let user = User {
            id: Uuid::new_v4(),
            name: "ada".to_string(),
            current_rating: 1650,
            max_rating: 1650,
            contests_played: 1,
            created_at: chrono::Utc::now().naive_utc(),
        };
        let profile = UserProfileResponse::new(user, Vec::new(), &TierClassifier::default());
        let json = serde_json::to_value(&profile).unwrap();

        assert!(json.get("ratingHistory").is_some());
        assert_eq!(json["tier"], "Gold");
    }
}
