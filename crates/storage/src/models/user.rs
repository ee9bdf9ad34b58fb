use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Rating assigned to a user who has not played any contest yet
pub const DEFAULT_RATING: i32 = 1500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub current_rating: i32,
    pub max_rating: i32,
    pub contests_played: i32,
    pub created_at: chrono::NaiveDateTime,
}
