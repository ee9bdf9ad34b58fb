mod contest;
mod rating_history;
mod user;

pub use contest::{Contest, ContestStatus, ParseContestStatusError};
pub use rating_history::{NewRatingHistoryEntry, RatingHistoryEntry, RatingHistoryWithContest};
pub use user::{DEFAULT_RATING, User};
