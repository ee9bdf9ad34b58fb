pub mod contest;
pub mod finalization;
pub mod rating_history;
pub mod user;
