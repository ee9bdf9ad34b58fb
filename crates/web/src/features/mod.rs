pub mod contests;
pub mod health;
pub mod users;
