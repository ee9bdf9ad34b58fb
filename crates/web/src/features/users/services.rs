use storage::{
    RatingStore,
    dto::user::CreateUserRequest,
    error::Result,
    models::{DEFAULT_RATING, RatingHistoryWithContest, User},
    store::NewUser,
};
use uuid::Uuid;

/// List all users
pub async fn list_users(store: &dyn RatingStore) -> Result<Vec<User>> {
    store.list_users().await
}

/// Get a user together with their rating history, oldest contest first
pub async fn get_user_with_history(
    store: &dyn RatingStore,
    id: Uuid,
) -> Result<(User, Vec<RatingHistoryWithContest>)> {
    let user = store.find_user(id).await?;
    let history = store.user_history(id).await?;
    Ok((user, history))
}

/// Register a new user
pub async fn create_user(store: &dyn RatingStore, request: &CreateUserRequest) -> Result<User> {
    store
        .create_user(NewUser {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            initial_rating: request.initial_rating.unwrap_or(DEFAULT_RATING),
        })
        .await
}
