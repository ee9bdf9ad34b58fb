use storage::{
    RatingStore,
    dto::{
        contest::{
            ContestResponse, CreateContestRequest, EndContestRequest, EndContestResponse,
            ParticipantResultResponse, PreviewEntry, PreviewResponse,
        },
        user::UserResponse,
    },
    error::Result,
    models::{Contest, RatingHistoryEntry},
    services::{BatchProcessor, FinalizeError, TierClassifier},
    store::NewContest,
};
use uuid::Uuid;

/// List all contests, most recent first
pub async fn list_contests(store: &dyn RatingStore) -> Result<Vec<Contest>> {
    store.list_contests().await
}

/// Create a new open contest, dated now unless a date is given
pub async fn create_contest(store: &dyn RatingStore, request: &CreateContestRequest) -> Result<Contest> {
    store
        .create_contest(NewContest {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            date: request
                .date
                .unwrap_or_else(|| chrono::Utc::now().naive_utc()),
            total_participants: request.total_participants,
        })
        .await
}

/// Rating history rows written when the contest was closed, ordered by rank
pub async fn get_contest_results(store: &dyn RatingStore, id: Uuid) -> Result<Vec<RatingHistoryEntry>> {
    store.find_contest(id).await?;
    store.contest_results(id).await
}

/// Close a contest and commit every participant's new rating
pub async fn end_contest(
    processor: &BatchProcessor,
    classifier: &TierClassifier,
    request: &EndContestRequest,
) -> std::result::Result<EndContestResponse, FinalizeError> {
    let outcome = processor
        .finalize(request.contest_id, &request.results)
        .await?;

    Ok(EndContestResponse {
        contest: ContestResponse::from(outcome.contest),
        participants: outcome
            .participants
            .into_iter()
            .map(|p| ParticipantResultResponse {
                user: UserResponse::from_user(p.user, classifier),
                entry: p.entry,
            })
            .collect(),
    })
}

/// Compute what `end_contest` would commit, without writing
pub async fn preview_contest(
    processor: &BatchProcessor,
    classifier: &TierClassifier,
    request: &EndContestRequest,
) -> std::result::Result<PreviewResponse, FinalizeError> {
    let previews = processor
        .preview(request.contest_id, &request.results)
        .await?;

    Ok(PreviewResponse {
        contest_id: request.contest_id,
        participants: previews
            .into_iter()
            .map(|p| PreviewEntry {
                user_id: p.user.id,
                rank: p.rank,
                old_rating: p.outcome.old_rating,
                new_rating: p.outcome.new_rating,
                performance_rating: p.outcome.performance_rating,
                percentile: p.outcome.percentile,
                rating_change: p.outcome.rating_change(),
                tier_before: classifier.classify(p.outcome.old_rating),
                tier_after: classifier.classify(p.outcome.new_rating),
            })
            .collect(),
    })
}
