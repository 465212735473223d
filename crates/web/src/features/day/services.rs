use storage::{
    DaySessionManager, LedgerStore, ScoringError,
    dto::day::{
        ApplyDeltaResponse, DeleteEventResponse, EditEventCountResponse, FinalizeDayResponse,
        ParticipantsResponse, PlayerDaySummary, RevertDayResponse, RevertPreview, ScoreItem,
        StartDayResponse,
    },
    error::{Result, ScoringResult},
    models::{DayEvent, DayMeta},
    repository::day::DayRepository,
};

pub async fn get_day_session(store: &dyn LedgerStore) -> Result<DayMeta> {
    DayRepository::new(store).get_day_session().await
}

pub async fn start_day(store: &dyn LedgerStore) -> ScoringResult<StartDayResponse> {
    DaySessionManager::new(store).start_day().await
}

pub async fn list_participants(
    store: &dyn LedgerStore,
    session_id: &str,
) -> Result<ParticipantsResponse> {
    let participants = DayRepository::new(store)
        .list_participants(session_id)
        .await?;

    Ok(ParticipantsResponse {
        session_id: session_id.to_string(),
        participants,
    })
}

pub async fn set_participants(
    store: &dyn LedgerStore,
    session_id: &str,
    participants: &[String],
) -> ScoringResult<ParticipantsResponse> {
    DaySessionManager::new(store)
        .set_participants(session_id, participants)
        .await
}

/// Deltas on the current day are only accepted for its participants.
pub async fn apply_delta(
    store: &dyn LedgerStore,
    session_id: &str,
    player_id: &str,
    items: &[ScoreItem],
) -> ScoringResult<ApplyDeltaResponse> {
    let day = DayRepository::new(store);
    if day.get_day_session().await?.is_current(session_id) {
        let participants = day.list_participants(session_id).await?;
        if participants.is_empty() {
            return Err(ScoringError::MissingParticipants);
        }
        if !participants.iter().any(|id| id == player_id) {
            return Err(ScoringError::InvalidState(format!(
                "player {player_id} is not taking part in the day"
            )));
        }
    }

    DaySessionManager::new(store)
        .apply_delta(session_id, player_id, items)
        .await
}

pub async fn list_events(
    store: &dyn LedgerStore,
    session_id: &str,
    player_id: &str,
) -> Result<Vec<DayEvent>> {
    DayRepository::new(store)
        .list_player_day_events(session_id, player_id)
        .await
}

pub async fn summarize_events(
    store: &dyn LedgerStore,
    session_id: &str,
    player_id: &str,
) -> Result<PlayerDaySummary> {
    DayRepository::new(store)
        .summarize_player_day_events(session_id, player_id)
        .await
}

pub async fn edit_event_count(
    store: &dyn LedgerStore,
    session_id: &str,
    player_id: &str,
    event_id: &str,
    count: i64,
) -> ScoringResult<EditEventCountResponse> {
    DaySessionManager::new(store)
        .edit_event_count(session_id, player_id, event_id, count)
        .await
}

pub async fn delete_event(
    store: &dyn LedgerStore,
    session_id: &str,
    player_id: &str,
    event_id: &str,
) -> ScoringResult<DeleteEventResponse> {
    DaySessionManager::new(store)
        .delete_event(session_id, player_id, event_id)
        .await
}

pub async fn finalize_day(
    store: &dyn LedgerStore,
    session_id: &str,
) -> ScoringResult<FinalizeDayResponse> {
    DaySessionManager::new(store).finalize_day(session_id).await
}

pub async fn revert_day(store: &dyn LedgerStore) -> ScoringResult<RevertDayResponse> {
    DaySessionManager::new(store).revert_day().await
}

pub async fn preview_revert(store: &dyn LedgerStore) -> ScoringResult<RevertPreview> {
    DaySessionManager::new(store).preview_revert().await
}
