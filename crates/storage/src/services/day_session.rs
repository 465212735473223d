//! The day-scoring state machine: `Idle -> Active -> Finalized -> Idle`.
//!
//! Every guarded mutation (participants, deltas, event edits, finalize) runs
//! inside one ledger transaction that re-reads the `meta/day` singleton, so
//! the state check and the writes it allows commit together.
//!
//! Bulk resets (`start_day`, `revert_day`) first close the day in a
//! transaction on the singleton, so no guarded write can land while they walk
//! the players. They then commit in chunks. A failure part-way leaves earlier
//! chunks applied; running the same operation again finishes the work.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::dto::day::{
    ApplyDeltaResponse, DeleteEventResponse, EditEventCountResponse, FinalizeDayResponse,
    ParticipantsResponse, RevertDayResponse, RevertPreview, RevertPreviewItem, ScoreItem,
    StartDayResponse,
};
use crate::error::{ScoringError, ScoringResult};
use crate::ledger::{
    DEFAULT_BATCH_LIMIT, Document, EntityKind, LedgerStore, LedgerTransaction, Patch, WriteOp,
    fields, to_document,
};
use crate::models::{
    DAY_META_ID, DayEvent, DayMeta, DayState, PendingRevert, Player, SessionRecord,
};
use crate::repository::day::DayRepository;
use crate::repository::player::PlayerRepository;

use super::aggregation::compute_awards;

/// Writes reserved in the finalize transaction besides the award updates:
/// the singleton and the session record.
const FINALIZE_BOOKKEEPING_WRITES: usize = 2;

pub struct DaySessionManager<'a> {
    store: &'a dyn LedgerStore,
    chunk_size: usize,
}

impl<'a> DaySessionManager<'a> {
    pub fn new(store: &'a dyn LedgerStore) -> Self {
        Self {
            store,
            chunk_size: DEFAULT_BATCH_LIMIT.min(store.batch_limit()).max(1),
        }
    }

    /// Size of the player groups committed by bulk operations, capped by the
    /// store's batch limit.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(1, self.store.batch_limit().max(1));
        self
    }

    /// Largest roster `set_participants` accepts, so that finalizing fits in a
    /// single transaction.
    pub fn max_participants(&self) -> usize {
        self.store
            .batch_limit()
            .saturating_sub(FINALIZE_BOOKKEEPING_WRITES)
    }

    /// Open a new day. Leftover events and sessions of any previous day are
    /// purged and every player's day score goes back to 0; all-time scores are
    /// kept. The new session is published only once the players are reset.
    pub async fn start_day(&self) -> ScoringResult<StartDayResponse> {
        let mut tx = self.store.begin_transaction().await?;
        let meta = read_meta(tx.as_mut()).await?;
        if meta.pending_revert.is_some() {
            return Err(ScoringError::invalid_state(
                "a revert is still in progress; run it again before starting a day",
            ));
        }
        tx.set(EntityKind::Meta, DAY_META_ID, closed_day(), true)
            .await?;
        tx.commit().await?;

        let events_purged = self.purge(EntityKind::DayEvents).await?;
        let sessions_purged = self.purge(EntityKind::DaySessions).await?;

        let players = PlayerRepository::new(self.store).list().await?;
        let resets = players
            .iter()
            .map(|player| WriteOp::Update {
                kind: EntityKind::Players,
                id: player.id.clone(),
                patch: Patch::new().set("scoreDay", 0),
            })
            .collect();
        let players_reset = self.commit_in_chunks(resets).await?;

        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        self.store
            .batch_write(vec![
                WriteOp::Set {
                    kind: EntityKind::DaySessions,
                    id: session_id.clone(),
                    fields: fields(json!({
                        "startedAt": now,
                        "isFinalized": false,
                        "finalizedAt": null,
                        "participants": [],
                    })),
                    merge: false,
                },
                WriteOp::Set {
                    kind: EntityKind::Meta,
                    id: DAY_META_ID.to_string(),
                    fields: fields(json!({
                        "currentSessionId": session_id,
                        "startedAt": now,
                    })),
                    merge: true,
                },
            ])
            .await?;

        tracing::info!(
            session_id = %session_id,
            players_reset,
            events_purged,
            sessions_purged,
            "Scoring day started"
        );

        Ok(StartDayResponse {
            session_id,
            players_reset,
        })
    }

    /// Define the players taking part in the day. Ids are deduplicated in
    /// first-seen order and also remembered as the last roster.
    pub async fn set_participants(
        &self,
        session_id: &str,
        ids: &[String],
    ) -> ScoringResult<ParticipantsResponse> {
        let participants = normalize_roster(ids);
        let max = self.max_participants();
        if participants.len() > max {
            return Err(ScoringError::validation(format!(
                "at most {max} participants can take part in a day"
            )));
        }

        let mut tx = self.store.begin_transaction().await?;
        let meta = read_meta(tx.as_mut()).await?;
        ensure_active(&meta, session_id)?;

        tx.set(
            EntityKind::DaySessions,
            session_id,
            fields(json!({ "participants": participants })),
            true,
        )
        .await?;
        tx.set(
            EntityKind::Meta,
            DAY_META_ID,
            fields(json!({ "lastParticipants": participants })),
            true,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(session_id, participants = participants.len(), "Participants set");

        Ok(ParticipantsResponse {
            session_id: session_id.to_string(),
            participants,
        })
    }

    /// Credit a player with one or more rule applications. The score
    /// increments and one event per item commit together.
    ///
    /// Any registered player is accepted; restricting deltas to participants is
    /// the caller's policy.
    pub async fn apply_delta(
        &self,
        session_id: &str,
        player_id: &str,
        items: &[ScoreItem],
    ) -> ScoringResult<ApplyDeltaResponse> {
        let applied = validate_items(items, self.store.batch_limit())?;

        let mut tx = self.store.begin_transaction().await?;
        let meta = read_meta(tx.as_mut()).await?;
        ensure_active(&meta, session_id)?;

        if tx.get(EntityKind::Players, player_id).await?.is_none() {
            return Err(ScoringError::not_found(format!("player {player_id}")));
        }

        tx.update(
            EntityKind::Players,
            player_id,
            Patch::new()
                .increment("score", applied)
                .increment("scoreDay", applied),
        )
        .await?;

        let created_at = Utc::now();
        for item in items {
            let event = DayEvent {
                id: Uuid::new_v4().to_string(),
                session_id: session_id.to_string(),
                player_id: player_id.to_string(),
                category_id: item.category_id.clone(),
                category_name: item.category_name.clone(),
                points: item.points,
                count: item.count,
                total_points: item.total_points,
                created_at: Some(created_at),
            };
            tx.set(EntityKind::DayEvents, &event.id, to_document(&event)?, false)
                .await?;
        }
        tx.commit().await?;

        tracing::debug!(session_id, player_id, applied, events = items.len(), "Delta applied");

        Ok(ApplyDeltaResponse { applied })
    }

    /// Correct how many times an event's rule applied. Negative counts are
    /// clamped to 0; the player absorbs only the difference.
    pub async fn edit_event_count(
        &self,
        session_id: &str,
        player_id: &str,
        event_id: &str,
        count: i64,
    ) -> ScoringResult<EditEventCountResponse> {
        let count = count.max(0);

        let mut tx = self.store.begin_transaction().await?;
        let meta = read_meta(tx.as_mut()).await?;
        ensure_active(&meta, session_id)?;

        let event = read_owned_event(tx.as_mut(), session_id, player_id, event_id).await?;
        let next_total = event.points.checked_mul(count).ok_or_else(|| {
            ScoringError::validation(format!("count {count} overflows the event total"))
        })?;
        let diff = next_total - event.total_points;

        tx.update(
            EntityKind::DayEvents,
            event_id,
            Patch::new()
                .set("count", count)
                .set("totalPoints", next_total),
        )
        .await?;
        if diff != 0 {
            tx.update(
                EntityKind::Players,
                player_id,
                Patch::new()
                    .increment("score", diff)
                    .increment("scoreDay", diff),
            )
            .await
            .map_err(ScoringError::missing(format!("player {player_id}")))?;
        }
        tx.commit().await?;

        tracing::debug!(session_id, player_id, event_id, count, diff, "Event count edited");

        Ok(EditEventCountResponse {
            event_id: event_id.to_string(),
            count,
        })
    }

    /// Remove an event and take its points back from the player.
    pub async fn delete_event(
        &self,
        session_id: &str,
        player_id: &str,
        event_id: &str,
    ) -> ScoringResult<DeleteEventResponse> {
        let mut tx = self.store.begin_transaction().await?;
        let meta = read_meta(tx.as_mut()).await?;
        ensure_active(&meta, session_id)?;

        let event = read_owned_event(tx.as_mut(), session_id, player_id, event_id).await?;

        tx.delete(EntityKind::DayEvents, event_id).await?;
        if event.total_points != 0 {
            tx.update(
                EntityKind::Players,
                player_id,
                Patch::new()
                    .increment("score", -event.total_points)
                    .increment("scoreDay", -event.total_points),
            )
            .await
            .map_err(ScoringError::missing(format!("player {player_id}")))?;
        }
        tx.commit().await?;

        tracing::debug!(session_id, player_id, event_id, "Event deleted");

        Ok(DeleteEventResponse {
            event_id: event_id.to_string(),
        })
    }

    /// Close the day: every participant on the top day score gets a best
    /// credit, every participant on the bottom one a bad credit. The awards
    /// and the finalized flag commit in one transaction.
    pub async fn finalize_day(&self, session_id: &str) -> ScoringResult<FinalizeDayResponse> {
        let mut tx = self.store.begin_transaction().await?;
        let meta = read_meta(tx.as_mut()).await?;
        match meta.state() {
            DayState::Finalized(id) if id == session_id => {
                return Err(ScoringError::invalid_state("the day is already finalized"));
            }
            _ => ensure_active(&meta, session_id)?,
        }

        let session: SessionRecord = match tx.get(EntityKind::DaySessions, session_id).await? {
            Some(record) => record.decode()?,
            None => SessionRecord::default(),
        };
        if session.participants.is_empty() {
            return Err(ScoringError::MissingParticipants);
        }

        let mut pool = Vec::with_capacity(session.participants.len());
        for id in normalize_roster(&session.participants) {
            // Participants removed since the roster was set are skipped.
            if let Some(record) = tx.get(EntityKind::Players, &id).await? {
                pool.push(record.decode::<Player>()?);
            }
        }

        let awards = compute_awards(&pool);
        let Some(extremes) = awards.extremes else {
            tracing::warn!(session_id, "No registered player left among the participants");
            return Err(ScoringError::MissingParticipants);
        };

        for player in &pool {
            let mut patch = Patch::new();
            if awards.is_best(&player.id) {
                patch = patch.increment("best", 1);
            }
            if awards.is_bad(&player.id) {
                patch = patch.increment("bad", 1);
            }
            if !patch.is_empty() {
                tx.update(EntityKind::Players, &player.id, patch).await?;
            }
        }

        let now = Utc::now();
        let finalized = fields(json!({
            "isFinalized": true,
            "finalizedAt": now,
            "bestIds": awards.best,
            "badIds": awards.bad,
        }));
        tx.set(EntityKind::Meta, DAY_META_ID, finalized.clone(), true)
            .await?;
        tx.set(EntityKind::DaySessions, session_id, finalized, true)
            .await?;
        tx.commit().await?;

        tracing::info!(
            session_id,
            best = awards.best.len(),
            bad = awards.bad.len(),
            max_score_day = extremes.max,
            min_score_day = extremes.min,
            "Scoring day finalized"
        );

        Ok(FinalizeDayResponse {
            best_updated: awards.best.len(),
            bad_updated: awards.bad.len(),
            max_score_day: extremes.max,
            min_score_day: extremes.min,
        })
    }

    /// Undo the day. Every player's day score is taken back out of their
    /// all-time score and reset; if the day was finalized the best/bad credits
    /// recorded at finalize are withdrawn (never below 0). Events and sessions
    /// are purged and the singleton returns to idle.
    ///
    /// The day is closed and the work to do is recorded on the singleton before
    /// any player is touched. Each chunk of players commits together with the
    /// shrunken award lists, so after a failure running it again undoes only
    /// what is left. Running it again changes nothing.
    pub async fn revert_day(&self) -> ScoringResult<RevertDayResponse> {
        let pending = self.close_for_revert().await?;

        let players = PlayerRepository::new(self.store).list().await?;
        let changes: Vec<PlayerRevert> = plan_revert(players, &pending)
            .into_iter()
            .filter(PlayerRevert::has_changes)
            .collect();

        let players_updated = changes.len();
        let best_reverted = changes.iter().filter(|change| change.revert_best).count();
        let bad_reverted = changes.iter().filter(|change| change.revert_bad).count();

        // One slot of every chunk carries the remaining award lists.
        let per_chunk = self.chunk_size.saturating_sub(1).max(1);
        let mut remaining = pending.clone();
        for chunk in changes.chunks(per_chunk) {
            let mut ops: Vec<WriteOp> = chunk
                .iter()
                .map(|change| WriteOp::Update {
                    kind: EntityKind::Players,
                    id: change.player.id.clone(),
                    patch: change.patch(),
                })
                .collect();
            for change in chunk {
                remaining.best_ids.retain(|id| *id != change.player.id);
                remaining.bad_ids.retain(|id| *id != change.player.id);
            }
            ops.push(WriteOp::Update {
                kind: EntityKind::Meta,
                id: DAY_META_ID.to_string(),
                patch: Patch::new().set("pendingRevert", to_document(&remaining)?),
            });
            self.store.batch_write(ops).await?;
        }

        self.purge(EntityKind::DayEvents).await?;
        self.purge(EntityKind::DaySessions).await?;
        self.store
            .set_one(
                EntityKind::Meta,
                DAY_META_ID,
                fields(json!({ "pendingRevert": null })),
                true,
            )
            .await?;

        tracing::info!(
            session_id = ?pending.session_id,
            players_updated,
            best_reverted,
            bad_reverted,
            was_finalized = pending.was_finalized,
            "Scoring day reverted"
        );

        Ok(RevertDayResponse {
            players_updated,
            best_reverted,
            bad_reverted,
            is_finalized: pending.was_finalized,
        })
    }

    /// What `revert_day` would change right now, without writing anything.
    pub async fn preview_revert(&self) -> ScoringResult<RevertPreview> {
        let meta = DayRepository::new(self.store).get_day_session().await?;
        let pending = meta.revert_plan();
        let players = PlayerRepository::new(self.store).list().await?;

        let items: Vec<RevertPreviewItem> = plan_revert(players, &pending)
            .iter()
            .filter(|change| change.has_changes())
            .map(PlayerRevert::preview)
            .collect();

        Ok(RevertPreview {
            best_count: items.iter().filter(|item| item.is_best).count(),
            bad_count: items.iter().filter(|item| item.is_bad).count(),
            is_finalized: pending.was_finalized,
            items,
        })
    }

    /// Moves the singleton to idle and records what the revert has to undo.
    /// A revert already under way keeps its recorded work.
    async fn close_for_revert(&self) -> ScoringResult<PendingRevert> {
        let mut tx = self.store.begin_transaction().await?;
        let meta = read_meta(tx.as_mut()).await?;
        let pending = meta.revert_plan();

        let mut closed = closed_day();
        closed.insert("pendingRevert".to_string(), to_document(&pending)?.into());
        tx.set(EntityKind::Meta, DAY_META_ID, closed, true).await?;
        tx.commit().await?;

        Ok(pending)
    }

    async fn purge(&self, kind: EntityKind) -> ScoringResult<usize> {
        let records = self.store.get_all(kind).await?;
        let deletes = records
            .into_iter()
            .map(|record| WriteOp::Delete {
                kind,
                id: record.id,
            })
            .collect();
        self.commit_in_chunks(deletes).await
    }

    /// Commit `ops` in atomic groups of at most `chunk_size` writes.
    async fn commit_in_chunks(&self, ops: Vec<WriteOp>) -> ScoringResult<usize> {
        let total = ops.len();
        let mut ops = ops.into_iter().peekable();
        while ops.peek().is_some() {
            let chunk: Vec<WriteOp> = ops.by_ref().take(self.chunk_size).collect();
            self.store.batch_write(chunk).await?;
        }
        Ok(total)
    }
}

/// Fields of the singleton for a day that is no longer open.
fn closed_day() -> Document {
    fields(json!({
        "currentSessionId": null,
        "startedAt": null,
        "isFinalized": false,
        "finalizedAt": null,
        "bestIds": [],
        "badIds": [],
    }))
}

/// Award credits are withdrawn only from players recorded as holding them,
/// and never below 0.
fn plan_revert(players: Vec<Player>, pending: &PendingRevert) -> Vec<PlayerRevert> {
    players
        .into_iter()
        .map(|player| PlayerRevert {
            revert_best: pending.best_ids.contains(&player.id) && player.best > 0,
            revert_bad: pending.bad_ids.contains(&player.id) && player.bad > 0,
            player,
        })
        .collect()
}

struct PlayerRevert {
    player: Player,
    revert_best: bool,
    revert_bad: bool,
}

impl PlayerRevert {
    fn has_changes(&self) -> bool {
        self.player.score_day != 0 || self.revert_best || self.revert_bad
    }

    fn patch(&self) -> Patch {
        let mut patch = Patch::new()
            .set("scoreDay", 0)
            .increment("score", -self.player.score_day);
        if self.revert_best {
            patch = patch.increment("best", -1);
        }
        if self.revert_bad {
            patch = patch.increment("bad", -1);
        }
        patch
    }

    fn preview(&self) -> RevertPreviewItem {
        let player = &self.player;
        RevertPreviewItem {
            player_id: player.id.clone(),
            name: player.name.clone(),
            score_before: player.score,
            score_after: player.score - player.score_day,
            score_day_before: player.score_day,
            best_before: player.best,
            best_after: player.best - i64::from(self.revert_best),
            bad_before: player.bad,
            bad_after: player.bad - i64::from(self.revert_bad),
            is_best: self.revert_best,
            is_bad: self.revert_bad,
        }
    }
}

async fn read_meta(tx: &mut dyn LedgerTransaction) -> ScoringResult<DayMeta> {
    match tx.get(EntityKind::Meta, DAY_META_ID).await? {
        Some(record) => Ok(record.decode()?),
        None => Ok(DayMeta::default()),
    }
}

/// Loads an event and checks it belongs to the claimed session and player.
async fn read_owned_event(
    tx: &mut dyn LedgerTransaction,
    session_id: &str,
    player_id: &str,
    event_id: &str,
) -> ScoringResult<DayEvent> {
    let event: DayEvent = tx
        .get(EntityKind::DayEvents, event_id)
        .await?
        .ok_or_else(|| ScoringError::not_found(format!("event {event_id}")))?
        .decode()?;

    if !event.belongs_to(session_id, player_id) {
        tracing::warn!(session_id, player_id, event_id, "Event claimed by another session or player");
        return Err(ScoringError::not_found(format!(
            "event {event_id} for player {player_id} in session {session_id}"
        )));
    }

    Ok(event)
}

/// Only the current, not yet finalized session accepts writes.
fn ensure_active(meta: &DayMeta, session_id: &str) -> ScoringResult<()> {
    match meta.state() {
        DayState::Active(id) if id == session_id => Ok(()),
        DayState::Finalized(id) if id == session_id => {
            tracing::warn!(session_id, "Rejected write to a finalized day");
            Err(ScoringError::invalid_state(
                "the day is finalized; revert it to make changes",
            ))
        }
        DayState::Idle => Err(ScoringError::invalid_state("no scoring day is active")),
        _ => Err(ScoringError::not_found(format!("session {session_id}"))),
    }
}

fn normalize_roster(ids: &[String]) -> Vec<String> {
    let mut roster: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !id.is_empty() && !roster.contains(id) {
            roster.push(id.clone());
        }
    }
    roster
}

/// Checks each item and returns the summed delta.
fn validate_items(items: &[ScoreItem], batch_limit: usize) -> ScoringResult<i64> {
    if items.is_empty() {
        return Err(ScoringError::validation(
            "at least one score item is required",
        ));
    }
    // One write per event plus the player update.
    if items.len() + 1 > batch_limit {
        return Err(ScoringError::validation(format!(
            "at most {} score items can be applied at once",
            batch_limit.saturating_sub(1)
        )));
    }

    let mut total: i64 = 0;
    for item in items {
        if item.category_id.trim().is_empty() {
            return Err(ScoringError::validation("score item without a category"));
        }
        if item.count < 0 {
            return Err(ScoringError::validation(format!(
                "count of '{}' must not be negative",
                item.category_name
            )));
        }
        let expected = item
            .points
            .checked_mul(item.count)
            .ok_or_else(|| ScoringError::validation("score item total overflows"))?;
        if expected != item.total_points {
            return Err(ScoringError::validation(format!(
                "total of '{}' must be {} x {} = {}, got {}",
                item.category_name, item.points, item.count, expected, item.total_points
            )));
        }
        total = total
            .checked_add(expected)
            .ok_or_else(|| ScoringError::validation("score delta overflows"))?;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_is_deduplicated_in_first_seen_order() {
        let ids = ["b", "a", "", "b", "c", "a"].map(String::from);
        assert_eq!(normalize_roster(&ids), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_items_must_be_consistent() {
        let ok = [ScoreItem::new("goal", "Goal", 5, 2), ScoreItem::new("own", "Own goal", -8, 1)];
        assert_eq!(validate_items(&ok, 400).unwrap(), 2);

        let mut wrong_total = ScoreItem::new("goal", "Goal", 5, 2);
        wrong_total.total_points = 9;
        assert!(matches!(
            validate_items(&[wrong_total], 400),
            Err(ScoringError::Validation(_))
        ));

        let negative = ScoreItem::new("goal", "Goal", 5, -1);
        assert!(matches!(
            validate_items(&[negative], 400),
            Err(ScoringError::Validation(_))
        ));

        assert!(matches!(validate_items(&[], 400), Err(ScoringError::Validation(_))));
    }

    #[test]
    fn test_too_many_items_for_one_batch() {
        let items = vec![ScoreItem::new("goal", "Goal", 5, 1); 3];
        assert!(validate_items(&items, 4).is_ok());
        assert!(validate_items(&items, 3).is_err());
    }

    #[test]
    fn test_guard_by_state() {
        let idle = DayMeta::default();
        assert!(matches!(
            ensure_active(&idle, "s1"),
            Err(ScoringError::InvalidState(_))
        ));

        let active = DayMeta {
            current_session_id: Some("s1".to_string()),
            ..DayMeta::default()
        };
        assert!(ensure_active(&active, "s1").is_ok());
        assert!(matches!(
            ensure_active(&active, "s0"),
            Err(ScoringError::NotFound(_))
        ));

        let finalized = DayMeta {
            is_finalized: true,
            ..active
        };
        assert!(matches!(
            ensure_active(&finalized, "s1"),
            Err(ScoringError::InvalidState(_))
        ));
    }
}
