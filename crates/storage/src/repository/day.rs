use serde_json::Value;

use crate::dto::day::{CategoryTally, PlayerDaySummary};
use crate::error::Result;
use crate::ledger::{EntityKind, LedgerStore};
use crate::models::{DAY_META_ID, DayEvent, DayMeta, SessionRecord};

use super::decode_all;

/// Read projections over the current scoring day. Nothing here writes.
pub struct DayRepository<'a> {
    store: &'a dyn LedgerStore,
}

impl<'a> DayRepository<'a> {
    pub fn new(store: &'a dyn LedgerStore) -> Self {
        Self { store }
    }

    /// The day singleton; a store that never started a day reads as idle.
    pub async fn get_day_session(&self) -> Result<DayMeta> {
        match self.store.get_one(EntityKind::Meta, DAY_META_ID).await? {
            Some(record) => record.decode(),
            None => Ok(DayMeta::default()),
        }
    }

    pub async fn find_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        self.store
            .get_one(EntityKind::DaySessions, session_id)
            .await?
            .map(|record| record.decode())
            .transpose()
    }

    /// Participant ids of a session; unknown sessions have none.
    pub async fn list_participants(&self, session_id: &str) -> Result<Vec<String>> {
        Ok(self
            .find_session(session_id)
            .await?
            .map(|session| session.participants)
            .unwrap_or_default())
    }

    /// Events of one player in one session, oldest first
    pub async fn list_player_day_events(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> Result<Vec<DayEvent>> {
        let records = self
            .store
            .find_by(
                EntityKind::DayEvents,
                &[
                    ("sessionId", Value::from(session_id)),
                    ("playerId", Value::from(player_id)),
                ],
            )
            .await?;

        let mut events: Vec<DayEvent> = decode_all(&records)?;
        events.sort_by_key(|event| event.created_at);
        Ok(events)
    }

    /// Events of one player grouped per category, largest contribution first
    pub async fn summarize_player_day_events(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> Result<PlayerDaySummary> {
        let events = self.list_player_day_events(session_id, player_id).await?;
        let categories = tally_by_category(&events);
        let total_points = categories.iter().map(|tally| tally.total_points).sum();

        Ok(PlayerDaySummary {
            session_id: session_id.to_string(),
            player_id: player_id.to_string(),
            total_points,
            categories,
        })
    }
}

fn tally_by_category(events: &[DayEvent]) -> Vec<CategoryTally> {
    let mut tallies: Vec<CategoryTally> = Vec::new();

    for event in events {
        // Events recorded without a category id are grouped by name.
        let same_category = |tally: &CategoryTally| {
            if event.category_id.is_empty() {
                tally.category_id.is_empty() && tally.category_name == event.category_name
            } else {
                tally.category_id == event.category_id
            }
        };

        match tallies.iter_mut().find(|tally| same_category(tally)) {
            Some(tally) => {
                tally.count += event.count;
                tally.total_points += event.total_points;
            }
            None => tallies.push(CategoryTally {
                category_id: event.category_id.clone(),
                category_name: event.category_name.clone(),
                points: event.points,
                count: event.count,
                total_points: event.total_points,
            }),
        }
    }

    tallies.sort_by(|a, b| b.total_points.cmp(&a.total_points));
    tallies
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(category_id: &str, name: &str, points: i64, count: i64) -> DayEvent {
        DayEvent {
            category_id: category_id.to_string(),
            category_name: name.to_string(),
            points,
            count,
            total_points: points * count,
            ..DayEvent::default()
        }
    }

    #[test]
    fn test_tally_groups_by_category_and_sorts_by_total() {
        let events = [
            event("goal", "Goal", 5, 1),
            event("own", "Own goal", -8, 1),
            event("goal", "Goal", 5, 2),
            event("assist", "Assist", 3, 1),
        ];

        let tallies = tally_by_category(&events);
        let names: Vec<_> = tallies.iter().map(|t| t.category_name.as_str()).collect();
        assert_eq!(names, vec!["Goal", "Assist", "Own goal"]);
        assert_eq!(tallies[0].count, 3);
        assert_eq!(tallies[0].total_points, 15);
    }

    #[test]
    fn test_tally_falls_back_to_name_without_category_id() {
        let events = [event("", "Legacy", 2, 1), event("", "Legacy", 2, 4)];
        let tallies = tally_by_category(&events);
        assert_eq!(tallies.len(), 1);
        assert_eq!(tallies[0].total_points, 10);
    }
}
