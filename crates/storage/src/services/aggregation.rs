use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Player;

/// Highest and lowest day score of a scoring pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Extremes {
    pub max: i64,
    pub min: i64,
}

/// Players earning a best/bad credit for the day. Ties share the credit, and a
/// single-player pool earns both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayAwards {
    pub extremes: Option<Extremes>,
    pub best: Vec<String>,
    pub bad: Vec<String>,
}

impl DayAwards {
    pub fn is_best(&self, player_id: &str) -> bool {
        self.best.iter().any(|id| id == player_id)
    }

    pub fn is_bad(&self, player_id: &str) -> bool {
        self.bad.iter().any(|id| id == player_id)
    }
}

/// Max and min `score_day` over the given players; `None` for an empty pool.
pub fn compute_extremes<'a>(players: impl IntoIterator<Item = &'a Player>) -> Option<Extremes> {
    players.into_iter().fold(None, |acc, player| {
        let score = player.score_day;
        Some(match acc {
            None => Extremes {
                max: score,
                min: score,
            },
            Some(Extremes { max, min }) => Extremes {
                max: max.max(score),
                min: min.min(score),
            },
        })
    })
}

pub fn compute_awards(pool: &[Player]) -> DayAwards {
    let Some(extremes) = compute_extremes(pool) else {
        return DayAwards::default();
    };

    let ids_scoring = |target: i64| {
        pool.iter()
            .filter(|player| player.score_day == target)
            .map(|player| player.id.clone())
            .collect::<Vec<_>>()
    };

    DayAwards {
        extremes: Some(extremes),
        best: ids_scoring(extremes.max),
        bad: ids_scoring(extremes.min),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, score_day: i64) -> Player {
        Player {
            id: id.to_string(),
            name: id.to_uppercase(),
            score_day,
            ..Player::default()
        }
    }

    #[test]
    fn test_extremes_of_empty_pool() {
        let empty: Vec<Player> = Vec::new();
        assert_eq!(compute_extremes(&empty), None);
        assert_eq!(compute_awards(&empty), DayAwards::default());
    }

    #[test]
    fn test_singleton_pool_gets_best_and_bad() {
        let awards = compute_awards(&[player("a", 7)]);
        assert_eq!(awards.extremes, Some(Extremes { max: 7, min: 7 }));
        assert_eq!(awards.best, vec!["a"]);
        assert_eq!(awards.bad, vec!["a"]);
    }

    #[test]
    fn test_ties_share_the_award() {
        let pool = [player("a", 10), player("b", 10), player("c", 3)];
        let awards = compute_awards(&pool);
        assert_eq!(awards.best, vec!["a", "b"]);
        assert_eq!(awards.bad, vec!["c"]);
    }

    #[test]
    fn test_negative_scores() {
        let pool = [player("a", -4), player("b", -12), player("c", 0)];
        let extremes = compute_extremes(&pool).unwrap();
        assert_eq!(extremes, Extremes { max: 0, min: -12 });
    }

    #[test]
    fn test_all_equal_pool_awards_everyone_both() {
        let pool = [player("a", 2), player("b", 2)];
        let awards = compute_awards(&pool);
        assert_eq!(awards.best, vec!["a", "b"]);
        assert_eq!(awards.bad, vec!["a", "b"]);
        assert!(awards.is_best("b") && awards.is_bad("a"));
    }
}
