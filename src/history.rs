//! Append-only record of completed games, queryable per session.

use dashmap::DashMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::games::{GameKind, PlaylistEntry};

/// Everything needed to reconstruct a finished game's outcome later.
#[derive(Debug, Clone)]
pub struct GameRecord {
    /// Session the game ran in.
    pub session_id: String,
    /// Identity of the game instance.
    pub game_id: Uuid,
    /// Which mini-game it was.
    pub kind: GameKind,
    /// Winner summary: participant id, winning option text, or last winning
    /// song depending on the kind. `None` when no eligible winner existed.
    pub winner: Option<String>,
    /// Identities of every entrant/voter that contributed, first-seen order.
    pub entrants: Vec<String>,
    /// Per-round playlist for DJ games, empty otherwise.
    pub playlist: Vec<PlaylistEntry>,
    /// Wall-clock start of the game.
    pub started_at: OffsetDateTime,
    /// Wall-clock end of the game.
    pub ended_at: OffsetDateTime,
}

/// Sink for completed-game records. Appends are fire-and-forget from the
/// engine's perspective; implementations must not block the ingestion path.
pub trait HistorySink: Send + Sync {
    /// Record one fully completed game. Called exactly once per game.
    fn append(&self, record: GameRecord);

    /// Most recent records for a session, newest first.
    fn recent(&self, session_id: &str, limit: usize) -> Vec<GameRecord>;
}

/// In-memory history keyed by session, suitable for dashboards and tests.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    records: DashMap<String, Vec<GameRecord>>,
}

impl InMemoryHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistorySink for InMemoryHistory {
    fn append(&self, record: GameRecord) {
        self.records
            .entry(record.session_id.clone())
            .or_default()
            .push(record);
    }

    fn recent(&self, session_id: &str, limit: usize) -> Vec<GameRecord> {
        self.records
            .get(session_id)
            .map(|records| records.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(session: &str, winner: Option<&str>) -> GameRecord {
        GameRecord {
            session_id: session.into(),
            game_id: Uuid::new_v4(),
            kind: GameKind::LuckyWheel,
            winner: winner.map(Into::into),
            entrants: winner.iter().map(ToString::to_string).collect(),
            playlist: Vec::new(),
            started_at: OffsetDateTime::now_utc(),
            ended_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn recent_returns_newest_first_per_session() {
        let history = InMemoryHistory::new();
        history.append(record("s1", Some("alice")));
        history.append(record("s1", Some("bob")));
        history.append(record("s2", None));

        let recent = history.recent("s1", 10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].winner.as_deref(), Some("bob"));
        assert_eq!(recent[1].winner.as_deref(), Some("alice"));
        assert_eq!(history.recent("s2", 10).len(), 1);
    }

    #[test]
    fn recent_respects_the_limit_and_unknown_sessions() {
        let history = InMemoryHistory::new();
        for _ in 0..5 {
            history.append(record("s1", None));
        }
        assert_eq!(history.recent("s1", 2).len(), 2);
        assert!(history.recent("nope", 10).is_empty());
    }
}
