//! Keyword giveaway: viewers enter by saying a trigger word, one entry each,
//! and a uniform random draw picks the winner when the window closes.

use indexmap::IndexMap;
use rand::Rng;
use regex::Regex;
use time::OffsetDateTime;
use tokio::time::Instant;

use crate::error::EngineError;

/// Phase of a lucky wheel game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelStatus {
    /// Entries are being collected until the deadline.
    Collecting,
    /// The draw happened; the result is immutable.
    Ended,
}

/// One recorded giveaway entry.
#[derive(Debug, Clone)]
pub struct WheelEntry {
    /// Identifier of the entering participant.
    pub participant_id: String,
    /// The comment text that triggered the entry.
    pub raw_text: String,
    /// Avatar reference captured from the feed event, when present.
    pub avatar: Option<String>,
    /// Wall-clock time the entry was recorded.
    pub entered_at: OffsetDateTime,
}

/// State machine for the lucky wheel giveaway.
#[derive(Debug)]
pub struct LuckyWheelGame {
    status: WheelStatus,
    keyword: String,
    trigger: Regex,
    deadline: Instant,
    entries: IndexMap<String, WheelEntry>,
    winner: Option<usize>,
}

impl LuckyWheelGame {
    /// Start a new giveaway collecting entries until `now + duration_secs`.
    ///
    /// The keyword is matched case-insensitively as a whole word; an empty
    /// keyword or a zero duration is rejected before any state is created.
    pub fn start(keyword: &str, duration_secs: u64, now: Instant) -> Result<Self, EngineError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(EngineError::InvalidConfig(
                "lucky wheel keyword must not be empty".into(),
            ));
        }
        if duration_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "lucky wheel duration must be strictly positive".into(),
            ));
        }
        // \b only anchors against word characters; a keyword with a
        // punctuation edge would compile but never match.
        let is_word = |c: char| c.is_alphanumeric() || c == '_';
        if !keyword.starts_with(is_word) || !keyword.ends_with(is_word) {
            return Err(EngineError::InvalidConfig(format!(
                "lucky wheel keyword `{keyword}` must start and end with word characters"
            )));
        }

        let pattern = format!(r"(?i)\b{}\b", regex::escape(keyword));
        let trigger = Regex::new(&pattern).map_err(|err| {
            EngineError::InvalidConfig(format!("invalid keyword `{keyword}`: {err}"))
        })?;

        Ok(Self {
            status: WheelStatus::Collecting,
            keyword: keyword.to_owned(),
            trigger,
            deadline: now + std::time::Duration::from_secs(duration_secs),
            entries: IndexMap::new(),
            winner: None,
        })
    }

    /// Record an entry for `participant_id`, stamped with the feed's arrival
    /// time. Returns `false` when the participant already entered or the game
    /// has ended; the first matching comment wins and later ones are ignored.
    pub fn ingest(
        &mut self,
        participant_id: &str,
        raw_text: &str,
        avatar: Option<String>,
        entered_at: OffsetDateTime,
    ) -> bool {
        if self.status == WheelStatus::Ended || self.entries.contains_key(participant_id) {
            return false;
        }

        self.entries.insert(
            participant_id.to_owned(),
            WheelEntry {
                participant_id: participant_id.to_owned(),
                raw_text: raw_text.to_owned(),
                avatar,
                entered_at,
            },
        );
        true
    }

    /// Close the giveaway and draw a uniform random winner over the current
    /// entries. No entries yields no winner, never an error. Idempotent: once
    /// ended, the cached result is returned and the draw is never repeated.
    pub fn end_phase<R: Rng>(&mut self, rng: &mut R) -> Option<WheelEntry> {
        if self.status == WheelStatus::Ended {
            return self.winner_entry();
        }

        self.status = WheelStatus::Ended;
        if !self.entries.is_empty() {
            self.winner = Some(rng.random_range(0..self.entries.len()));
        }
        self.winner_entry()
    }

    /// The drawn winner, if the game ended with at least one entry.
    pub fn winner_entry(&self) -> Option<WheelEntry> {
        self.winner
            .and_then(|index| self.entries.get_index(index))
            .map(|(_, entry)| entry.clone())
    }

    /// Whether the draw already happened.
    pub fn is_ended(&self) -> bool {
        self.status == WheelStatus::Ended
    }

    /// Absolute end of the collection window.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// The configured trigger keyword.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Compiled whole-word, case-insensitive trigger pattern.
    pub(crate) fn trigger(&self) -> &Regex {
        &self.trigger
    }

    /// Recorded entries in arrival order, one per participant.
    pub fn entries(&self) -> impl Iterator<Item = &WheelEntry> {
        self.entries.values()
    }

    /// Number of recorded entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheel(keyword: &str) -> LuckyWheelGame {
        LuckyWheelGame::start(keyword, 10, Instant::now()).unwrap()
    }

    #[test]
    fn rejects_empty_keyword_and_zero_duration() {
        assert!(LuckyWheelGame::start("  ", 10, Instant::now()).is_err());
        assert!(LuckyWheelGame::start("GAME", 0, Instant::now()).is_err());
    }

    #[test]
    fn rejects_keywords_the_word_boundary_cannot_anchor() {
        assert!(LuckyWheelGame::start("!win", 10, Instant::now()).is_err());
        assert!(LuckyWheelGame::start("win!", 10, Instant::now()).is_err());
        assert!(LuckyWheelGame::start("win_2", 10, Instant::now()).is_ok());
    }

    #[test]
    fn entries_keep_the_feed_arrival_time() {
        let mut game = wheel("GAME");
        let stamp = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        game.ingest("alice", "GAME", None, stamp);
        assert_eq!(game.entries().next().unwrap().entered_at, stamp);
    }

    #[test]
    fn first_entry_wins_later_entries_ignored() {
        let mut game = wheel("GAME");
        assert!(game.ingest("alice", "i play GAME now", None, OffsetDateTime::now_utc()));
        assert!(!game.ingest("alice", "GAME GAME", None, OffsetDateTime::now_utc()));
        assert_eq!(game.entry_count(), 1);
        assert_eq!(
            game.entries().next().unwrap().raw_text,
            "i play GAME now"
        );
    }

    #[test]
    fn sole_entrant_always_wins() {
        let mut game = wheel("GAME");
        game.ingest("alice", "GAME", None, OffsetDateTime::now_utc());
        let winner = game.end_phase(&mut rand::rng()).unwrap();
        assert_eq!(winner.participant_id, "alice");
    }

    #[test]
    fn empty_entries_ends_with_no_winner() {
        let mut game = wheel("GAME");
        assert!(game.end_phase(&mut rand::rng()).is_none());
        assert!(game.is_ended());
    }

    #[test]
    fn winner_is_always_one_of_the_entries() {
        let mut game = wheel("GO");
        for name in ["a", "b", "c", "d", "e"] {
            game.ingest(name, "GO", None, OffsetDateTime::now_utc());
        }
        let winner = game.end_phase(&mut rand::rng()).unwrap();
        assert!(["a", "b", "c", "d", "e"].contains(&winner.participant_id.as_str()));
    }

    #[test]
    fn ending_twice_returns_identical_winner() {
        let mut game = wheel("GAME");
        game.ingest("alice", "GAME", None, OffsetDateTime::now_utc());
        game.ingest("bob", "GAME", None, OffsetDateTime::now_utc());
        let first = game.end_phase(&mut rand::rng()).unwrap();
        let second = game.end_phase(&mut rand::rng()).unwrap();
        assert_eq!(first.participant_id, second.participant_id);
    }

    #[test]
    fn no_entries_accepted_after_end() {
        let mut game = wheel("GAME");
        game.end_phase(&mut rand::rng());
        assert!(!game.ingest("late", "GAME", None, OffsetDateTime::now_utc()));
    }
}
