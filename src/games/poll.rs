//! Multiple-choice poll: one vote per participant, keyword substring match,
//! winner by first-reached maximum in option order.

use indexmap::IndexMap;
use tokio::time::Instant;

use crate::error::EngineError;

/// Phase of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Votes are being collected.
    Active,
    /// Results are computed and immutable.
    Ended,
}

/// One configured poll option.
#[derive(Debug, Clone)]
pub struct PollOption {
    /// Stable label for the option (`A`, `B`, ... in declaration order).
    pub id: String,
    /// Display text.
    pub text: String,
    /// Keyword matched as uppercase substring against comments.
    pub keyword: String,
}

/// Final tally of a poll.
#[derive(Debug, Clone)]
pub struct PollResults {
    /// Vote count per option, in declaration order.
    pub counts: Vec<u64>,
    /// Percentage of total votes per option (all zero when nobody voted).
    pub percentages: Vec<u32>,
    /// Index of the winning option (first option reaching the maximum).
    pub winner_index: usize,
}

/// State machine for a multiple-choice poll.
#[derive(Debug)]
pub struct PollGame {
    status: PollStatus,
    question: String,
    options: Vec<PollOption>,
    votes: IndexMap<String, usize>,
    deadline: Instant,
    results: Option<PollResults>,
}

impl PollGame {
    /// Start a poll over `options` (at least two), ending at
    /// `now + duration_secs`.
    pub fn start(
        question: String,
        options: Vec<(String, String)>,
        duration_secs: u64,
        now: Instant,
    ) -> Result<Self, EngineError> {
        if options.len() < 2 {
            return Err(EngineError::InvalidConfig(
                "a poll requires at least two options".into(),
            ));
        }
        if duration_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "poll duration must be strictly positive".into(),
            ));
        }
        if options
            .iter()
            .any(|(_, keyword)| keyword.trim().is_empty())
        {
            return Err(EngineError::InvalidConfig(
                "poll option keywords must not be empty".into(),
            ));
        }

        let options = options
            .into_iter()
            .enumerate()
            .map(|(index, (text, keyword))| PollOption {
                id: option_label(index),
                text,
                keyword: keyword.trim().to_uppercase(),
            })
            .collect();

        Ok(Self {
            status: PollStatus::Active,
            question,
            options,
            votes: IndexMap::new(),
            deadline: now + std::time::Duration::from_secs(duration_secs),
            results: None,
        })
    }

    /// Record a vote for the option at `option_index`. The first vote wins;
    /// later votes from the same participant are ignored.
    pub fn ingest(&mut self, participant_id: &str, option_index: usize) -> bool {
        if self.status == PollStatus::Ended
            || option_index >= self.options.len()
            || self.votes.contains_key(participant_id)
        {
            return false;
        }

        self.votes.insert(participant_id.to_owned(), option_index);
        true
    }

    /// Close the poll and compute the results. Idempotent: a second call
    /// returns the cached results without recounting.
    ///
    /// The winner is found by a single linear scan that keeps the first
    /// maximum, so ties resolve to the earliest option in declaration order;
    /// with zero votes that scan structurally lands on the first option.
    pub fn end_phase(&mut self) -> PollResults {
        if let Some(results) = &self.results {
            return results.clone();
        }

        let mut counts = vec![0u64; self.options.len()];
        for option_index in self.votes.values() {
            counts[*option_index] += 1;
        }

        let total: u64 = counts.iter().sum();
        let percentages = counts
            .iter()
            .map(|count| {
                if total == 0 {
                    0
                } else {
                    ((*count as f64 / total as f64) * 100.0).round() as u32
                }
            })
            .collect();

        let mut winner_index = 0;
        for (index, count) in counts.iter().enumerate() {
            if *count > counts[winner_index] {
                winner_index = index;
            }
        }

        let results = PollResults {
            counts,
            percentages,
            winner_index,
        };
        self.status = PollStatus::Ended;
        self.results = Some(results.clone());
        results
    }

    /// Whether the poll is closed.
    pub fn is_ended(&self) -> bool {
        self.status == PollStatus::Ended
    }

    /// Absolute end of the voting window.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// The poll question.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Configured options in declaration order.
    pub fn options(&self) -> &[PollOption] {
        &self.options
    }

    /// Number of recorded votes (one per participant).
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    /// Current per-option tallies without closing the poll.
    pub fn live_counts(&self) -> Vec<u64> {
        let mut counts = vec![0u64; self.options.len()];
        for option_index in self.votes.values() {
            counts[*option_index] += 1;
        }
        counts
    }

    /// Cached results, present once the poll ended.
    pub fn results(&self) -> Option<&PollResults> {
        self.results.as_ref()
    }
}

/// Label options `A`, `B`, ..., falling back to the numeric index past `Z`.
fn option_label(index: usize) -> String {
    if index < 26 {
        char::from(b'A' + index as u8).to_string()
    } else {
        format!("{}", index + 1)
    }
}
