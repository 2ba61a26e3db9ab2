//! Progress race: every comment advances its author by a random step; the
//! first racer to reach the goal wins immediately, otherwise the highest
//! position at the deadline takes it.

use indexmap::IndexMap;
use rand::Rng;
use tokio::time::Instant;

use crate::error::EngineError;

/// Phase of a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceStatus {
    /// Comments advance racers.
    Active,
    /// A racer reached the goal or the deadline fired.
    Ended,
}

/// Per-participant race record.
#[derive(Debug, Clone)]
pub struct Racer {
    /// Current track position, clamped to the goal.
    pub position: u32,
    /// Size of the most recent advance.
    pub speed: u32,
    /// Number of accepted comments from this racer.
    pub comment_count: u64,
    /// When the racer last advanced.
    pub last_event_at: Instant,
}

/// State machine for the progress race.
#[derive(Debug)]
pub struct RaceGame {
    status: RaceStatus,
    deadline: Instant,
    goal: u32,
    step_min: u32,
    step_max: u32,
    participants: IndexMap<String, Racer>,
    winner: Option<String>,
}

impl RaceGame {
    /// Start a race ending at `now + duration_secs`.
    pub fn start(
        duration_secs: u64,
        goal: u32,
        step_min: u32,
        step_max: u32,
        now: Instant,
    ) -> Result<Self, EngineError> {
        if duration_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "race duration must be strictly positive".into(),
            ));
        }
        if goal == 0 || step_min == 0 || step_min > step_max {
            return Err(EngineError::InvalidConfig(format!(
                "invalid race parameters (goal {goal}, step {step_min}..={step_max})"
            )));
        }

        Ok(Self {
            status: RaceStatus::Active,
            deadline: now + std::time::Duration::from_secs(duration_secs),
            goal,
            step_min,
            step_max,
            participants: IndexMap::new(),
            winner: None,
        })
    }

    /// Advance `participant_id` by a random step in the configured range.
    /// Returns `false` once the race has ended.
    pub fn ingest<R: Rng>(&mut self, participant_id: &str, rng: &mut R, now: Instant) -> bool {
        let delta = rng.random_range(self.step_min..=self.step_max);
        self.advance(participant_id, delta, now)
    }

    /// Advance `participant_id` by exactly `delta` units. Positions are
    /// monotonically non-decreasing and clamp at the goal; reaching the goal
    /// declares the racer winner and ends the race on the spot.
    pub fn advance(&mut self, participant_id: &str, delta: u32, now: Instant) -> bool {
        if self.status == RaceStatus::Ended {
            return false;
        }

        let racer = self
            .participants
            .entry(participant_id.to_owned())
            .or_insert(Racer {
                position: 0,
                speed: 0,
                comment_count: 0,
                last_event_at: now,
            });
        racer.position = (racer.position + delta).min(self.goal);
        racer.speed = delta;
        racer.comment_count += 1;
        racer.last_event_at = now;

        if racer.position >= self.goal {
            self.status = RaceStatus::Ended;
            self.winner = Some(participant_id.to_owned());
        }
        true
    }

    /// End the race at its deadline. The winner is the racer with the highest
    /// position; ties resolve to the racer that reached it first in iteration
    /// order. No participants yields no winner. Idempotent: an already-ended
    /// race returns the cached winner.
    pub fn end_phase(&mut self) -> Option<String> {
        if self.status == RaceStatus::Ended {
            return self.winner.clone();
        }

        self.status = RaceStatus::Ended;
        let mut best: Option<(&String, u32)> = None;
        for (id, racer) in &self.participants {
            match best {
                Some((_, position)) if racer.position <= position => {}
                _ => best = Some((id, racer.position)),
            }
        }
        self.winner = best.map(|(id, _)| id.clone());
        self.winner.clone()
    }

    /// Whether the race finished (goal reached or deadline fired).
    pub fn is_ended(&self) -> bool {
        self.status == RaceStatus::Ended
    }

    /// Absolute end of the race window.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// The declared winner, if any.
    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    /// Racers in join order.
    pub fn participants(&self) -> impl Iterator<Item = (&String, &Racer)> {
        self.participants.iter()
    }

    /// Number of racers that commented at least once.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Position the racers are running towards.
    pub fn goal(&self) -> u32 {
        self.goal
    }
}
