//! Game state machines and the tagged variant that ties them together.

pub mod dj;
pub mod lucky_wheel;
pub mod poll;
pub mod race;

use serde::Serialize;
use tokio::time::Instant;

pub use self::dj::{DjGame, DjPhase, PlaylistEntry};
pub use self::lucky_wheel::{LuckyWheelGame, WheelEntry};
pub use self::poll::{PollGame, PollOption, PollResults};
pub use self::race::{RaceGame, Racer};

/// The kind of mini-game, used for control-plane reporting and history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    /// Keyword giveaway with a random draw at the end.
    LuckyWheel,
    /// Multiple-choice poll.
    Poll,
    /// Comment-driven progress race.
    Race,
    /// Multi-round song request and voting game.
    Dj,
}

impl std::fmt::Display for GameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GameKind::LuckyWheel => "lucky_wheel",
            GameKind::Poll => "poll",
            GameKind::Race => "race",
            GameKind::Dj => "dj",
        };
        f.write_str(name)
    }
}

/// Caller-supplied option for a poll start request.
#[derive(Debug, Clone)]
pub struct PollOptionInput {
    /// Display text of the option.
    pub text: String,
    /// Keyword matched (case-insensitively, as substring) against comments.
    pub keyword: String,
}

/// Start parameters for a new game. Fields left at `None` fall back to the
/// settings snapshot captured when the game starts.
#[derive(Debug, Clone)]
pub enum GameConfig {
    /// Start a lucky wheel giveaway.
    LuckyWheel {
        /// Trigger keyword override.
        keyword: Option<String>,
        /// Collection window override in seconds.
        duration_secs: Option<u64>,
    },
    /// Start a poll.
    Poll {
        /// Question override.
        question: Option<String>,
        /// Options override; at least two when supplied.
        options: Option<Vec<PollOptionInput>>,
        /// Voting window override in seconds.
        duration_secs: Option<u64>,
    },
    /// Start a race.
    Race {
        /// Race duration override in seconds.
        duration_secs: Option<u64>,
    },
    /// Start a DJ game.
    Dj {
        /// Whether finished rounds chain into new ones automatically.
        auto_loop: Option<bool>,
        /// Request phase length override in seconds.
        request_secs: Option<u64>,
        /// Voting phase length override in seconds.
        voting_secs: Option<u64>,
    },
}

impl GameConfig {
    /// Which game kind this configuration starts.
    pub fn kind(&self) -> GameKind {
        match self {
            GameConfig::LuckyWheel { .. } => GameKind::LuckyWheel,
            GameConfig::Poll { .. } => GameKind::Poll,
            GameConfig::Race { .. } => GameKind::Race,
            GameConfig::Dj { .. } => GameKind::Dj,
        }
    }
}

/// Tagged variant over the four concrete game state machines.
///
/// Each variant owns its own phase, deadline, and participant records; there
/// is deliberately no shared polymorphic struct with optional fields.
#[derive(Debug)]
pub enum ActiveGame {
    /// A lucky wheel giveaway.
    LuckyWheel(LuckyWheelGame),
    /// A multiple-choice poll.
    Poll(PollGame),
    /// A progress race.
    Race(RaceGame),
    /// A DJ song-request game.
    Dj(DjGame),
}

impl ActiveGame {
    /// Kind tag for this game.
    pub fn kind(&self) -> GameKind {
        match self {
            ActiveGame::LuckyWheel(_) => GameKind::LuckyWheel,
            ActiveGame::Poll(_) => GameKind::Poll,
            ActiveGame::Race(_) => GameKind::Race,
            ActiveGame::Dj(_) => GameKind::Dj,
        }
    }

    /// Whether the game reached its terminal state.
    pub fn is_ended(&self) -> bool {
        match self {
            ActiveGame::LuckyWheel(game) => game.is_ended(),
            ActiveGame::Poll(game) => game.is_ended(),
            ActiveGame::Race(game) => game.is_ended(),
            ActiveGame::Dj(game) => game.is_ended(),
        }
    }

    /// Deadline of the current phase, if the game is still running.
    pub fn deadline(&self) -> Option<Instant> {
        match self {
            ActiveGame::LuckyWheel(game) => (!game.is_ended()).then(|| game.deadline()),
            ActiveGame::Poll(game) => (!game.is_ended()).then(|| game.deadline()),
            ActiveGame::Race(game) => (!game.is_ended()).then(|| game.deadline()),
            ActiveGame::Dj(game) => (!game.is_ended()).then(|| game.deadline()),
        }
    }
}
