//! Serialisable views of game state for status polling and push transports.

use serde::Serialize;
use uuid::Uuid;

use crate::games::{ActiveGame, DjPhase, GameKind};
use crate::stats::LiveStats;

/// Point-in-time view of a session's game, safe to serialise at any
/// polling frequency.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// Session the game belongs to.
    pub session_id: String,
    /// Identity of the game instance.
    pub game_id: Uuid,
    /// Which mini-game is running.
    pub kind: GameKind,
    /// Name of the current phase.
    pub phase: &'static str,
    /// Whole seconds until the current phase's deadline (0 once ended).
    pub remaining_secs: u64,
    /// Rolling live statistics.
    pub stats: LiveStats,
    /// Type-specific records.
    pub detail: GameDetail,
}

/// One giveaway entry as exposed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct WheelEntryView {
    /// Entrant identifier.
    pub participant_id: String,
    /// Comment that triggered the entry.
    pub raw_text: String,
    /// Captured avatar reference, when the feed supplied one.
    pub avatar: Option<String>,
}

/// One poll option with its live tally.
#[derive(Debug, Clone, Serialize)]
pub struct PollOptionView {
    /// Option label (`A`, `B`, ...).
    pub id: String,
    /// Display text.
    pub text: String,
    /// Current vote count.
    pub votes: u64,
    /// Percentage of total votes, present once the poll ended.
    pub percentage: Option<u32>,
}

/// One racer's progress.
#[derive(Debug, Clone, Serialize)]
pub struct RacerView {
    /// Racer identifier.
    pub participant_id: String,
    /// Current track position.
    pub position: u32,
    /// Most recent advance.
    pub speed: u32,
    /// Accepted comments so far.
    pub comment_count: u64,
}

/// One song up for vote this round.
#[derive(Debug, Clone, Serialize)]
pub struct TopSongView {
    /// Vote label.
    pub label: char,
    /// Normalised song title.
    pub title: String,
    /// Requests the song carried into the vote.
    pub requests: u64,
    /// Votes received so far this round.
    pub votes: u64,
}

/// One completed round on the playlist.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistEntryView {
    /// Winning song title.
    pub song: String,
    /// Label it carried during the vote.
    pub winning_label: char,
    /// Votes it won with.
    pub vote_count: u64,
    /// Round number.
    pub round: u32,
}

/// Type-specific snapshot data, tagged per game kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameDetail {
    /// Lucky wheel records.
    LuckyWheel {
        /// Configured trigger keyword.
        keyword: String,
        /// Entries in arrival order.
        entries: Vec<WheelEntryView>,
        /// Drawn winner, once ended.
        winner: Option<String>,
    },
    /// Poll records.
    Poll {
        /// The question being asked.
        question: String,
        /// Options with live tallies.
        options: Vec<PollOptionView>,
        /// Winning option text, once ended.
        winner: Option<String>,
    },
    /// Race records.
    Race {
        /// Position racers are running towards.
        goal: u32,
        /// Racers in join order.
        participants: Vec<RacerView>,
        /// Declared winner, once ended.
        winner: Option<String>,
    },
    /// DJ game records.
    Dj {
        /// Current round, starting at 1.
        round: u32,
        /// Songs up for vote with their tallies.
        top_songs: Vec<TopSongView>,
        /// Winning songs of completed rounds.
        playlist: Vec<PlaylistEntryView>,
    },
}

/// Name of the game's current phase.
pub fn phase_name(game: &ActiveGame) -> &'static str {
    match game {
        ActiveGame::LuckyWheel(wheel) => {
            if wheel.is_ended() {
                "ended"
            } else {
                "collecting"
            }
        }
        ActiveGame::Poll(poll) => {
            if poll.is_ended() {
                "ended"
            } else {
                "active"
            }
        }
        ActiveGame::Race(race) => {
            if race.is_ended() {
                "ended"
            } else {
                "active"
            }
        }
        ActiveGame::Dj(dj) => match dj.phase() {
            DjPhase::Requesting => "requesting",
            DjPhase::Voting => "voting",
            DjPhase::CoolDown => "cool_down",
            DjPhase::Ended => "ended",
        },
    }
}

/// Build the type-specific detail block from the game's current records.
pub fn detail_of(game: &ActiveGame) -> GameDetail {
    match game {
        ActiveGame::LuckyWheel(wheel) => GameDetail::LuckyWheel {
            keyword: wheel.keyword().to_owned(),
            entries: wheel
                .entries()
                .map(|entry| WheelEntryView {
                    participant_id: entry.participant_id.clone(),
                    raw_text: entry.raw_text.clone(),
                    avatar: entry.avatar.clone(),
                })
                .collect(),
            winner: wheel.winner_entry().map(|entry| entry.participant_id),
        },
        ActiveGame::Poll(poll) => {
            let counts = poll.live_counts();
            let results = poll.results();
            GameDetail::Poll {
                question: poll.question().to_owned(),
                options: poll
                    .options()
                    .iter()
                    .enumerate()
                    .map(|(index, option)| PollOptionView {
                        id: option.id.clone(),
                        text: option.text.clone(),
                        votes: counts[index],
                        percentage: results.map(|r| r.percentages[index]),
                    })
                    .collect(),
                winner: results.map(|r| poll.options()[r.winner_index].text.clone()),
            }
        }
        ActiveGame::Race(race) => GameDetail::Race {
            goal: race.goal(),
            participants: race
                .participants()
                .map(|(id, racer)| RacerView {
                    participant_id: id.clone(),
                    position: racer.position,
                    speed: racer.speed,
                    comment_count: racer.comment_count,
                })
                .collect(),
            winner: race.winner().map(ToOwned::to_owned),
        },
        ActiveGame::Dj(dj) => GameDetail::Dj {
            round: dj.round(),
            top_songs: dj
                .top_songs()
                .iter()
                .enumerate()
                .map(|(index, song)| TopSongView {
                    label: song.label,
                    title: song.title.clone(),
                    requests: song.requests,
                    votes: dj.votes().get(index).map(|tally| tally.count).unwrap_or(0),
                })
                .collect(),
            playlist: dj
                .playlist()
                .iter()
                .map(|entry| PlaylistEntryView {
                    song: entry.song.clone(),
                    winning_label: entry.winning_label,
                    vote_count: entry.vote_count,
                    round: entry.round,
                })
                .collect(),
        },
    }
}

/// Ranked popularity input for the stats block (songs or options).
pub(crate) fn popular_items_of(game: &ActiveGame) -> Vec<(String, u64)> {
    match game {
        ActiveGame::LuckyWheel(_) | ActiveGame::Race(_) => Vec::new(),
        ActiveGame::Poll(poll) => {
            let counts = poll.live_counts();
            poll.options()
                .iter()
                .zip(counts)
                .map(|(option, count)| (option.text.clone(), count))
                .collect()
        }
        ActiveGame::Dj(dj) => match dj.phase() {
            DjPhase::Voting => dj
                .top_songs()
                .iter()
                .enumerate()
                .map(|(index, song)| {
                    let votes = dj.votes().get(index).map(|tally| tally.count).unwrap_or(0);
                    (song.title.clone(), votes)
                })
                .collect(),
            _ => dj
                .requests()
                .map(|(title, request)| (title.clone(), request.count))
                .collect(),
        },
    }
}
