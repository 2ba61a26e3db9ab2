//! Pure classification of raw comment text against a game's current phase.
//!
//! Matchers have no side effects: every decision is a function of the game's
//! phase, its captured configuration, and the text.

use crate::games::{ActiveGame, DjPhase, PollOption};

/// Recognised song-request prefixes, stripped case-insensitively.
const REQUEST_PREFIXES: [&str; 4] = ["PLAY:", "SONG:", "REQUEST:", "MUSIC:"];

/// Minimum length of a normalised song title.
const MIN_TITLE_LEN: usize = 2;

/// What a comment means to the active game, if anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The comment contains the wheel trigger keyword; record an entry.
    WheelEntry,
    /// The comment votes for the poll option at this index.
    PollVote(usize),
    /// Any non-empty comment advances the racer.
    RaceAdvance,
    /// The comment requests this normalised song title.
    SongRequest(String),
    /// The comment votes for the top-song label at this index.
    LabelVote(usize),
}

/// Classify `text` against the game's current phase and configuration.
/// Returns `None` when the comment is not relevant to the game right now.
pub fn match_event(game: &ActiveGame, text: &str) -> Option<MatchOutcome> {
    match game {
        ActiveGame::LuckyWheel(wheel) => {
            wheel.trigger().is_match(text).then_some(MatchOutcome::WheelEntry)
        }
        ActiveGame::Poll(poll) => match_poll_option(poll.options(), text).map(MatchOutcome::PollVote),
        ActiveGame::Race(_) => (!text.trim().is_empty()).then_some(MatchOutcome::RaceAdvance),
        ActiveGame::Dj(dj) => match dj.phase() {
            DjPhase::Requesting => normalize_song_title(text).map(MatchOutcome::SongRequest),
            DjPhase::Voting => {
                match_vote_label(text, dj.top_songs().len()).map(MatchOutcome::LabelVote)
            }
            DjPhase::CoolDown | DjPhase::Ended => None,
        },
    }
}

/// First option in declaration order whose keyword appears in the uppercased
/// text as a substring.
pub fn match_poll_option(options: &[PollOption], text: &str) -> Option<usize> {
    let upper = text.to_uppercase();
    options
        .iter()
        .position(|option| upper.contains(&option.keyword))
}

/// Normalise a song request: strip one recognised prefix, trim, require at
/// least two characters, and title-case each word so variants of the same
/// title collapse into one key.
pub fn normalize_song_title(text: &str) -> Option<String> {
    let mut remainder = text.trim();
    for prefix in REQUEST_PREFIXES {
        if let Some(head) = remainder.get(..prefix.len()) {
            if head.eq_ignore_ascii_case(prefix) {
                remainder = remainder[prefix.len()..].trim();
                break;
            }
        }
    }

    if remainder.chars().count() < MIN_TITLE_LEN {
        return None;
    }

    let title = remainder
        .split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ");
    Some(title)
}

/// A trimmed, uppercased single letter `A`.. mapping to an occupied label.
pub fn match_vote_label(text: &str, occupied: usize) -> Option<usize> {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    let letter = chars.next()?;
    if chars.next().is_some() {
        return None;
    }

    let upper = letter.to_ascii_uppercase();
    if !upper.is_ascii_uppercase() {
        return None;
    }
    let index = (upper as u8 - b'A') as usize;
    (index < occupied).then_some(index)
}

/// Uppercase the first character of a word, lowercase the rest.
fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
