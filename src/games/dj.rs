//! Multi-round song request game: viewers request songs, the top four go up
//! for an A-D vote, and each round's winner lands on the playlist.

use std::collections::HashSet;

use indexmap::IndexMap;
use tokio::time::Instant;

use crate::error::EngineError;

/// Phase of a DJ game round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DjPhase {
    /// Song requests are being collected.
    Requesting,
    /// Viewers vote A-D on the top songs.
    Voting,
    /// Short pause before the next round's request phase.
    CoolDown,
    /// The game is over; the playlist is immutable.
    Ended,
}

/// Aggregated requests for one normalised song title.
#[derive(Debug, Clone, Default)]
pub struct SongRequest {
    /// Number of distinct participants that requested the song.
    pub count: u64,
    /// Participants that already contributed to this song.
    pub contributors: HashSet<String>,
}

/// One song put up for vote, labelled for the current round.
#[derive(Debug, Clone)]
pub struct TopSong {
    /// Vote label (`A` through `D`), assigned in descending request order.
    pub label: char,
    /// Normalised song title.
    pub title: String,
    /// Request count the song carried into the vote.
    pub requests: u64,
}

/// Vote tally for one label of the current round.
#[derive(Debug, Clone, Default)]
pub struct LabelVotes {
    /// Number of votes cast for this label.
    pub count: u64,
    /// Participants that voted for this label.
    pub voters: HashSet<String>,
}

/// One completed round's outcome.
#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    /// Winning song title.
    pub song: String,
    /// Label the song carried during the vote.
    pub winning_label: char,
    /// Votes the winner received.
    pub vote_count: u64,
    /// Round number, starting at 1.
    pub round: u32,
}

/// State machine for the DJ game.
#[derive(Debug)]
pub struct DjGame {
    phase: DjPhase,
    round: u32,
    auto_loop: bool,
    request_secs: u64,
    voting_secs: u64,
    cooldown_secs: u64,
    max_top: usize,
    deadline: Instant,
    requests: IndexMap<String, SongRequest>,
    top_songs: Vec<TopSong>,
    votes: Vec<LabelVotes>,
    voted: HashSet<String>,
    playlist: Vec<PlaylistEntry>,
}

impl DjGame {
    /// Start round 1 in the request phase, ending at `now + request_secs`.
    pub fn start(
        auto_loop: bool,
        request_secs: u64,
        voting_secs: u64,
        cooldown_secs: u64,
        max_top: usize,
        now: Instant,
    ) -> Result<Self, EngineError> {
        if request_secs == 0 || voting_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "dj phase durations must be strictly positive".into(),
            ));
        }
        if max_top == 0 || max_top > 4 {
            return Err(EngineError::InvalidConfig(format!(
                "dj top-song count must be between 1 and 4, got {max_top}"
            )));
        }

        Ok(Self {
            phase: DjPhase::Requesting,
            round: 1,
            auto_loop,
            request_secs,
            voting_secs,
            cooldown_secs,
            max_top,
            deadline: now + std::time::Duration::from_secs(request_secs),
            requests: IndexMap::new(),
            top_songs: Vec::new(),
            votes: Vec::new(),
            voted: HashSet::new(),
            playlist: Vec::new(),
        })
    }

    /// Record a song request. Each participant contributes at most once per
    /// song but may request several distinct songs.
    pub fn ingest_request(&mut self, participant_id: &str, title: &str) -> bool {
        if self.phase != DjPhase::Requesting {
            return false;
        }

        let request = self.requests.entry(title.to_owned()).or_default();
        if !request.contributors.insert(participant_id.to_owned()) {
            return false;
        }
        request.count += 1;
        true
    }

    /// Record a vote for the label at `label_index`. One vote per participant
    /// per round; the first vote counts.
    pub fn ingest_vote(&mut self, participant_id: &str, label_index: usize) -> bool {
        if self.phase != DjPhase::Voting || label_index >= self.top_songs.len() {
            return false;
        }
        if !self.voted.insert(participant_id.to_owned()) {
            return false;
        }

        let tally = &mut self.votes[label_index];
        tally.count += 1;
        tally.voters.insert(participant_id.to_owned());
        true
    }

    /// Drive the phase machine when the current deadline fires. Returns the
    /// next deadline, or `None` when the game ended. Calling this on an ended
    /// game is absorbed as a no-op.
    ///
    /// Terminal rules: an empty request phase ends the whole game instead of
    /// holding an empty vote, and a voting phase with zero votes ends the
    /// round with no winner (no playlist entry) and the game with it.
    pub fn advance_phase(&mut self, now: Instant) -> Option<Instant> {
        match self.phase {
            DjPhase::Requesting => {
                if self.requests.is_empty() {
                    self.phase = DjPhase::Ended;
                    return None;
                }
                self.begin_voting(now);
                Some(self.deadline)
            }
            DjPhase::Voting => {
                let Some(entry) = self.round_winner() else {
                    self.phase = DjPhase::Ended;
                    return None;
                };
                self.playlist.push(entry);
                if !self.auto_loop {
                    self.phase = DjPhase::Ended;
                    return None;
                }
                self.phase = DjPhase::CoolDown;
                self.deadline = now + std::time::Duration::from_secs(self.cooldown_secs);
                Some(self.deadline)
            }
            DjPhase::CoolDown => {
                self.begin_round(now);
                Some(self.deadline)
            }
            DjPhase::Ended => None,
        }
    }

    /// End the game immediately (explicit stop). The playlist keeps whatever
    /// completed rounds produced.
    pub fn force_end(&mut self) {
        self.phase = DjPhase::Ended;
    }

    /// Rank the requests, keep the top songs, and open the vote.
    fn begin_voting(&mut self, now: Instant) {
        let mut ranked: Vec<(String, u64)> = self
            .requests
            .iter()
            .map(|(title, request)| (title.clone(), request.count))
            .collect();
        // Stable sort keeps first-seen order among equal counts.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(self.max_top);

        self.top_songs = ranked
            .into_iter()
            .enumerate()
            .map(|(index, (title, requests))| TopSong {
                label: char::from(b'A' + index as u8),
                title,
                requests,
            })
            .collect();
        self.votes = vec![LabelVotes::default(); self.top_songs.len()];
        self.voted.clear();
        self.phase = DjPhase::Voting;
        self.deadline = now + std::time::Duration::from_secs(self.voting_secs);
    }

    /// Start the next round with a clean slate.
    fn begin_round(&mut self, now: Instant) {
        self.round += 1;
        self.requests.clear();
        self.top_songs.clear();
        self.votes.clear();
        self.voted.clear();
        self.phase = DjPhase::Requesting;
        self.deadline = now + std::time::Duration::from_secs(self.request_secs);
    }

    /// The current round's winning entry, or `None` when no votes were cast.
    /// A linear scan keeps the first maximum, so vote ties resolve to the
    /// earlier label.
    fn round_winner(&self) -> Option<PlaylistEntry> {
        let mut winner: Option<usize> = None;
        for (index, tally) in self.votes.iter().enumerate() {
            match winner {
                Some(best) if tally.count <= self.votes[best].count => {}
                _ if tally.count > 0 => winner = Some(index),
                _ => {}
            }
        }

        winner.map(|index| PlaylistEntry {
            song: self.top_songs[index].title.clone(),
            winning_label: self.top_songs[index].label,
            vote_count: self.votes[index].count,
            round: self.round,
        })
    }

    /// Current phase.
    pub fn phase(&self) -> DjPhase {
        self.phase
    }

    /// Current round number, starting at 1.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Whether the game reached its terminal state.
    pub fn is_ended(&self) -> bool {
        self.phase == DjPhase::Ended
    }

    /// Deadline of the current phase.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Songs up for vote this round, labels in descending request order.
    pub fn top_songs(&self) -> &[TopSong] {
        &self.top_songs
    }

    /// Per-label tallies of the current round, aligned with [`top_songs`].
    ///
    /// [`top_songs`]: Self::top_songs
    pub fn votes(&self) -> &[LabelVotes] {
        &self.votes
    }

    /// Requests collected so far this round, in first-seen order.
    pub fn requests(&self) -> impl Iterator<Item = (&String, &SongRequest)> {
        self.requests.iter()
    }

    /// Winning songs of completed rounds, in round order.
    pub fn playlist(&self) -> &[PlaylistEntry] {
        &self.playlist
    }
}
