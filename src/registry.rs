//! Session game registry: maps each stream session to at most one active
//! game and owns the control plane (start, ingest, stop, status, cleanup).

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use indexmap::IndexMap;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{Settings, SettingsProvider};
use crate::dto::{self, StatusSnapshot};
use crate::error::EngineError;
use crate::feed::ChatEvent;
use crate::games::{ActiveGame, DjGame, GameConfig, LuckyWheelGame, PollGame, RaceGame};
use crate::history::{GameRecord, HistorySink};
use crate::matcher::{self, MatchOutcome};
use crate::scheduler::PhaseScheduler;
use crate::stats;

/// Shared handle to the engine, cloned into deadline tasks and feed pumps.
pub type SharedEngine = Arc<GameEngine>;

/// One session's game instance plus the counters the stats block reads.
///
/// All access goes through the session's mutex, so event ingestion and
/// deadline transitions for the same instance never interleave.
#[derive(Debug)]
struct GameInstance {
    id: Uuid,
    game: ActiveGame,
    accepted_events: u64,
    contributions: IndexMap<String, u64>,
    phase_started: Instant,
    started_at: OffsetDateTime,
    ended_at: Option<Instant>,
}

/// The game engine: registry, scheduler, settings, and history wired together.
pub struct GameEngine {
    sessions: DashMap<String, Arc<Mutex<GameInstance>>>,
    scheduler: PhaseScheduler,
    settings: SettingsProvider,
    history: Arc<dyn HistorySink>,
}

impl GameEngine {
    /// Construct a new engine wrapped in an [`Arc`] so it can be cloned into
    /// deadline tasks cheaply.
    pub fn new(settings: SettingsProvider, history: Arc<dyn HistorySink>) -> SharedEngine {
        Arc::new(Self {
            sessions: DashMap::new(),
            scheduler: PhaseScheduler::new(),
            settings,
            history,
        })
    }

    /// The settings provider (for `refresh()`; in-flight games keep the
    /// snapshot captured at their own start).
    pub fn settings(&self) -> &SettingsProvider {
        &self.settings
    }

    /// The history sink records land in.
    pub fn history(&self) -> Arc<dyn HistorySink> {
        Arc::clone(&self.history)
    }

    /// Start a new game for `session_id`, replacing (and ending) any game
    /// currently active there. Config is validated before any state changes;
    /// the first phase deadline is armed before returning.
    pub async fn start_game(
        self: &Arc<Self>,
        session_id: &str,
        config: GameConfig,
    ) -> Result<Uuid, EngineError> {
        let settings = self.settings.snapshot();
        let now = Instant::now();
        let game = build_game(&config, &settings, now)?;

        if let Some(slot) = self.session_slot(session_id) {
            let mut instance = slot.lock().await;
            if instance.ended_at.is_none() {
                self.scheduler.cancel(instance.id);
                self.finalize_instance(session_id, &mut instance, "replaced");
            }
        }

        let game_id = Uuid::new_v4();
        let deadline = game.deadline();
        let instance = GameInstance {
            id: game_id,
            game,
            accepted_events: 0,
            contributions: IndexMap::new(),
            phase_started: now,
            started_at: OffsetDateTime::now_utc(),
            ended_at: None,
        };
        self.sessions
            .insert(session_id.to_owned(), Arc::new(Mutex::new(instance)));

        if let Some(deadline) = deadline {
            self.arm_deadline(session_id.to_owned(), game_id, deadline);
        }

        info!(
            session = %session_id,
            game = %game_id,
            kind = %config.kind(),
            "game started"
        );
        Ok(game_id)
    }

    /// Feed one chat event into the session's active game. Returns whether
    /// the event was accepted (matched, not a duplicate, game still running).
    ///
    /// Events for idle sessions are dropped silently: the feed is unsolicited
    /// input, not a caller error. An event still in flight when the deadline
    /// fires lands on an ended game and becomes a no-op; that bounded race is
    /// accepted rather than blocking ingestion on the timer.
    pub async fn ingest(&self, event: ChatEvent) -> bool {
        let Some(slot) = self.session_slot(&event.session_id) else {
            return false;
        };
        let mut instance = slot.lock().await;
        if instance.game.is_ended() {
            return false;
        }

        let Some(outcome) = matcher::match_event(&instance.game, &event.text) else {
            return false;
        };

        let now = Instant::now();
        let accepted = match (&mut instance.game, outcome) {
            (ActiveGame::LuckyWheel(wheel), MatchOutcome::WheelEntry) => {
                wheel.ingest(
                    &event.participant_id,
                    &event.text,
                    event.avatar.clone(),
                    event.timestamp,
                )
            }
            (ActiveGame::Poll(poll), MatchOutcome::PollVote(index)) => {
                poll.ingest(&event.participant_id, index)
            }
            (ActiveGame::Race(race), MatchOutcome::RaceAdvance) => {
                let mut rng = rand::rng();
                race.ingest(&event.participant_id, &mut rng, now)
            }
            (ActiveGame::Dj(dj), MatchOutcome::SongRequest(title)) => {
                dj.ingest_request(&event.participant_id, &title)
            }
            (ActiveGame::Dj(dj), MatchOutcome::LabelVote(index)) => {
                dj.ingest_vote(&event.participant_id, index)
            }
            _ => false,
        };

        if accepted {
            instance.accepted_events += 1;
            *instance
                .contributions
                .entry(event.participant_id.clone())
                .or_insert(0) += 1;

            // A race can end mid-ingest when a racer reaches the goal.
            if instance.game.is_ended() {
                self.scheduler.cancel(instance.id);
                self.finalize_instance(&event.session_id, &mut instance, "goal reached");
            }
        }
        accepted
    }

    /// Stop the session's active game now, cancelling its pending deadline
    /// and running its terminal transition. Reports `NotFound` when there is
    /// nothing to stop (idle session or already-ended game).
    pub async fn stop(&self, session_id: &str) -> Result<StatusSnapshot, EngineError> {
        let slot = self.session_slot(session_id).ok_or_else(|| {
            EngineError::NotFound(format!("session `{session_id}` has no active game to stop"))
        })?;

        let mut instance = slot.lock().await;
        if instance.ended_at.is_some() {
            return Err(EngineError::NotFound(format!(
                "session `{session_id}` has no active game to stop"
            )));
        }

        self.scheduler.cancel(instance.id);
        self.finalize_instance(session_id, &mut instance, "stopped");
        Ok(self.snapshot_locked(session_id, &instance))
    }

    /// Current status of the session's game, including the live stats block.
    /// Ended games remain visible until cleanup evicts them.
    pub async fn status(&self, session_id: &str) -> Result<StatusSnapshot, EngineError> {
        let slot = self.session_slot(session_id).ok_or_else(|| {
            EngineError::NotFound(format!("session `{session_id}` has no game"))
        })?;
        let instance = slot.lock().await;
        Ok(self.snapshot_locked(session_id, &instance))
    }

    /// Evict games that ended longer than the retention window ago, so
    /// dashboards can still show "just ended" results briefly without memory
    /// growing across many short-lived sessions. Returns the eviction count.
    pub fn cleanup(&self, now: Instant) -> usize {
        let retention = Duration::from_secs(self.settings.snapshot().retention_secs);
        let mut removed = 0;
        self.sessions.retain(|_, slot| {
            // A locked slot is in active use; keep it for the next sweep.
            let Ok(instance) = slot.try_lock() else {
                return true;
            };
            let keep = match instance.ended_at {
                Some(ended) => now.duration_since(ended) < retention,
                None => true,
            };
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of sessions currently holding a game slot (active or retained).
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Deadline callback. Verifies the firing game instance still owns the
    /// session before transitioning; a stale deadline from a replaced or
    /// stopped game is a logged no-op.
    async fn on_deadline(self: Arc<Self>, session_id: String, game_id: Uuid) {
        self.scheduler.mark_fired(game_id);

        let Some(slot) = self.session_slot(&session_id) else {
            debug!(session = %session_id, game = %game_id, "deadline fired for removed session");
            return;
        };
        let mut instance = slot.lock().await;
        if instance.id != game_id {
            debug!(session = %session_id, game = %game_id, "stale deadline for replaced game");
            return;
        }
        if instance.ended_at.is_some() {
            debug!(session = %session_id, game = %game_id, "deadline fired on ended game");
            return;
        }

        let now = Instant::now();
        if let ActiveGame::Dj(dj) = &mut instance.game {
            if let Some(next) = dj.advance_phase(now) {
                let round = dj.round();
                instance.phase_started = now;
                let phase = dto::phase_name(&instance.game);
                info!(
                    session = %session_id,
                    game = %game_id,
                    round,
                    phase,
                    "dj phase advanced"
                );
                drop(instance);
                self.arm_deadline(session_id, game_id, next);
                return;
            }
        }
        self.finalize_instance(&session_id, &mut instance, "deadline");
    }

    /// Arm a phase deadline that calls back into this engine.
    fn arm_deadline(self: &Arc<Self>, session_id: String, game_id: Uuid, deadline: Instant) {
        let engine = Arc::clone(self);
        self.scheduler.arm(game_id, deadline, move || async move {
            engine.on_deadline(session_id, game_id).await;
        });
    }

    /// Run the game's terminal transition if it has not happened yet, stamp
    /// the end time, and append the completed-game record to history exactly
    /// once. Idempotent through the `ended_at` guard.
    fn finalize_instance(&self, session_id: &str, instance: &mut GameInstance, reason: &str) {
        if instance.ended_at.is_some() {
            return;
        }

        match &mut instance.game {
            ActiveGame::LuckyWheel(wheel) => {
                wheel.end_phase(&mut rand::rng());
            }
            ActiveGame::Poll(poll) => {
                poll.end_phase();
            }
            ActiveGame::Race(race) => {
                race.end_phase();
            }
            ActiveGame::Dj(dj) => dj.force_end(),
        }

        instance.ended_at = Some(Instant::now());
        self.history.append(build_record(session_id, instance));
        info!(
            session = %session_id,
            game = %instance.id,
            kind = %instance.game.kind(),
            reason,
            "game ended"
        );
    }

    /// Build a status snapshot under the session lock.
    fn snapshot_locked(&self, session_id: &str, instance: &GameInstance) -> StatusSnapshot {
        let now = Instant::now();
        let elapsed = instance
            .ended_at
            .unwrap_or(now)
            .duration_since(instance.phase_started);
        let items = dto::popular_items_of(&instance.game);
        let stats = stats::compute(
            instance.accepted_events,
            elapsed,
            &instance.contributions,
            &items,
        );
        let remaining_secs = instance
            .game
            .deadline()
            .map(|deadline| deadline.saturating_duration_since(now).as_secs())
            .unwrap_or(0);

        StatusSnapshot {
            session_id: session_id.to_owned(),
            game_id: instance.id,
            kind: instance.game.kind(),
            phase: dto::phase_name(&instance.game),
            remaining_secs,
            stats,
            detail: dto::detail_of(&instance.game),
        }
    }

    /// Clone the session's slot handle without holding the map shard.
    fn session_slot(&self, session_id: &str) -> Option<Arc<Mutex<GameInstance>>> {
        self.sessions
            .get(session_id)
            .map(|slot| Arc::clone(slot.value()))
    }
}

/// Build a game from its start config over the captured settings snapshot.
/// All validation happens here, before any registry state changes.
fn build_game(
    config: &GameConfig,
    settings: &Settings,
    now: Instant,
) -> Result<ActiveGame, EngineError> {
    match config {
        GameConfig::LuckyWheel {
            keyword,
            duration_secs,
        } => {
            let keyword = keyword.as_deref().unwrap_or(&settings.lucky_wheel.keyword);
            let duration = duration_secs.unwrap_or(settings.lucky_wheel.duration_secs);
            Ok(ActiveGame::LuckyWheel(LuckyWheelGame::start(
                keyword, duration, now,
            )?))
        }
        GameConfig::Poll {
            question,
            options,
            duration_secs,
        } => {
            let question = question
                .clone()
                .unwrap_or_else(|| settings.poll.default_question.clone());
            let options: Vec<(String, String)> = match options {
                Some(inputs) => inputs
                    .iter()
                    .map(|input| (input.text.clone(), input.keyword.clone()))
                    .collect(),
                None => settings
                    .poll
                    .default_options
                    .iter()
                    .map(|option| (option.text.clone(), option.keyword.clone()))
                    .collect(),
            };
            let duration = duration_secs.unwrap_or(settings.poll.duration_secs);
            Ok(ActiveGame::Poll(PollGame::start(
                question, options, duration, now,
            )?))
        }
        GameConfig::Race { duration_secs } => {
            let race = &settings.race;
            Ok(ActiveGame::Race(RaceGame::start(
                duration_secs.unwrap_or(race.duration_secs),
                race.goal,
                race.step_min,
                race.step_max,
                now,
            )?))
        }
        GameConfig::Dj {
            auto_loop,
            request_secs,
            voting_secs,
        } => {
            let dj = &settings.dj;
            Ok(ActiveGame::Dj(DjGame::start(
                auto_loop.unwrap_or(dj.auto_loop),
                request_secs.unwrap_or(dj.request_secs),
                voting_secs.unwrap_or(dj.voting_secs),
                dj.cooldown_secs,
                dj.top_songs,
                now,
            )?))
        }
    }
}

/// Assemble the completed-game record for the history sink.
fn build_record(session_id: &str, instance: &GameInstance) -> GameRecord {
    let (winner, playlist) = match &instance.game {
        ActiveGame::LuckyWheel(wheel) => (
            wheel.winner_entry().map(|entry| entry.participant_id),
            Vec::new(),
        ),
        ActiveGame::Poll(poll) => (
            poll.results()
                .map(|results| poll.options()[results.winner_index].text.clone()),
            Vec::new(),
        ),
        ActiveGame::Race(race) => (race.winner().map(ToOwned::to_owned), Vec::new()),
        ActiveGame::Dj(dj) => (
            dj.playlist().last().map(|entry| entry.song.clone()),
            dj.playlist().to_vec(),
        ),
    };

    GameRecord {
        session_id: session_id.to_owned(),
        game_id: instance.id,
        kind: instance.game.kind(),
        winner,
        entrants: instance.contributions.keys().cloned().collect(),
        playlist,
        started_at: instance.started_at,
        ended_at: OffsetDateTime::now_utc(),
    }
}
