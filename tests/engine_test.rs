//! End-to-end engine scenarios driven over a virtual clock.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use chat_arcade::config::{Settings, SettingsProvider};
use chat_arcade::dto::GameDetail;
use chat_arcade::error::EngineError;
use chat_arcade::feed::ChatEvent;
use chat_arcade::games::{GameConfig, PollOptionInput};
use chat_arcade::history::{HistorySink, InMemoryHistory};
use chat_arcade::registry::{GameEngine, SharedEngine};

fn engine() -> (SharedEngine, Arc<InMemoryHistory>) {
    let history = Arc::new(InMemoryHistory::new());
    let engine = GameEngine::new(
        SettingsProvider::fixed(Settings::default()),
        history.clone(),
    );
    (engine, history)
}

fn wheel_config() -> GameConfig {
    GameConfig::LuckyWheel {
        keyword: None,
        duration_secs: None,
    }
}

fn ab_poll_config() -> GameConfig {
    GameConfig::Poll {
        question: Some("A or B?".into()),
        options: Some(vec![
            PollOptionInput {
                text: "A".into(),
                keyword: "A".into(),
            },
            PollOptionInput {
                text: "B".into(),
                keyword: "B".into(),
            },
        ]),
        duration_secs: None,
    }
}

async fn send(engine: &SharedEngine, session: &str, participant: &str, text: &str) -> bool {
    engine.ingest(ChatEvent::new(session, participant, text)).await
}

/// Let spawned deadline tasks run after an `advance`.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

async fn advance(duration: Duration) {
    tokio::time::advance(duration).await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn lucky_wheel_dedups_and_draws_the_sole_entrant() {
    let (engine, history) = engine();
    engine.start_game("s1", wheel_config()).await.unwrap();

    assert!(send(&engine, "s1", "alice", "i play GAME now").await);
    assert!(!send(&engine, "s1", "alice", "GAME GAME").await);
    assert!(!send(&engine, "s1", "bob", "no keyword here").await);

    advance(Duration::from_secs(11)).await;

    let snapshot = engine.status("s1").await.unwrap();
    assert_eq!(snapshot.phase, "ended");
    assert_eq!(snapshot.remaining_secs, 0);
    match snapshot.detail {
        GameDetail::LuckyWheel {
            entries, winner, ..
        } => {
            assert_eq!(entries.len(), 1);
            assert_eq!(winner.as_deref(), Some("alice"));
        }
        other => panic!("expected lucky wheel detail, got {other:?}"),
    }

    let records = history.recent("s1", 10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].winner.as_deref(), Some("alice"));
    // The record keeps the entrant identities, not just a count.
    assert_eq!(records[0].entrants, vec!["alice".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn poll_first_vote_wins_and_ties_resolve_to_first_option() {
    let (engine, _history) = engine();
    engine.start_game("s1", ab_poll_config()).await.unwrap();

    assert!(send(&engine, "s1", "bob", "A").await);
    assert!(send(&engine, "s1", "carol", "B").await);
    // bob already voted; his switch to B is ignored.
    assert!(!send(&engine, "s1", "bob", "B").await);

    advance(Duration::from_secs(31)).await;

    let snapshot = engine.status("s1").await.unwrap();
    match snapshot.detail {
        GameDetail::Poll {
            options, winner, ..
        } => {
            assert_eq!(options[0].votes, 1);
            assert_eq!(options[1].votes, 1);
            assert_eq!(options[0].percentage, Some(50));
            assert_eq!(options[1].percentage, Some(50));
            assert_eq!(winner.as_deref(), Some("A"));
        }
        other => panic!("expected poll detail, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn race_ends_at_deadline_with_highest_position() {
    let (engine, history) = engine();
    engine.start_game("s1", GameConfig::Race { duration_secs: Some(20) }).await.unwrap();

    for _ in 0..3 {
        assert!(send(&engine, "s1", "dan", "go go go").await);
    }
    assert!(send(&engine, "s1", "erin", "zoom").await);

    advance(Duration::from_secs(21)).await;

    let snapshot = engine.status("s1").await.unwrap();
    assert_eq!(snapshot.phase, "ended");
    match snapshot.detail {
        GameDetail::Race {
            participants,
            winner,
            ..
        } => {
            assert_eq!(participants.len(), 2);
            let dan = participants
                .iter()
                .find(|racer| racer.participant_id == "dan")
                .unwrap();
            assert_eq!(dan.comment_count, 3);
            assert!(dan.position >= 9 && dan.position <= 24);
            assert!(winner.is_some());
        }
        other => panic!("expected race detail, got {other:?}"),
    }

    // Comments after the finish line are no-ops.
    assert!(!send(&engine, "s1", "dan", "too late").await);
    assert_eq!(history.recent("s1", 10).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn dj_round_flows_into_the_next_when_auto_loop_is_on() {
    let (engine, history) = engine();
    engine
        .start_game(
            "s1",
            GameConfig::Dj {
                auto_loop: Some(true),
                request_secs: None,
                voting_secs: None,
            },
        )
        .await
        .unwrap();

    for requester in ["r1", "r2", "r3"] {
        assert!(send(&engine, "s1", requester, "play: song a").await);
    }
    assert!(send(&engine, "s1", "r4", "song: song b").await);
    // Votes are not open yet.
    assert!(!send(&engine, "s1", "v1", "A").await);

    // Request phase (30s) closes; voting opens.
    advance(Duration::from_secs(31)).await;
    let snapshot = engine.status("s1").await.unwrap();
    assert_eq!(snapshot.phase, "voting");
    match &snapshot.detail {
        GameDetail::Dj { top_songs, .. } => {
            assert_eq!(top_songs.len(), 2);
            assert_eq!(top_songs[0].title, "Song A");
            assert_eq!(top_songs[0].label, 'A');
            assert_eq!(top_songs[0].requests, 3);
            assert_eq!(top_songs[1].title, "Song B");
        }
        other => panic!("expected dj detail, got {other:?}"),
    }

    assert!(send(&engine, "s1", "v1", "a").await);
    assert!(send(&engine, "s1", "v2", "A").await);
    assert!(send(&engine, "s1", "v3", "b").await);
    assert!(!send(&engine, "s1", "v1", "B").await);

    // Voting (30s) closes; the cooldown runs before round 2.
    advance(Duration::from_secs(31)).await;
    let snapshot = engine.status("s1").await.unwrap();
    assert_eq!(snapshot.phase, "cool_down");

    advance(Duration::from_secs(6)).await;
    let snapshot = engine.status("s1").await.unwrap();
    assert_eq!(snapshot.phase, "requesting");
    match &snapshot.detail {
        GameDetail::Dj {
            round, playlist, ..
        } => {
            assert_eq!(*round, 2);
            assert_eq!(playlist.len(), 1);
            assert_eq!(playlist[0].song, "Song A");
            assert_eq!(playlist[0].winning_label, 'A');
            assert_eq!(playlist[0].vote_count, 2);
            assert_eq!(playlist[0].round, 1);
        }
        other => panic!("expected dj detail, got {other:?}"),
    }

    // Nothing requested in round 2: the game ends at the request deadline.
    advance(Duration::from_secs(31)).await;
    let snapshot = engine.status("s1").await.unwrap();
    assert_eq!(snapshot.phase, "ended");

    let records = history.recent("s1", 10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].playlist.len(), 1);
    assert_eq!(records[0].winner.as_deref(), Some("Song A"));
    // Requesters and voters are all reconstructable from the record.
    for contributor in ["r1", "r2", "r3", "r4", "v1", "v2", "v3"] {
        assert!(records[0].entrants.iter().any(|e| e == contributor));
    }
}

#[tokio::test(start_paused = true)]
async fn dj_without_auto_loop_ends_after_one_round() {
    let (engine, _history) = engine();
    engine
        .start_game(
            "s1",
            GameConfig::Dj {
                auto_loop: Some(false),
                request_secs: None,
                voting_secs: None,
            },
        )
        .await
        .unwrap();

    assert!(send(&engine, "s1", "r1", "play: only song").await);
    advance(Duration::from_secs(31)).await;
    assert!(send(&engine, "s1", "v1", "A").await);
    advance(Duration::from_secs(31)).await;

    let snapshot = engine.status("s1").await.unwrap();
    assert_eq!(snapshot.phase, "ended");
    match snapshot.detail {
        GameDetail::Dj { playlist, .. } => {
            assert_eq!(playlist.len(), 1);
            assert_eq!(playlist[0].song, "Only Song");
        }
        other => panic!("expected dj detail, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn stop_reports_nothing_to_stop_on_idle_and_double_stop() {
    let (engine, history) = engine();

    assert!(matches!(
        engine.stop("nobody").await,
        Err(EngineError::NotFound(_))
    ));

    engine.start_game("s1", wheel_config()).await.unwrap();
    send(&engine, "s1", "alice", "GAME").await;

    let snapshot = engine.stop("s1").await.unwrap();
    assert_eq!(snapshot.phase, "ended");

    assert!(matches!(
        engine.stop("s1").await,
        Err(EngineError::NotFound(_))
    ));
    assert_eq!(history.recent("s1", 10).len(), 1);

    // The cancelled deadline never fires a second transition.
    advance(Duration::from_secs(60)).await;
    assert_eq!(history.recent("s1", 10).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn replacing_a_game_ends_the_old_one_and_its_stale_deadline_is_inert() {
    let (engine, history) = engine();
    engine.start_game("s1", wheel_config()).await.unwrap();
    send(&engine, "s1", "alice", "GAME").await;

    // Replace the wheel with a poll before the wheel deadline.
    let poll_id = engine.start_game("s1", ab_poll_config()).await.unwrap();
    send(&engine, "s1", "bob", "A").await;

    // Past the wheel's 10s deadline: the poll must be untouched.
    advance(Duration::from_secs(11)).await;
    let snapshot = engine.status("s1").await.unwrap();
    assert_eq!(snapshot.game_id, poll_id);
    assert_eq!(snapshot.phase, "active");

    let records = history.recent("s1", 10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].winner.as_deref(), Some("alice"));

    // The poll then closes on its own schedule.
    advance(Duration::from_secs(20)).await;
    assert_eq!(engine.status("s1").await.unwrap().phase, "ended");
    assert_eq!(history.recent("s1", 10).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn cleanup_evicts_only_aged_out_terminal_games() {
    let (engine, _history) = engine();
    engine.start_game("gone", wheel_config()).await.unwrap();
    engine.start_game("fresh", wheel_config()).await.unwrap();
    engine.start_game("running", GameConfig::Race { duration_secs: Some(600) }).await.unwrap();

    // Both wheels end at 10s; "running" keeps going.
    advance(Duration::from_secs(11)).await;
    assert_eq!(engine.cleanup(Instant::now()), 0);

    // Past the 60s retention window for the ended wheels.
    advance(Duration::from_secs(61)).await;
    let stopped = engine.stop("fresh").await;
    assert!(stopped.is_err(), "ended game must not be stoppable");

    // "fresh" ended at the same time as "gone"; both age out together.
    assert_eq!(engine.cleanup(Instant::now()), 2);
    assert!(matches!(
        engine.status("gone").await,
        Err(EngineError::NotFound(_))
    ));
    assert_eq!(engine.session_count(), 1);
    assert_eq!(engine.status("running").await.unwrap().phase, "active");
}

#[tokio::test(start_paused = true)]
async fn status_reports_live_stats_for_an_active_game() {
    let (engine, _history) = engine();
    engine.start_game("s1", ab_poll_config()).await.unwrap();

    send(&engine, "s1", "bob", "A").await;
    send(&engine, "s1", "carol", "B").await;
    advance(Duration::from_secs(10)).await;

    let snapshot = engine.status("s1").await.unwrap();
    assert_eq!(snapshot.phase, "active");
    assert!(snapshot.remaining_secs <= 20);
    assert_eq!(snapshot.stats.top_contributors.len(), 2);
    assert!(snapshot.stats.events_per_second > 0.0);
    // Popularity ranking covers both options, vote-leader first.
    assert_eq!(snapshot.stats.popular_items.len(), 2);

    // Status is read-only: polling it repeatedly changes nothing.
    let again = engine.status("s1").await.unwrap();
    assert_eq!(again.stats.top_contributors.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn settings_refresh_only_applies_to_games_started_afterwards() {
    let mut settings = Settings::default();
    settings.lucky_wheel.duration_secs = 3;
    let history = Arc::new(InMemoryHistory::new());
    let engine = GameEngine::new(SettingsProvider::fixed(settings), history);

    engine.start_game("s1", wheel_config()).await.unwrap();
    // No settings file on disk: the refresh lands on the built-in 10s default.
    engine.settings().refresh();

    // The in-flight game keeps the 3s window captured at its start.
    advance(Duration::from_secs(4)).await;
    assert_eq!(engine.status("s1").await.unwrap().phase, "ended");

    // A game started after the refresh runs on the new snapshot.
    engine.start_game("s2", wheel_config()).await.unwrap();
    advance(Duration::from_secs(4)).await;
    assert_eq!(engine.status("s2").await.unwrap().phase, "collecting");
    advance(Duration::from_secs(7)).await;
    assert_eq!(engine.status("s2").await.unwrap().phase, "ended");
}

#[tokio::test(start_paused = true)]
async fn events_for_idle_sessions_are_dropped() {
    let (engine, _history) = engine();
    assert!(!send(&engine, "idle", "alice", "GAME").await);
}

#[tokio::test(start_paused = true)]
async fn invalid_poll_config_is_rejected_before_any_state_change() {
    let (engine, _history) = engine();
    let result = engine
        .start_game(
            "s1",
            GameConfig::Poll {
                question: None,
                options: Some(vec![PollOptionInput {
                    text: "only".into(),
                    keyword: "ONLY".into(),
                }]),
                duration_secs: None,
            },
        )
        .await;
    assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    assert!(matches!(
        engine.status("s1").await,
        Err(EngineError::NotFound(_))
    ));
    assert_eq!(engine.session_count(), 0);
}
