//! Demo binary: runs the engine against a short scripted chat feed and
//! prints the resulting snapshots and history records.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_arcade::config::SettingsProvider;
use chat_arcade::feed::{self, ChatEvent};
use chat_arcade::games::{GameConfig, PollOptionInput};
use chat_arcade::history::InMemoryHistory;
use chat_arcade::registry::GameEngine;

const SESSIONS: [&str; 4] = ["demo-wheel", "demo-poll", "demo-race", "demo-dj"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let engine = GameEngine::new(SettingsProvider::load(), Arc::new(InMemoryHistory::new()));

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(feed::run_feed(engine.clone(), rx));

    engine
        .start_game(
            "demo-wheel",
            GameConfig::LuckyWheel {
                keyword: None,
                duration_secs: Some(2),
            },
        )
        .await?;
    engine
        .start_game(
            "demo-poll",
            GameConfig::Poll {
                question: Some("Cats or dogs?".into()),
                options: Some(vec![
                    PollOptionInput {
                        text: "Cats".into(),
                        keyword: "CAT".into(),
                    },
                    PollOptionInput {
                        text: "Dogs".into(),
                        keyword: "DOG".into(),
                    },
                ]),
                duration_secs: Some(2),
            },
        )
        .await?;
    engine
        .start_game(
            "demo-race",
            GameConfig::Race {
                duration_secs: Some(2),
            },
        )
        .await?;
    engine
        .start_game(
            "demo-dj",
            GameConfig::Dj {
                auto_loop: Some(false),
                request_secs: Some(2),
                voting_secs: Some(2),
            },
        )
        .await?;

    let script = [
        ("demo-wheel", "alice", "let me join the GAME"),
        ("demo-wheel", "bob", "game time!"),
        ("demo-wheel", "alice", "GAME GAME GAME"),
        ("demo-poll", "carol", "team cats"),
        ("demo-poll", "dave", "dogs forever"),
        ("demo-poll", "erin", "cat person here"),
        ("demo-race", "frank", "go go go"),
        ("demo-race", "grace", "zoom"),
        ("demo-race", "frank", "faster!"),
        ("demo-dj", "heidi", "play: bohemian rhapsody"),
        ("demo-dj", "ivan", "song: thunderstruck"),
        ("demo-dj", "judy", "PLAY: Bohemian Rhapsody"),
    ];
    for (session, participant, text) in script {
        tx.send(ChatEvent::new(session, participant, text))
            .await
            .context("feeding demo event")?;
    }

    // Let the events land, then show every session mid-game.
    sleep(Duration::from_millis(200)).await;
    for session in SESSIONS {
        let snapshot = engine.status(session).await?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    // Past the two-second deadlines the DJ session is in its voting phase.
    sleep(Duration::from_secs(3)).await;
    for (participant, vote) in [("heidi", "A"), ("ivan", "b"), ("judy", "a")] {
        tx.send(ChatEvent::new("demo-dj", participant, vote))
            .await
            .context("feeding demo vote")?;
    }

    sleep(Duration::from_secs(3)).await;
    for session in SESSIONS {
        let snapshot = engine.status(session).await?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        for record in engine.history().recent(session, 5) {
            info!(
                session,
                kind = %record.kind,
                winner = record.winner.as_deref().unwrap_or("none"),
                participants = record.entrants.len(),
                "completed game"
            );
        }
    }

    Ok(())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
