//! Chat event type and the pump that drives the engine from a live feed.
//!
//! The engine does not implement any network protocol; a connector pushes
//! `(session, participant, text)` tuples into a channel and [`run_feed`]
//! forwards them. One pump per connector keeps per-session ordering intact.

use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::debug;

use crate::registry::SharedEngine;

/// One textual event from a live stream session.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    /// Stream session the event belongs to.
    pub session_id: String,
    /// Participant that produced it.
    pub participant_id: String,
    /// Raw comment text.
    pub text: String,
    /// Avatar reference supplied by the connector, when available.
    pub avatar: Option<String>,
    /// Wall-clock arrival time as reported by the feed.
    pub timestamp: OffsetDateTime,
}

impl ChatEvent {
    /// Convenience constructor stamping the current time and no avatar.
    pub fn new(
        session_id: impl Into<String>,
        participant_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            participant_id: participant_id.into(),
            text: text.into(),
            avatar: None,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Forward events from `events` into the engine until the channel closes.
pub async fn run_feed(engine: SharedEngine, mut events: mpsc::Receiver<ChatEvent>) {
    while let Some(event) = events.recv().await {
        engine.ingest(event).await;
    }
    debug!("event feed closed");
}
