//! Engine for short, timed audience-participation mini-games driven by a
//! live stream's chat feed.
//!
//! Four game types (lucky wheel, poll, race, DJ song requests) run as
//! self-contained state machines, at most one per stream session. Events are
//! classified by pure matchers, recorded with per-participant deduplication,
//! and closed out by phase deadlines that fire exactly once per game
//! instance. Live statistics and an append-only history round out the
//! dashboard surface.

pub mod config;
pub mod dto;
pub mod error;
pub mod feed;
pub mod games;
pub mod history;
pub mod matcher;
pub mod registry;
pub mod scheduler;
pub mod stats;
