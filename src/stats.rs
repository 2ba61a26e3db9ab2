//! Read-side aggregation of in-flight game records for dashboards.
//!
//! Everything here recomputes from the game's current records on demand and
//! never mutates them, so it is safe to call at arbitrary polling frequency.

use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;

/// How many contributors/items a stats block ranks.
const TOP_N: usize = 5;

/// One ranked contributor.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContributorStat {
    /// Participant identifier.
    pub participant_id: String,
    /// Accepted events from this participant in the current game.
    pub events: u64,
}

/// One ranked popular item (song or poll option).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ItemStat {
    /// Item label (song title or option text).
    pub item: String,
    /// Popularity count (requests or votes).
    pub count: u64,
}

/// Rolling summary of an in-progress game.
#[derive(Debug, Clone, Serialize)]
pub struct LiveStats {
    /// Accepted events divided by elapsed phase seconds.
    pub events_per_second: f64,
    /// Top contributors by accepted-event count, first-seen tie order.
    pub top_contributors: Vec<ContributorStat>,
    /// Top items by popularity count, first-seen tie order.
    pub popular_items: Vec<ItemStat>,
}

/// Compute a stats block from a game's current counters.
///
/// `contributions` must preserve first-seen insertion order; the stable sort
/// below then keeps that order among equal counts. `items` follows the same
/// rule for songs/options.
pub fn compute(
    accepted_events: u64,
    elapsed: Duration,
    contributions: &IndexMap<String, u64>,
    items: &[(String, u64)],
) -> LiveStats {
    let seconds = elapsed.as_secs_f64();
    let events_per_second = if seconds > 0.0 {
        accepted_events as f64 / seconds
    } else {
        0.0
    };

    let mut top_contributors: Vec<ContributorStat> = contributions
        .iter()
        .map(|(participant_id, events)| ContributorStat {
            participant_id: participant_id.clone(),
            events: *events,
        })
        .collect();
    top_contributors.sort_by(|a, b| b.events.cmp(&a.events));
    top_contributors.truncate(TOP_N);

    let mut popular_items: Vec<ItemStat> = items
        .iter()
        .map(|(item, count)| ItemStat {
            item: item.clone(),
            count: *count,
        })
        .collect();
    popular_items.sort_by(|a, b| b.count.cmp(&a.count));
    popular_items.truncate(TOP_N);

    LiveStats {
        events_per_second,
        top_contributors,
        popular_items,
    }
}
