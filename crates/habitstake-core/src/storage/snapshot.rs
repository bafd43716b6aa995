//! Client snapshot persistence.
//!
//! The state blob and the check-in queue live side by side in the key-value
//! store so one-shot CLI invocations share the same day, marks and shown set.
//! A long-running writer uses [`load_snapshot`]/[`save_snapshot`], which only
//! save over the state blob they loaded.

use chrono::NaiveDate;
use tracing::warn;

use super::KvStore;
use crate::checkin::CheckInQueue;
use crate::error::Result;
use crate::state::AppState;
use crate::tracker::Tracker;

pub const STATE_KEY: &str = "app_state";
pub const QUEUE_KEY: &str = "checkin_queue";

/// A loaded tracker and the state blob it was read from.
pub struct Snapshot {
    pub tracker: Tracker,
    base: Option<String>,
}

/// Load the stored snapshot, or a fresh one dated `today`.
///
/// A missing or unreadable queue starts empty; the next poll rebuilds it.
pub fn load_tracker(store: &dyn KvStore, today: NaiveDate, starting_wallet: f64) -> Result<Tracker> {
    Ok(load_snapshot(store, today, starting_wallet)?.tracker)
}

pub fn load_snapshot(store: &dyn KvStore, today: NaiveDate, starting_wallet: f64) -> Result<Snapshot> {
    let base = store.get(STATE_KEY)?;
    let state = match &base {
        Some(blob) => AppState::from_blob(blob)?,
        None => AppState::with_wallet(today, starting_wallet.max(0.0)),
    };
    let queue = match store.get(QUEUE_KEY)? {
        Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!(error = %e, "discarding unreadable check-in queue");
            CheckInQueue::new()
        }),
        None => CheckInQueue::new(),
    };
    Ok(Snapshot {
        tracker: Tracker::new(state, queue),
        base,
    })
}

pub fn save_tracker(store: &dyn KvStore, tracker: &Tracker) -> Result<()> {
    store.set(STATE_KEY, &tracker.state().to_blob()?, None)?;
    store.set(QUEUE_KEY, &serde_json::to_string(tracker.queue())?, None)?;
    Ok(())
}

/// Save unless another writer replaced the state blob since it was loaded.
/// Returns `false`, writing nothing, when it lost that race.
pub fn save_snapshot(store: &dyn KvStore, snapshot: &Snapshot) -> Result<bool> {
    let blob = snapshot.tracker.state().to_blob()?;
    if !store.replace_if(STATE_KEY, snapshot.base.as_deref(), &blob)? {
        return Ok(false);
    }
    store.set(QUEUE_KEY, &serde_json::to_string(snapshot.tracker.queue())?, None)?;
    Ok(true)
}
