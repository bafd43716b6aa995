//! Client state snapshot and its reducers.
//!
//! The whole client state is one immutable [`AppState`] value. Every change
//! (rollover, check-in resolution, penalty, habit CRUD) is a function from
//! the current snapshot to a [`Transition`] holding the next snapshot plus
//! the events it produced. Callers swap the snapshot in one assignment, so no
//! observer ever sees a half-applied change.

mod persist;
mod reducer;
pub mod rollover;

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::habit::{Habit, HabitId};

pub use persist::{PersistedState, STATE_VERSION};
pub use reducer::{reduce, Action};
pub use rollover::roll_over;

/// Starting wallet balance for a fresh install.
pub const DEFAULT_WALLET: f64 = 100.0;

/// Per-day completion and streak state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyState {
    pub completed_today: BTreeSet<HabitId>,
    pub paid_today: BTreeSet<HabitId>,
    /// Habits whose stake was already deducted from the wallet today.
    pub penalized_today: BTreeSet<HabitId>,
    pub last_checked_date: NaiveDate,
    pub current_streak: u32,
    /// High-water mark; may exceed `current_streak`.
    pub longest_streak: u32,
    pub habit_history: BTreeMap<HabitId, BTreeSet<NaiveDate>>,
}

impl DailyState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            completed_today: BTreeSet::new(),
            paid_today: BTreeSet::new(),
            penalized_today: BTreeSet::new(),
            last_checked_date: today,
            current_streak: 0,
            longest_streak: 0,
            habit_history: BTreeMap::new(),
        }
    }

    /// Whether the habit was answered (done or missed) today.
    pub fn is_resolved(&self, id: HabitId) -> bool {
        self.completed_today.contains(&id) || self.paid_today.contains(&id)
    }

    pub fn completed_on(&self, id: HabitId, date: NaiveDate) -> bool {
        self.habit_history
            .get(&id)
            .is_some_and(|dates| dates.contains(&date))
    }
}

/// Full client state snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub wallet: f64,
    pub habits: Vec<Habit>,
    pub daily: DailyState,
}

impl AppState {
    /// First-run defaults.
    pub fn new(today: NaiveDate) -> Self {
        Self::with_wallet(today, DEFAULT_WALLET)
    }

    pub fn with_wallet(today: NaiveDate, wallet: f64) -> Self {
        Self {
            wallet,
            habits: Vec::new(),
            daily: DailyState::new(today),
        }
    }

    pub fn habit(&self, id: HabitId) -> Option<&Habit> {
        self.habits.iter().find(|h| h.id == id)
    }

    /// Deduct a stake, clamping the balance at zero.
    pub(crate) fn debit(&mut self, amount: f64) -> f64 {
        self.wallet = (self.wallet - amount.max(0.0)).max(0.0);
        self.wallet
    }
}

/// Result of applying one reducer step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: AppState,
    pub events: Vec<Event>,
}

impl Transition {
    pub fn unchanged(state: &AppState) -> Self {
        Self {
            state: state.clone(),
            events: Vec::new(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.events.is_empty()
    }

    /// Chain another reducer step, accumulating events.
    pub fn then<F>(self, step: F) -> crate::error::Result<Self>
    where
        F: FnOnce(&AppState) -> crate::error::Result<Transition>,
    {
        let mut events = self.events;
        let next = step(&self.state)?;
        events.extend(next.events);
        Ok(Self {
            state: next.state,
            events,
        })
    }
}
