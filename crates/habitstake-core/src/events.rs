use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::habit::HabitId;

/// User answer to a check-in prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckInOutcome {
    Done,
    Missed,
}

/// Every state change in the system produces an Event.
/// The CLI prints them; the poll loop logs them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Local calendar day advanced and daily marks were reset.
    RolledOver {
        from: NaiveDate,
        to: NaiveDate,
        all_done: bool,
        current_streak: u32,
        longest_streak: u32,
    },
    HabitCreated {
        habit_id: HabitId,
        name: String,
    },
    HabitUpdated {
        habit_id: HabitId,
    },
    HabitDeleted {
        habit_id: HabitId,
    },
    /// Habit entered the check-in queue.
    CheckInQueued {
        habit_id: HabitId,
        name: String,
        at: DateTime<FixedOffset>,
    },
    CheckInResolved {
        habit_id: HabitId,
        outcome: CheckInOutcome,
        date: NaiveDate,
    },
    /// Stake deducted from the wallet.
    PenaltyApplied {
        habit_id: HabitId,
        amount: f64,
        wallet: f64,
        date: NaiveDate,
    },
    WalletDeposited {
        amount: f64,
        wallet: f64,
    },
    /// Local reminder timer fired and passed re-validation.
    ReminderFired {
        habit_id: HabitId,
        at: DateTime<FixedOffset>,
    },
}
