//! Interactive reminder plan.
//!
//! One reminder per habit at its next deadline: today's if it is still
//! ahead, otherwise tomorrow's. The plan is recomputed from scratch whenever
//! the state changes; a firing reminder re-checks the live snapshot through
//! [`should_fire`].

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::habit::{Habit, HabitId};
use crate::schedule;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedReminder {
    pub habit_id: HabitId,
    pub name: String,
    pub fire_at: DateTime<FixedOffset>,
    /// Whether the habit is active on the fire date. Inactive reminders stay
    /// in the plan and are dropped by re-validation when they fire.
    pub active: bool,
}

/// Next deadline instant at or after `now`. `None` for a malformed deadline.
pub fn next_fire_instant(habit: &Habit, now: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    let today = now.date_naive();
    let end = schedule::end_instant(habit, today, now.offset())?;
    if end >= now {
        return Some(end);
    }
    schedule::end_instant(habit, today + Duration::days(1), now.offset())
}

/// Every habit's next reminder, earliest first.
pub fn plan(state: &AppState, now: DateTime<FixedOffset>) -> Vec<PlannedReminder> {
    let mut reminders: Vec<PlannedReminder> = state
        .habits
        .iter()
        .filter_map(|habit| {
            let fire_at = next_fire_instant(habit, now)?;
            Some(PlannedReminder {
                habit_id: habit.id,
                name: habit.name.clone(),
                fire_at,
                active: schedule::is_active_on(habit, fire_at.date_naive(), fire_at.offset()),
            })
        })
        .collect();
    reminders.sort_by_key(|r| (r.fire_at, r.habit_id));
    reminders
}

/// Re-validation at fire time against the live snapshot. Deleted, paused,
/// unscheduled and already answered habits do not fire.
pub fn should_fire(state: &AppState, habit_id: HabitId, now: DateTime<FixedOffset>) -> bool {
    state
        .habit(habit_id)
        .is_some_and(|habit| schedule::is_notifiable(habit, &state.daily, now))
}
