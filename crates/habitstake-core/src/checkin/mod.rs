//! Check-in queue.
//!
//! Holds the habits awaiting a done/missed answer, in the order they were
//! detected as due. Only the head is shown to the user. A habit enters the
//! queue at most once per local day; the per-day `shown` set remembers
//! which habits were already queued and is cleared when the day changes.
//!
//! ```text
//! NotDue -> Due -> (Resolved-Done | Resolved-Missed)
//! ```

mod resolve;

use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::events::{CheckInOutcome, Event};
use crate::habit::{Habit, HabitId};
use crate::schedule;
use crate::state::{AppState, Transition};

pub use resolve::{apply_passive_penalties, resolve};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInQueue {
    day: Option<NaiveDate>,
    entries: VecDeque<HabitId>,
    shown: BTreeSet<HabitId>,
}

impl CheckInQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn day(&self) -> Option<NaiveDate> {
        self.day
    }

    /// Reset for a new local day. Returns whether anything was reset.
    pub fn begin_day(&mut self, today: NaiveDate) -> bool {
        if self.day == Some(today) {
            return false;
        }
        self.day = Some(today);
        self.entries.clear();
        self.shown.clear();
        true
    }

    /// Append every newly due habit, once per day each.
    ///
    /// Safe to call on every poll; habits already queued or already shown
    /// today are skipped.
    pub fn enqueue_due(&mut self, state: &AppState, now: DateTime<FixedOffset>) -> Vec<Event> {
        self.begin_day(now.date_naive());
        self.prune(state);

        let mut events = Vec::new();
        for habit in &state.habits {
            if self.shown.contains(&habit.id)
                || !schedule::is_due_for_check_in(habit, &state.daily, now)
            {
                continue;
            }
            debug!(habit_id = %habit.id, name = %habit.name, "check-in queued");
            self.entries.push_back(habit.id);
            self.shown.insert(habit.id);
            events.push(Event::CheckInQueued {
                habit_id: habit.id,
                name: habit.name.clone(),
                at: now,
            });
        }
        events
    }

    /// Drop entries whose habit was deleted, already answered, or paused or
    /// unscheduled for the current day by an edit.
    pub fn prune(&mut self, state: &AppState) {
        let today = state.daily.last_checked_date;
        self.entries.retain(|id| {
            state.habit(*id).is_some_and(|h| {
                schedule::is_scheduled_on_day(h, schedule::day_key(today))
                    && !schedule::is_paused_on_date(h, today)
            }) && !state.daily.is_resolved(*id)
        });
    }

    /// The visible prompt.
    pub fn head(&self) -> Option<HabitId> {
        self.entries.front().copied()
    }

    pub fn current<'a>(&self, state: &'a AppState) -> Option<&'a Habit> {
        self.head().and_then(|id| state.habit(id))
    }

    pub fn remove(&mut self, id: HabitId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|queued| *queued != id);
        self.entries.len() != before
    }

    pub fn contains(&self, id: HabitId) -> bool {
        self.entries.contains(&id)
    }

    pub fn was_shown(&self, id: HabitId) -> bool {
        self.shown.contains(&id)
    }

    pub fn pending(&self) -> impl Iterator<Item = HabitId> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Record the user's answer for `habit_id` and take it off the queue.
pub fn answer(
    state: &AppState,
    queue: &mut CheckInQueue,
    habit_id: HabitId,
    outcome: CheckInOutcome,
    now: DateTime<FixedOffset>,
) -> Result<Transition> {
    let transition = resolve(state, habit_id, outcome, now)?;
    queue.remove(habit_id);
    Ok(transition)
}

/// Answer the visible prompt. `None` when nothing is waiting.
pub fn answer_head(
    state: &AppState,
    queue: &mut CheckInQueue,
    outcome: CheckInOutcome,
    now: DateTime<FixedOffset>,
) -> Result<Option<Transition>> {
    match queue.head() {
        Some(id) => answer(state, queue, id, outcome, now).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::HabitDraft;
    use chrono::{Offset, TimeZone, Utc};

    fn at(d: u32, h: u32, m: u32) -> DateTime<FixedOffset> {
        Utc.fix().with_ymd_and_hms(2024, 3, d, h, m, 0).unwrap()
    }

    fn habit(id_ms_offset: i64, end: &str) -> Habit {
        HabitDraft {
            name: format!("habit-{id_ms_offset}"),
            end_time: Some(end.into()),
            skip_cost: 5.0,
            ..HabitDraft::default()
        }
        .into_habit(HabitId::from_instant(
            at(1, 0, 0).with_timezone(&Utc) + chrono::Duration::milliseconds(id_ms_offset),
        ))
    }

    fn state(habits: Vec<Habit>) -> AppState {
        let mut s = AppState::new(at(4, 0, 0).date_naive());
        s.habits = habits;
        s
    }

    #[test]
    fn repeated_enqueue_yields_one_entry() {
        let s = state(vec![habit(1, "18:00")]);
        let mut queue = CheckInQueue::new();
        assert_eq!(queue.enqueue_due(&s, at(4, 18, 1)).len(), 1);
        assert!(queue.enqueue_due(&s, at(4, 18, 5)).is_empty());
        assert!(queue.enqueue_due(&s, at(4, 19, 0)).is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn fifo_by_detection_order() {
        let early = habit(1, "09:00");
        let late = habit(2, "12:00");
        let s = state(vec![late.clone(), early.clone()]);
        let mut queue = CheckInQueue::new();
        queue.enqueue_due(&s, at(4, 10, 0));
        queue.enqueue_due(&s, at(4, 12, 30));
        assert_eq!(queue.pending().collect::<Vec<_>>(), vec![early.id, late.id]);
        assert_eq!(queue.current(&s).map(|h| h.id), Some(early.id));
    }

    #[test]
    fn answered_habit_is_not_requeued_same_day() {
        let h = habit(1, "18:00");
        let s = state(vec![h.clone()]);
        let mut queue = CheckInQueue::new();
        queue.enqueue_due(&s, at(4, 18, 1));

        let t = answer_head(&s, &mut queue, CheckInOutcome::Done, at(4, 18, 2))
            .unwrap()
            .unwrap();
        assert!(queue.is_empty());
        assert!(t.state.daily.completed_today.contains(&h.id));
        assert!(queue.enqueue_due(&t.state, at(4, 18, 3)).is_empty());
        assert!(queue.was_shown(h.id));
    }

    #[test]
    fn new_day_clears_shown_set() {
        let h = habit(1, "18:00");
        let s = state(vec![h.clone()]);
        let mut queue = CheckInQueue::new();
        queue.enqueue_due(&s, at(4, 18, 1));
        assert!(queue.begin_day(at(5, 0, 0).date_naive()));
        assert!(queue.is_empty());
        assert!(!queue.was_shown(h.id));
    }

    #[test]
    fn deleted_habit_is_pruned() {
        let h = habit(1, "18:00");
        let s = state(vec![h.clone()]);
        let mut queue = CheckInQueue::new();
        queue.enqueue_due(&s, at(4, 18, 1));
        let empty = state(Vec::new());
        queue.prune(&empty);
        assert!(queue.head().is_none());
    }

    #[test]
    fn habit_paused_after_queueing_is_pruned() {
        let h = habit(1, "18:00");
        let mut s = state(vec![h.clone()]);
        let mut queue = CheckInQueue::new();
        queue.enqueue_due(&s, at(4, 18, 1));
        s.habits[0].paused_until = Some("2024-03-04".into());
        queue.prune(&s);
        assert!(queue.is_empty());
        assert!(answer_head(&s, &mut queue, CheckInOutcome::Missed, at(4, 18, 2))
            .unwrap()
            .is_none());
    }

    #[test]
    fn answer_head_on_empty_queue_is_none() {
        let s = state(Vec::new());
        let mut queue = CheckInQueue::new();
        assert!(answer_head(&s, &mut queue, CheckInOutcome::Missed, at(4, 9, 0))
            .unwrap()
            .is_none());
    }
}
