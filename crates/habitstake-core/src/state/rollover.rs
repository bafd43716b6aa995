//! Day rollover.
//!
//! Runs when the locally observed date differs from `lastCheckedDate`. The
//! streak is judged on the last checked day only: it extends when that day
//! had at least one active habit and all of them were completed, and resets
//! to zero otherwise (including a day with nothing scheduled).

use chrono::{FixedOffset, NaiveDate};
use tracing::debug;

use super::{AppState, DailyState, Transition};
use crate::events::Event;
use crate::schedule;

/// Advance `state` to `today`.
///
/// Returns an unchanged transition when `today` is already the checked date.
/// The resulting snapshot has empty daily sets, the new date, and the new
/// streak values together.
pub fn roll_over(state: &AppState, today: NaiveDate, offset: &FixedOffset) -> Transition {
    let previous = &state.daily;
    if previous.last_checked_date == today {
        return Transition::unchanged(state);
    }

    let yesterday = previous.last_checked_date;
    let scheduled: Vec<_> = state
        .habits
        .iter()
        .filter(|h| schedule::is_active_on(h, yesterday, offset))
        .collect();
    let all_done = !scheduled.is_empty()
        && scheduled
            .iter()
            .all(|h| previous.completed_today.contains(&h.id));

    let current_streak = if all_done {
        previous.current_streak.saturating_add(1)
    } else {
        0
    };
    let longest_streak = previous.longest_streak.max(current_streak);

    debug!(
        from = %yesterday,
        to = %today,
        scheduled = scheduled.len(),
        all_done,
        current_streak,
        "rolling over local day"
    );

    let next = AppState {
        wallet: state.wallet,
        habits: state.habits.clone(),
        daily: DailyState {
            last_checked_date: today,
            current_streak,
            longest_streak,
            habit_history: previous.habit_history.clone(),
            ..DailyState::new(today)
        },
    };

    Transition {
        state: next,
        events: vec![Event::RolledOver {
            from: yesterday,
            to: today,
            all_done,
            current_streak,
            longest_streak,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{Habit, HabitDraft, HabitId};
    use chrono::{Offset, TimeZone, Utc};

    fn utc() -> FixedOffset {
        Utc.fix()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn habit(id: i64, days: &[u8]) -> Habit {
        HabitDraft {
            name: format!("habit-{id}"),
            days_of_week: days.iter().copied().collect(),
            end_time: Some("09:00".into()),
            skip_cost: 1.0,
            ..HabitDraft::default()
        }
        .into_habit(HabitId::from_instant(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::milliseconds(id),
        ))
    }

    fn state_on(day: NaiveDate, habits: Vec<Habit>) -> AppState {
        let mut state = AppState::new(day);
        state.habits = habits;
        state
    }

    // 2024-03-04 is a Monday.

    #[test]
    fn same_day_is_noop() {
        let state = state_on(date(4), vec![habit(1, &[1])]);
        let t = roll_over(&state, date(4), &utc());
        assert!(t.is_noop());
        assert_eq!(t.state, state);
    }

    #[test]
    fn all_done_extends_streak_and_clears_marks() {
        let a = habit(1, &[1]);
        let b = habit(2, &[1]);
        let mut state = state_on(date(4), vec![a.clone(), b.clone()]);
        state.daily.completed_today.extend([a.id, b.id]);
        state.daily.penalized_today.insert(a.id);
        state.daily.current_streak = 2;
        state.daily.longest_streak = 2;

        let t = roll_over(&state, date(5), &utc());
        assert_eq!(t.state.daily.current_streak, 3);
        assert_eq!(t.state.daily.longest_streak, 3);
        assert!(t.state.daily.completed_today.is_empty());
        assert!(t.state.daily.paid_today.is_empty());
        assert!(t.state.daily.penalized_today.is_empty());
        assert_eq!(t.state.daily.last_checked_date, date(5));
    }

    #[test]
    fn missed_habit_resets_streak_but_keeps_longest() {
        let a = habit(1, &[1]);
        let b = habit(2, &[1]);
        let mut state = state_on(date(4), vec![a.clone(), b.clone()]);
        state.daily.completed_today.insert(a.id);
        state.daily.paid_today.insert(b.id);
        state.daily.current_streak = 4;
        state.daily.longest_streak = 6;

        let t = roll_over(&state, date(5), &utc());
        assert_eq!(t.state.daily.current_streak, 0);
        assert_eq!(t.state.daily.longest_streak, 6);
    }

    #[test]
    fn habit_free_day_resets_streak() {
        // Only scheduled on Saturdays; Monday has nothing scheduled.
        let mut state = state_on(date(4), vec![habit(1, &[6])]);
        state.daily.current_streak = 5;
        state.daily.longest_streak = 5;

        let t = roll_over(&state, date(5), &utc());
        assert_eq!(t.state.daily.current_streak, 0);
        assert_eq!(t.state.daily.longest_streak, 5);
        assert!(matches!(
            t.events.as_slice(),
            [Event::RolledOver { all_done: false, .. }]
        ));
    }

    #[test]
    fn paused_habits_are_not_counted() {
        let a = habit(1, &[1]);
        let mut b = habit(2, &[1]);
        b.paused_until = Some("2024-03-10".into());
        let mut state = state_on(date(4), vec![a.clone(), b]);
        state.daily.completed_today.insert(a.id);

        let t = roll_over(&state, date(5), &utc());
        assert_eq!(t.state.daily.current_streak, 1);
    }

    #[test]
    fn history_survives_rollover() {
        let a = habit(1, &[1]);
        let mut state = state_on(date(4), vec![a.clone()]);
        state.daily.habit_history.entry(a.id).or_default().insert(date(4));

        let t = roll_over(&state, date(5), &utc());
        assert!(t.state.daily.completed_on(a.id, date(4)));
    }
}
