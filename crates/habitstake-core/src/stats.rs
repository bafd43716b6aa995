//! Habit completion statistics.
//!
//! Derived from `habitHistory` and the schedule over a trailing window of
//! local days ending today. A day counts as scheduled when the habit was
//! active on it and already existed by then.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::habit::{Habit, HabitId};
use crate::schedule;
use crate::state::AppState;

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
/// Longer windows are cut to ten years.
pub const MAX_WINDOW_DAYS: u32 = 3650;

fn clamp_window(window_days: u32) -> u32 {
    window_days.clamp(1, MAX_WINDOW_DAYS)
}

/// Completion summary for one habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    pub habit_id: HabitId,
    pub name: String,
    /// Days in the window the habit was expected.
    pub scheduled_days: u32,
    /// Scheduled days with a recorded completion.
    pub completed_days: u32,
    /// completed / scheduled, 0.0 when nothing was scheduled.
    pub completion_rate: f64,
    /// Consecutive scheduled days completed, counting back from the most
    /// recent scheduled day in the window.
    pub current_run: u32,
}

/// Whole-state summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub window_days: u32,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub wallet: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub habits: Vec<HabitStats>,
}

pub fn habit_stats(state: &AppState, habit: &Habit, window_days: u32, now: DateTime<FixedOffset>) -> HabitStats {
    let today = now.date_naive();
    let created = habit
        .id
        .created_at()
        .map(|at| at.with_timezone(now.offset()).date_naive());

    let mut scheduled_days = 0;
    let mut completed_days = 0;
    let mut current_run = 0;
    let mut run_open = true;

    // Walk backwards so the run can stop at the first miss.
    let mut day = Some(today);
    for _ in 0..clamp_window(window_days) {
        let Some(date) = day else { break };
        day = date.pred_opt();
        if created.is_some_and(|c| date < c) {
            break;
        }
        if !schedule::is_active_on(habit, date, now.offset()) {
            continue;
        }
        let completed = state.daily.completed_on(habit.id, date);
        // Today only counts once it has been answered or its deadline passed.
        if date == today && !completed && !deadline_passed(habit, now) {
            continue;
        }
        scheduled_days += 1;
        if completed {
            completed_days += 1;
            if run_open {
                current_run += 1;
            }
        } else {
            run_open = false;
        }
    }

    let completion_rate = if scheduled_days == 0 {
        0.0
    } else {
        f64::from(completed_days) / f64::from(scheduled_days)
    };

    HabitStats {
        habit_id: habit.id,
        name: habit.name.clone(),
        scheduled_days,
        completed_days,
        completion_rate,
        current_run,
    }
}

fn deadline_passed(habit: &Habit, now: DateTime<FixedOffset>) -> bool {
    schedule::end_instant(habit, now.date_naive(), now.offset()).is_some_and(|end| now > end)
}

pub fn report(state: &AppState, window_days: u32, now: DateTime<FixedOffset>) -> StatsReport {
    let window_days = clamp_window(window_days);
    let to = now.date_naive();
    let from = to
        .checked_sub_signed(Duration::days(i64::from(window_days) - 1))
        .unwrap_or(NaiveDate::MIN);
    StatsReport {
        window_days,
        from,
        to,
        wallet: state.wallet,
        current_streak: state.daily.current_streak,
        longest_streak: state.daily.longest_streak,
        habits: state
            .habits
            .iter()
            .map(|h| habit_stats(state, h, window_days, now))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::HabitDraft;
    use chrono::{Offset, TimeZone, Utc};

    fn at(d: u32, h: u32) -> DateTime<FixedOffset> {
        Utc.fix().with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn setup(created_day: u32, days: &[u8]) -> (AppState, Habit) {
        let habit = HabitDraft {
            name: "Gym".into(),
            days_of_week: days.iter().copied().collect(),
            end_time: Some("18:00".into()),
            ..HabitDraft::default()
        }
        .into_habit(HabitId::from_instant(at(created_day, 6).with_timezone(&Utc)));
        let mut state = AppState::new(date(10));
        state.habits.push(habit.clone());
        (state, habit)
    }

    #[test]
    fn rate_counts_only_days_since_creation() {
        // Created Monday the 4th; every day scheduled.
        let (mut state, habit) = setup(4, &[]);
        let history = state.daily.habit_history.entry(habit.id).or_default();
        for d in [4, 5, 7, 8, 9] {
            history.insert(date(d));
        }

        // Sunday the 10th, before the deadline: 4th..9th count.
        let stats = habit_stats(&state, &habit, 30, at(10, 12));
        assert_eq!(stats.scheduled_days, 6);
        assert_eq!(stats.completed_days, 5);
        assert_eq!(stats.current_run, 3);
        assert!((stats.completion_rate - 5.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn unscheduled_days_are_ignored() {
        // Weekdays only, created Monday the 4th.
        let (mut state, habit) = setup(4, &[1, 2, 3, 4, 5]);
        state
            .daily
            .habit_history
            .entry(habit.id)
            .or_default()
            .extend([date(4), date(5), date(6), date(7), date(8)]);

        let stats = habit_stats(&state, &habit, 7, at(10, 20));
        assert_eq!(stats.scheduled_days, 5);
        assert_eq!(stats.completion_rate, 1.0);
        assert_eq!(stats.current_run, 5);
    }

    #[test]
    fn empty_window_has_zero_rate() {
        let (state, habit) = setup(10, &[]);
        let stats = habit_stats(&state, &habit, 7, at(10, 12));
        assert_eq!(stats.scheduled_days, 0);
        assert_eq!(stats.completion_rate, 0.0);
    }

    #[test]
    fn report_window_bounds() {
        let (state, _) = setup(4, &[]);
        let report = report(&state, 7, at(10, 12));
        assert_eq!(report.from, date(4));
        assert_eq!(report.to, date(10));
        assert_eq!(report.habits.len(), 1);
    }

    #[test]
    fn oversized_window_is_clamped() {
        let (state, _) = setup(4, &[]);
        let report = report(&state, u32::MAX, at(10, 12));
        assert_eq!(report.window_days, MAX_WINDOW_DAYS);
        assert_eq!(report.from, date(10) - Duration::days(i64::from(MAX_WINDOW_DAYS) - 1));
    }

    #[test]
    fn window_stops_at_earliest_date() {
        // An id outside the timestamp range has no creation date to stop at.
        let habit = HabitDraft {
            name: "Old".into(),
            end_time: Some("18:00".into()),
            ..HabitDraft::default()
        }
        .into_habit(HabitId::from_millis(i64::MAX));
        let mut state = AppState::new(NaiveDate::MIN);
        state.habits.push(habit.clone());
        let now = Utc.fix().from_utc_datetime(&NaiveDate::MIN.and_hms_opt(12, 0, 0).unwrap());

        let stats = habit_stats(&state, &habit, u32::MAX, now);
        assert_eq!(stats.scheduled_days, 0);
        let report = report(&state, u32::MAX, now);
        assert_eq!(report.from, NaiveDate::MIN);
    }
}
