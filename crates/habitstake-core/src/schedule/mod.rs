//! Schedule evaluation.
//!
//! Pure predicates answering whether a habit is scheduled, paused, due for a
//! check-in, or notifiable at a given local instant. Local instants are
//! `DateTime<FixedOffset>`: the wall clock and the offset it was observed in.
//!
//! A malformed `endTime` makes a habit never due and never notifiable.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Timelike, Utc};

use crate::habit::Habit;
use crate::state::DailyState;

/// Deadline used for all-day habits.
pub const ALL_DAY_DEADLINE: (u32, u32) = (23, 59);

/// Day key of a date, 0 = Sunday.
pub fn day_key(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Zero-padded "YYYY-MM-DD" form of a date.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Offset for a device-reported timezone offset.
///
/// Devices report minutes to add to local time to get UTC (UTC-5 is 300).
/// Missing or out-of-range values resolve to UTC.
pub fn offset_from_tz_minutes(tz_offset_minutes: Option<i32>) -> FixedOffset {
    tz_offset_minutes
        .and_then(|m| m.checked_mul(60))
        .and_then(FixedOffset::west_opt)
        .unwrap_or_else(|| Utc.fix())
}

/// Device-local wall clock for a UTC instant.
pub fn device_local_time(now: DateTime<Utc>, tz_offset_minutes: Option<i32>) -> DateTime<FixedOffset> {
    now.with_timezone(&offset_from_tz_minutes(tz_offset_minutes))
}

pub fn is_scheduled_on_day(habit: &Habit, day_key: u8) -> bool {
    habit.effective_days().contains(&day_key)
}

/// True when `pausedUntil` is on or after `date`.
///
/// Compared as strings; the zero-padded format sorts the same as dates.
pub fn is_paused_on_date(habit: &Habit, date: NaiveDate) -> bool {
    match habit.paused_until.as_deref() {
        Some(until) => until >= date_key(date).as_str(),
        None => false,
    }
}

/// Deadline time of day: `endTime`, or 23:59 for all-day habits.
pub fn deadline_time(habit: &Habit) -> Option<NaiveTime> {
    if habit.all_day {
        NaiveTime::from_hms_opt(ALL_DAY_DEADLINE.0, ALL_DAY_DEADLINE.1, 0)
    } else {
        habit.end_time_of_day()
    }
}

/// Deadline instant on `base_date` in the given offset.
pub fn end_instant(habit: &Habit, base_date: NaiveDate, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    let time = deadline_time(habit)?;
    offset.from_local_datetime(&base_date.and_time(time)).single()
}

/// A habit created after its own deadline does not prompt on its creation date.
pub fn created_after_deadline(habit: &Habit, date: NaiveDate, offset: &FixedOffset) -> bool {
    let Some(created) = habit.id.created_at() else {
        return false;
    };
    let created = created.with_timezone(offset);
    if created.date_naive() != date {
        return false;
    }
    match deadline_time(habit) {
        Some(deadline) => created.time() > deadline,
        None => false,
    }
}

/// Scheduled, not paused, and not suppressed as the creation day.
pub fn is_active_on(habit: &Habit, date: NaiveDate, offset: &FixedOffset) -> bool {
    is_scheduled_on_day(habit, day_key(date))
        && !is_paused_on_date(habit, date)
        && !created_after_deadline(habit, date, offset)
}

/// Whether a check-in prompt is due: active today, unresolved, and the local
/// time is strictly after today's deadline.
pub fn is_due_for_check_in(habit: &Habit, daily: &DailyState, now: DateTime<FixedOffset>) -> bool {
    deadline_reached(habit, daily, now, |now, end| now > end)
}

/// Timer re-validation: like [`is_due_for_check_in`] but true from the
/// deadline instant itself, since local timers are armed exactly on it.
pub fn is_notifiable(habit: &Habit, daily: &DailyState, now: DateTime<FixedOffset>) -> bool {
    deadline_reached(habit, daily, now, |now, end| now >= end)
}

fn deadline_reached<F>(habit: &Habit, daily: &DailyState, now: DateTime<FixedOffset>, past: F) -> bool
where
    F: Fn(DateTime<FixedOffset>, DateTime<FixedOffset>) -> bool,
{
    let today = now.date_naive();
    if !is_active_on(habit, today, now.offset()) || daily.is_resolved(habit.id) {
        return false;
    }
    match end_instant(habit, today, now.offset()) {
        Some(end) => past(now, end),
        None => false,
    }
}

/// Server-side reminder predicate: the local wall clock sits in the deadline
/// minute exactly, and the habit is active today. Completion state is not
/// known server-side.
pub fn matches_reminder_minute(habit: &Habit, now: DateTime<FixedOffset>) -> bool {
    let Some(deadline) = deadline_time(habit) else {
        return false;
    };
    now.hour() == deadline.hour()
        && now.minute() == deadline.minute()
        && is_active_on(habit, now.date_naive(), now.offset())
}
