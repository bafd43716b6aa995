//! Check-in resolution and the passive penalty path.
//!
//! Missing a habit costs its stake exactly once per day, whichever path gets
//! there first: the user answering "missed", or the poll loop noticing the
//! deadline passed unanswered. `penalizedToday` is the marker both paths
//! consult, so the deduction never repeats.

use chrono::{DateTime, FixedOffset, NaiveDate};
use tracing::{debug, info};

use crate::error::{CoreError, Result, ValidationError};
use crate::events::{CheckInOutcome, Event};
use crate::habit::Habit;
use crate::habit::HabitId;
use crate::schedule;
use crate::state::{AppState, Transition};

/// Record a done/missed answer for today.
///
/// Answering a habit that is already resolved today is a no-op. Payment
/// for a missed habit happens outside the reducer and cannot undo this.
///
/// # Errors
/// Missed is refused for a habit that is paused or not scheduled today.
pub fn resolve(
    state: &AppState,
    habit_id: HabitId,
    outcome: CheckInOutcome,
    now: DateTime<FixedOffset>,
) -> Result<Transition> {
    let habit = state
        .habit(habit_id)
        .ok_or(CoreError::HabitNotFound(habit_id))?;
    if state.daily.is_resolved(habit_id) {
        debug!(habit_id = %habit_id, "check-in already resolved today");
        return Ok(Transition::unchanged(state));
    }

    let date = now.date_naive();
    if outcome == CheckInOutcome::Missed && !schedule::is_active_on(habit, date, now.offset()) {
        return Err(ValidationError::InvalidValue {
            field: "habitId".to_string(),
            message: format!("habit {habit_id} is paused or not scheduled on {date}"),
        }
        .into());
    }

    let mut next = state.clone();
    let mut events = vec![Event::CheckInResolved {
        habit_id,
        outcome,
        date,
    }];

    match outcome {
        CheckInOutcome::Done => {
            next.daily.completed_today.insert(habit_id);
            next.daily
                .habit_history
                .entry(habit_id)
                .or_default()
                .insert(date);
        }
        CheckInOutcome::Missed => {
            next.daily.paid_today.insert(habit_id);
            if let Some(event) = penalize(&mut next, habit, date) {
                events.push(event);
            }
        }
    }

    info!(habit_id = %habit_id, ?outcome, %date, "check-in resolved");
    Ok(Transition {
        state: next,
        events,
    })
}

/// Deduct stakes for every habit whose deadline passed unanswered.
pub fn apply_passive_penalties(state: &AppState, now: DateTime<FixedOffset>) -> Transition {
    let date = now.date_naive();
    let overdue: Vec<&Habit> = state
        .habits
        .iter()
        .filter(|h| !state.daily.penalized_today.contains(&h.id))
        .filter(|h| schedule::is_due_for_check_in(h, &state.daily, now))
        .collect();

    if overdue.is_empty() {
        return Transition::unchanged(state);
    }

    let mut next = state.clone();
    let events = overdue
        .into_iter()
        .filter_map(|habit| penalize(&mut next, habit, date))
        .collect();
    Transition {
        state: next,
        events,
    }
}

fn penalize(state: &mut AppState, habit: &Habit, date: NaiveDate) -> Option<Event> {
    if !state.daily.penalized_today.insert(habit.id) {
        return None;
    }
    let wallet = state.debit(habit.skip_cost);
    info!(habit_id = %habit.id, amount = habit.skip_cost, wallet, "stake deducted");
    Some(Event::PenaltyApplied {
        habit_id: habit.id,
        amount: habit.skip_cost,
        wallet,
        date,
    })
}
