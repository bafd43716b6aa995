//! Client habit registry: the only place habits are created, replaced or
//! removed. Each operation returns a new snapshot.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::habit::{Habit, HabitDraft, HabitId};
use crate::state::{AppState, Transition};

/// Create a habit whose id is its creation instant.
///
/// Two habits created within the same millisecond get consecutive ids so
/// ids stay unique.
pub fn create(state: &AppState, draft: HabitDraft, at: DateTime<Utc>) -> Result<Transition> {
    let mut id = HabitId::from_instant(at);
    while state.habit(id).is_some() {
        id = HabitId::from_millis(id.as_millis() + 1);
    }
    let habit = draft.into_habit(id).normalize()?;

    info!(habit_id = %habit.id, name = %habit.name, "habit created");

    let mut next = state.clone();
    let event = Event::HabitCreated {
        habit_id: habit.id,
        name: habit.name.clone(),
    };
    next.habits.push(habit);
    Ok(Transition {
        state: next,
        events: vec![event],
    })
}

/// Replace a habit wholesale. The id selects the habit and never changes.
pub fn update(state: &AppState, habit: Habit) -> Result<Transition> {
    let habit = habit.normalize()?;
    let position = state
        .habits
        .iter()
        .position(|h| h.id == habit.id)
        .ok_or(CoreError::HabitNotFound(habit.id))?;

    let mut next = state.clone();
    let habit_id = habit.id;
    next.habits[position] = habit;
    Ok(Transition {
        state: next,
        events: vec![Event::HabitUpdated { habit_id }],
    })
}

/// Remove a habit along with its daily marks and history.
pub fn delete(state: &AppState, id: HabitId) -> Result<Transition> {
    if state.habit(id).is_none() {
        return Err(CoreError::HabitNotFound(id));
    }

    let mut next = state.clone();
    next.habits.retain(|h| h.id != id);
    next.daily.completed_today.remove(&id);
    next.daily.paid_today.remove(&id);
    next.daily.penalized_today.remove(&id);
    next.daily.habit_history.remove(&id);

    info!(habit_id = %id, "habit deleted");

    Ok(Transition {
        state: next,
        events: vec![Event::HabitDeleted { habit_id: id }],
    })
}

/// Habits in creation order.
pub fn list(state: &AppState) -> Vec<&Habit> {
    let mut habits: Vec<&Habit> = state.habits.iter().collect();
    habits.sort_by_key(|h| h.id);
    habits
}
