use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use super::{rollover, AppState, Transition};
use crate::checkin;
use crate::error::{Result, ValidationError};
use crate::events::{CheckInOutcome, Event};
use crate::habit::{Habit, HabitDraft, HabitId};
use crate::registry::habits;

/// Every way the client state can change.
#[derive(Debug, Clone)]
pub enum Action {
    Rollover {
        today: NaiveDate,
        offset: FixedOffset,
    },
    CreateHabit {
        draft: HabitDraft,
        at: DateTime<Utc>,
    },
    UpdateHabit(Habit),
    DeleteHabit(HabitId),
    Resolve {
        habit_id: HabitId,
        outcome: CheckInOutcome,
        now: DateTime<FixedOffset>,
    },
    ApplyPenalties {
        now: DateTime<FixedOffset>,
    },
    Deposit(f64),
}

/// Apply one action to a snapshot, producing the next snapshot.
pub fn reduce(state: &AppState, action: Action) -> Result<Transition> {
    match action {
        Action::Rollover { today, offset } => Ok(rollover::roll_over(state, today, &offset)),
        Action::CreateHabit { draft, at } => habits::create(state, draft, at),
        Action::UpdateHabit(habit) => habits::update(state, habit),
        Action::DeleteHabit(id) => habits::delete(state, id),
        Action::Resolve {
            habit_id,
            outcome,
            now,
        } => checkin::resolve(state, habit_id, outcome, now),
        Action::ApplyPenalties { now } => Ok(checkin::apply_passive_penalties(state, now)),
        Action::Deposit(amount) => deposit(state, amount),
    }
}

fn deposit(state: &AppState, amount: f64) -> Result<Transition> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "amount".into(),
            message: format!("deposit must be a non-negative amount, got {amount}"),
        }
        .into());
    }
    let mut next = state.clone();
    next.wallet += amount;
    Ok(Transition {
        events: vec![Event::WalletDeposited {
            amount,
            wallet: next.wallet,
        }],
        state: next,
    })
}
