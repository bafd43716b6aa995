use chrono::{DateTime, FixedOffset};
use clap::Subcommand;
use habitstake_core::payment::{ChargeRequest, HttpPaymentProcessor, PaymentProcessor};
use habitstake_core::{CheckInOutcome, Event, Habit, HabitId};
use serde_json::json;
use tracing::{info, warn};

use super::{log_events, print_json, CmdResult, Session};

#[derive(Subcommand)]
pub enum CheckinAction {
    /// Show the pending check-in queue
    Status,
    /// Mark a habit (default: the visible prompt) as done today
    Done {
        /// Habit ID
        id: Option<HabitId>,
    },
    /// Mark a habit (default: the visible prompt) as missed today
    Missed {
        /// Habit ID
        id: Option<HabitId>,
    },
}

/// Ask the payment processor for the stake. The answer is already recorded;
/// failures are only logged.
fn request_charge(session: &Session, habit: &Habit) {
    let payment = &session.config.payment;
    let processor = match HttpPaymentProcessor::from_config(payment, session.config.dispatch.request_timeout()) {
        Ok(p) => p,
        Err(e) => {
            info!(error = %e, "skipping charge request");
            return;
        }
    };
    match processor.charge(&ChargeRequest::for_habit(habit, payment)) {
        Ok(handle) => info!(payment_id = %handle.payment_id, habit_id = %habit.id, "charge requested"),
        Err(e) => warn!(error = %e, habit_id = %habit.id, "charge request failed"),
    }
}

fn answer(session: &mut Session, id: Option<HabitId>, outcome: CheckInOutcome) -> CmdResult {
    let now = session.now;
    let (habit_id, events) = match id {
        Some(id) => (id, session.tracker.answer(id, outcome, now)?),
        None => session
            .tracker
            .answer_head(outcome, now)?
            .ok_or("no check-in pending")?,
    };
    log_events(&events);

    let resolved = events
        .iter()
        .any(|e| matches!(e, Event::CheckInResolved { .. }));
    if resolved && outcome == CheckInOutcome::Missed {
        if let Some(habit) = session.tracker.state().habit(habit_id) {
            request_charge(session, habit);
        }
    }

    session.save()?;
    print_json(&events)
}

pub fn run(action: CheckinAction, at: Option<DateTime<FixedOffset>>) -> CmdResult {
    let mut session = Session::open(at)?;

    match action {
        CheckinAction::Status => {
            let state = session.tracker.state();
            let queue = session.tracker.queue();
            let pending: Vec<_> = queue
                .pending()
                .filter_map(|id| state.habit(id))
                .map(|h| json!({ "habitId": h.id, "name": h.name, "skipCost": h.skip_cost }))
                .collect();
            print_json(&json!({
                "date": session.now.date_naive(),
                "current": queue.head(),
                "pending": pending,
                "wallet": state.wallet,
            }))?;
            session.save()?;
        }
        CheckinAction::Done { id } => answer(&mut session, id, CheckInOutcome::Done)?,
        CheckinAction::Missed { id } => answer(&mut session, id, CheckInOutcome::Missed)?,
    }
    Ok(())
}
