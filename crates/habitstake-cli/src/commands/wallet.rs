use chrono::{DateTime, FixedOffset};
use clap::Subcommand;
use habitstake_core::state::Action;
use serde_json::json;

use super::{log_events, print_json, CmdResult, Session};

#[derive(Subcommand)]
pub enum WalletAction {
    /// Show balance and streaks
    Show,
    /// Add funds
    Deposit {
        /// Amount to add
        amount: f64,
    },
}

pub fn run(action: WalletAction, at: Option<DateTime<FixedOffset>>) -> CmdResult {
    let mut session = Session::open(at)?;

    match action {
        WalletAction::Show => {
            let state = session.tracker.state();
            print_json(&json!({
                "wallet": state.wallet,
                "currentStreak": state.daily.current_streak,
                "longestStreak": state.daily.longest_streak,
                "penalizedToday": state.daily.penalized_today,
            }))?;
        }
        WalletAction::Deposit { amount } => {
            let events = session.tracker.apply(Action::Deposit(amount))?;
            log_events(&events);
            print_json(&events)?;
        }
    }
    session.save()
}
