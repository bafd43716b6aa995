use chrono::{DateTime, FixedOffset};
use clap::Subcommand;
use habitstake_core::notify::plan;

use super::{print_json, CmdResult, Session};

#[derive(Subcommand)]
pub enum RemindersAction {
    /// Next local reminder per habit, earliest first
    Upcoming {
        /// Include reminders that will be skipped (paused or unscheduled)
        #[arg(long)]
        all: bool,
    },
}

pub fn run(action: RemindersAction, at: Option<DateTime<FixedOffset>>) -> CmdResult {
    let session = Session::open(at)?;

    match action {
        RemindersAction::Upcoming { all } => {
            let upcoming: Vec<_> = plan(session.tracker.state(), session.now)
                .into_iter()
                .filter(|r| all || r.active)
                .collect();
            print_json(&upcoming)?;
        }
    }
    session.save()
}
