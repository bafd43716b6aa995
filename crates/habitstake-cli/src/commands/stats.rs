use chrono::{DateTime, FixedOffset};
use clap::Args;
use habitstake_core::stats::{self, DEFAULT_WINDOW_DAYS};

use super::{print_json, CmdResult, Session};

#[derive(Args)]
pub struct StatsArgs {
    /// Trailing window in days, ending today
    #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
    days: u32,
}

pub fn run(args: StatsArgs, at: Option<DateTime<FixedOffset>>) -> CmdResult {
    let session = Session::open(at)?;
    let report = stats::report(session.tracker.state(), args.days, session.now);
    print_json(&report)?;
    session.save()
}
