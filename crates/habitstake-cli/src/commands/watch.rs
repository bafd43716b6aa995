use std::sync::Arc;

use clap::Args;
use habitstake_core::notify::{LocalNotifier, ReminderTimers};
use habitstake_core::storage::snapshot;
use chrono::{DateTime, FixedOffset};
use habitstake_core::{Clock, Config, Database, Event, Habit, SystemClock, Tracker};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{log_events, CmdResult};

#[derive(Args)]
pub struct WatchArgs {
    /// Override `client.poll_interval_secs`
    #[arg(long)]
    interval: Option<u64>,
    /// Poll once and exit
    #[arg(long)]
    once: bool,
}

/// Prints fired reminders and newly queued check-ins as JSON lines.
struct ConsoleNotifier;

impl LocalNotifier for ConsoleNotifier {
    fn notify(&self, habit: &Habit, event: Event) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "could not render reminder"),
        }
        eprintln!("Reminder: did you complete \"{}\" today?", habit.name);
    }
}

fn print_queued(events: &[Event]) {
    for event in events {
        if let Event::CheckInQueued { name, .. } = event {
            eprintln!("Check-in due: \"{name}\" (answer with `habitstake-cli checkin done` or `checkin missed`)");
        }
        if let Ok(line) = serde_json::to_string(event) {
            println!("{line}");
        }
    }
}

const SAVE_ATTEMPTS: usize = 3;

/// Poll the stored snapshot and save the result. When another invocation
/// saved in between, the poll is redone on top of its state. `None` when
/// every attempt lost.
fn poll_stored(
    db: &Database,
    now: DateTime<FixedOffset>,
    starting_wallet: f64,
) -> CmdResult<Option<(Tracker, Vec<Event>)>> {
    for attempt in 1..=SAVE_ATTEMPTS {
        let mut snap = snapshot::load_snapshot(db, now.date_naive(), starting_wallet)?;
        let events = snap.tracker.poll(now);
        if events.is_empty() || snapshot::save_snapshot(db, &snap)? {
            return Ok(Some((snap.tracker, events)));
        }
        debug!(attempt, "stored state changed during poll");
    }
    Ok(None)
}

pub fn run(args: WatchArgs) -> CmdResult {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(watch_loop(args))
}

async fn watch_loop(args: WatchArgs) -> CmdResult {
    let config = Config::load()?;
    let db = Database::open()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let enabled = config.client.notifications_enabled;

    let tracker = snapshot::load_tracker(&db, clock.now().date_naive(), config.client.starting_wallet)?;
    let (state_tx, state_rx) = watch::channel(tracker.state().clone());
    let mut timers = ReminderTimers::new(state_rx, Arc::new(ConsoleNotifier), Arc::clone(&clock));
    timers.reschedule(enabled);

    let period = args
        .interval
        .map(|secs| std::time::Duration::from_secs(secs.max(1)))
        .unwrap_or_else(|| config.client.poll_interval());
    let mut ticker = tokio::time::interval(period);
    info!(interval_secs = period.as_secs(), notifications = enabled, "watching");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Reload every pass so edits made by other invocations are seen.
                let now = clock.now();
                let Some((tracker, events)) = poll_stored(&db, now, config.client.starting_wallet)? else {
                    warn!("state kept changing under this poll; retrying next tick");
                    continue;
                };
                if !events.is_empty() {
                    log_events(&events);
                    print_queued(&events);
                }
                if *state_tx.borrow() != *tracker.state() {
                    state_tx.send_replace(tracker.state().clone());
                    timers.reschedule(enabled);
                }
                if args.once {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    timers.cancel_all();
    Ok(())
}
