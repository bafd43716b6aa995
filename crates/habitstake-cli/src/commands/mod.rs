//! Subcommand implementations.
//!
//! One-shot commands open a [`Session`]: load config and the stored snapshot,
//! poll once so the day, penalties and queue are current, run, then save.

pub mod checkin;
pub mod config;
pub mod cron;
pub mod device;
pub mod habit;
pub mod reminders;
pub mod stats;
pub mod wallet;
pub mod watch;

use chrono::{DateTime, FixedOffset};
use habitstake_core::storage::snapshot;
use habitstake_core::{Clock, Config, Database, Event, SystemClock, Tracker};
use serde::Serialize;
use tracing::info;

pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub struct Session {
    pub db: Database,
    pub config: Config,
    pub tracker: Tracker,
    pub now: DateTime<FixedOffset>,
}

impl Session {
    pub fn open(at: Option<DateTime<FixedOffset>>) -> CmdResult<Self> {
        let config = Config::load()?;
        let db = Database::open()?;
        let now = at.unwrap_or_else(|| SystemClock.now());
        let mut tracker = snapshot::load_tracker(&db, now.date_naive(), config.client.starting_wallet)?;
        log_events(&tracker.poll(now));
        Ok(Self {
            db,
            config,
            tracker,
            now,
        })
    }

    pub fn save(&self) -> CmdResult {
        snapshot::save_tracker(&self.db, &self.tracker)?;
        Ok(())
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn log_events(events: &[Event]) {
    for event in events {
        info!(?event, "state changed");
    }
}
