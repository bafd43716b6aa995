//! # Habitstake Core Library
//!
//! Core logic for Habitstake, a habit-accountability tracker: each habit has
//! a daily deadline and a monetary stake that is deducted when the habit is
//! missed. All operations are available through the standalone CLI binary;
//! any other front end is a thin layer over this library.
//!
//! ## Architecture
//!
//! - **Schedule**: pure predicates over a habit and a local instant
//! - **State**: one immutable snapshot, changed only by reducers that return
//!   the next snapshot plus the events they produced
//! - **Check-in**: FIFO queue of due habits and the penalty rules
//! - **Notify**: local reminder timers and the periodic push tick with
//!   minute-bucket deduplication
//! - **Storage**: SQLite key-value store and TOML configuration
//!
//! ## Key Components
//!
//! - [`Tracker`]: poll-driven client state machine
//! - [`DispatchEngine`]: periodic server-side reminder fan-out
//! - [`Database`]: key-value persistence
//! - [`Config`]: application configuration management

pub mod api;
pub mod checkin;
pub mod clock;
pub mod error;
pub mod events;
pub mod habit;
pub mod notify;
pub mod payment;
pub mod push;
pub mod registry;
pub mod schedule;
pub mod state;
pub mod stats;
pub mod storage;
pub mod tracker;

pub use checkin::CheckInQueue;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ConfigError, CoreError, DeliveryError, PaymentError, StorageError, ValidationError};
pub use events::{CheckInOutcome, Event};
pub use habit::{Habit, HabitDraft, HabitId, StakeDestination};
pub use notify::{DispatchEngine, DispatchReport, ReminderTimers};
pub use state::{AppState, DailyState, Transition};
pub use storage::{Config, Database, KvStore, MemoryStore};
pub use tracker::Tracker;
