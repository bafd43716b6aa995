//! Reminder delivery.
//!
//! Two independent paths reach the user:
//!
//! - interactive: local timers armed from the client snapshot
//!   ([`planner`], [`timers`])
//! - periodic: a server tick that pushes to every registered device
//!   ([`dispatch`], deduplicated through [`dedup`])

pub mod dedup;
pub mod dispatch;
pub mod planner;
pub mod timers;

pub use dedup::{dedup_key, minute_bucket, DedupStore, DEDUP_KEY_PREFIX};
pub use dispatch::{Delivery, DispatchEngine, DispatchReport};
pub use planner::{next_fire_instant, plan, should_fire, PlannedReminder};
pub use timers::{LocalNotifier, ReminderTimers};
