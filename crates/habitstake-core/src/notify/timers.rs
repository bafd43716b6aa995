//! Local reminder timers.
//!
//! One tokio task per planned reminder. The task sleeps until the fire
//! instant, then re-reads the live snapshot from the watch channel and only
//! notifies if [`should_fire`] still holds. Any state change re-arms the set:
//! every pending task is aborted and the plan is rebuilt.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::planner::{plan, should_fire};
use crate::clock::Clock;
use crate::events::Event;
use crate::habit::{Habit, HabitId};
use crate::state::AppState;

/// Presents a fired reminder to the user.
pub trait LocalNotifier: Send + Sync {
    fn notify(&self, habit: &Habit, event: Event);
}

pub struct ReminderTimers {
    state: watch::Receiver<AppState>,
    notifier: Arc<dyn LocalNotifier>,
    clock: Arc<dyn Clock>,
    handles: HashMap<HabitId, JoinHandle<()>>,
}

impl ReminderTimers {
    pub fn new(
        state: watch::Receiver<AppState>,
        notifier: Arc<dyn LocalNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state,
            notifier,
            clock,
            handles: HashMap::new(),
        }
    }

    /// Cancel everything and arm one timer per planned reminder.
    ///
    /// Must be called from within a tokio runtime.
    pub fn reschedule(&mut self, enabled: bool) {
        self.cancel_all();
        if !enabled {
            debug!("notifications disabled, no timers armed");
            return;
        }

        let now = self.clock.now();
        let snapshot = self.state.borrow().clone();
        for reminder in plan(&snapshot, now) {
            if !reminder.active {
                continue;
            }
            let delay = (reminder.fire_at - now).to_std().unwrap_or_default();
            let handle = tokio::spawn(fire_after(
                delay,
                reminder.habit_id,
                self.state.clone(),
                Arc::clone(&self.notifier),
                Arc::clone(&self.clock),
            ));
            self.handles.insert(reminder.habit_id, handle);
        }
        debug!(armed = self.handles.len(), "reminder timers armed");
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }

    pub fn armed(&self) -> usize {
        self.handles.values().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for ReminderTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

async fn fire_after(
    delay: std::time::Duration,
    habit_id: HabitId,
    state: watch::Receiver<AppState>,
    notifier: Arc<dyn LocalNotifier>,
    clock: Arc<dyn Clock>,
) {
    tokio::time::sleep(delay).await;

    let now: DateTime<FixedOffset> = clock.now();
    let habit = {
        let current = state.borrow();
        if !should_fire(&current, habit_id, now) {
            debug!(%habit_id, "reminder no longer applicable");
            return;
        }
        current.habit(habit_id).cloned()
    };
    if let Some(habit) = habit {
        info!(%habit_id, name = %habit.name, "reminder fired");
        notifier.notify(&habit, Event::ReminderFired { habit_id, at: now });
    }
}
