//! Client driver.
//!
//! [`Tracker`] owns the current snapshot and the check-in queue and is
//! advanced by calling [`Tracker::poll`] periodically, the same way a wall
//! clock driven state machine is ticked. Each poll:
//!
//! 1. rolls the day over if the local date changed (and resets the queue)
//! 2. deducts stakes for deadlines that passed unanswered
//! 3. queues newly due check-ins
//!
//! Every step replaces the snapshot wholesale.

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::checkin::{self, CheckInQueue};
use crate::error::Result;
use crate::events::{CheckInOutcome, Event};
use crate::habit::HabitId;
use crate::state::{reduce, roll_over, Action, AppState, Transition};

/// One poll step as a pure function.
pub fn poll(state: &AppState, queue: &mut CheckInQueue, now: DateTime<FixedOffset>) -> Transition {
    let today = now.date_naive();
    let rolled = roll_over(state, today, now.offset());
    if queue.begin_day(today) {
        debug!(%today, "check-in queue reset for new day");
    }

    let penalized = checkin::apply_passive_penalties(&rolled.state, now);
    let mut events = rolled.events;
    events.extend(penalized.events);
    events.extend(queue.enqueue_due(&penalized.state, now));

    Transition {
        state: penalized.state,
        events,
    }
}

#[derive(Debug, Clone)]
pub struct Tracker {
    state: AppState,
    queue: CheckInQueue,
}

impl Tracker {
    pub fn new(state: AppState, queue: CheckInQueue) -> Self {
        Self { state, queue }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn queue(&self) -> &CheckInQueue {
        &self.queue
    }

    pub fn into_parts(self) -> (AppState, CheckInQueue) {
        (self.state, self.queue)
    }

    pub fn poll(&mut self, now: DateTime<FixedOffset>) -> Vec<Event> {
        let transition = poll(&self.state, &mut self.queue, now);
        self.commit(transition)
    }

    /// Apply a reducer action, then drop queue entries it made stale.
    pub fn apply(&mut self, action: Action) -> Result<Vec<Event>> {
        let transition = reduce(&self.state, action)?;
        let events = self.commit(transition);
        self.queue.prune(&self.state);
        Ok(events)
    }

    pub fn answer(
        &mut self,
        habit_id: HabitId,
        outcome: CheckInOutcome,
        now: DateTime<FixedOffset>,
    ) -> Result<Vec<Event>> {
        let transition = checkin::answer(&self.state, &mut self.queue, habit_id, outcome, now)?;
        Ok(self.commit(transition))
    }

    /// Answer the visible prompt; `None` when the queue is empty.
    pub fn answer_head(
        &mut self,
        outcome: CheckInOutcome,
        now: DateTime<FixedOffset>,
    ) -> Result<Option<(HabitId, Vec<Event>)>> {
        let Some(head) = self.queue.head() else {
            return Ok(None);
        };
        self.answer(head, outcome, now).map(|events| Some((head, events)))
    }

    fn commit(&mut self, transition: Transition) -> Vec<Event> {
        self.state = transition.state;
        transition.events
    }
}
