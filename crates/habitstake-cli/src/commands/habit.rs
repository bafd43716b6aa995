use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use clap::{Args, Subcommand};
use habitstake_core::registry::habits;
use habitstake_core::schedule::{self, date_key};
use habitstake_core::state::Action;
use habitstake_core::{CoreError, Habit, HabitDraft, HabitId, StakeDestination};

use super::{log_events, print_json, CmdResult, Session};

#[derive(Args)]
pub struct HabitFields {
    /// Days of week, 0 = Sunday (comma separated; empty = every day)
    #[arg(long, value_delimiter = ',')]
    days: Option<Vec<u8>>,
    /// Deadline "HH:MM"
    #[arg(long)]
    end: Option<String>,
    /// Window start "HH:MM" (informational)
    #[arg(long)]
    start: Option<String>,
    /// Whole-day habit (deadline 23:59)
    #[arg(long)]
    all_day: Option<bool>,
    /// Stake charged when missed
    #[arg(long)]
    cost: Option<f64>,
    /// Send the stake to this charity instead of yourself
    #[arg(long)]
    charity: Option<String>,
}

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a habit
    Create {
        /// Habit name
        name: String,
        #[command(flatten)]
        fields: HabitFields,
    },
    /// List habits
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update a habit
    Update {
        /// Habit ID
        id: HabitId,
        /// New name
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: HabitFields,
        /// Stake goes back to yourself
        #[arg(long, conflicts_with = "charity")]
        no_charity: bool,
    },
    /// Delete a habit and its history
    Delete {
        /// Habit ID
        id: HabitId,
    },
    /// Pause a habit through a date (inclusive)
    Pause {
        /// Habit ID
        id: HabitId,
        /// Last paused day, YYYY-MM-DD
        #[arg(long)]
        until: NaiveDate,
    },
    /// Clear a pause
    Resume {
        /// Habit ID
        id: HabitId,
    },
}

impl HabitFields {
    fn into_draft(self, name: String) -> HabitDraft {
        let stake_destination = if self.charity.is_some() {
            StakeDestination::Charity
        } else {
            StakeDestination::Myself
        };
        HabitDraft {
            name,
            days_of_week: self.days.unwrap_or_default().into_iter().collect(),
            all_day: self.all_day.unwrap_or(false),
            start_time: self.start,
            end_time: self.end,
            skip_cost: self.cost.unwrap_or(0.0),
            stake_destination,
            charity_name: self.charity,
            paused_until: None,
        }
    }

    fn apply(self, habit: &mut Habit) {
        if let Some(days) = self.days {
            habit.days_of_week = days.into_iter().collect();
        }
        if let Some(all_day) = self.all_day {
            habit.all_day = all_day;
        }
        if self.end.is_some() {
            habit.end_time = self.end;
        }
        if self.start.is_some() {
            habit.start_time = self.start;
        }
        if let Some(cost) = self.cost {
            habit.skip_cost = cost;
        }
        if let Some(charity) = self.charity {
            habit.stake_destination = StakeDestination::Charity;
            habit.charity_name = Some(charity);
        }
    }
}

fn existing(session: &Session, id: HabitId) -> Result<Habit, CoreError> {
    session
        .tracker
        .state()
        .habit(id)
        .cloned()
        .ok_or(CoreError::HabitNotFound(id))
}

fn apply(session: &mut Session, action: Action) -> CmdResult {
    let events = session.tracker.apply(action)?;
    log_events(&events);
    session.save()?;
    print_json(&events)
}

fn deadline_label(habit: &Habit) -> String {
    match schedule::deadline_time(habit) {
        Some(t) if habit.all_day => format!("all day ({})", t.format("%H:%M")),
        Some(t) => t.format("%H:%M").to_string(),
        None => "invalid".to_string(),
    }
}

pub fn run(action: HabitAction, at: Option<DateTime<FixedOffset>>) -> CmdResult {
    let mut session = Session::open(at)?;

    match action {
        HabitAction::Create { name, fields } => {
            let draft = fields.into_draft(name);
            let created_at = session.now.with_timezone(&Utc);
            apply(&mut session, Action::CreateHabit { draft, at: created_at })?;
        }
        HabitAction::List { json } => {
            let state = session.tracker.state();
            let list = habits::list(state);
            if json {
                print_json(&list)?;
            } else if list.is_empty() {
                println!("No habits.");
            } else {
                for habit in list {
                    let days: Vec<String> = habit.effective_days().iter().map(u8::to_string).collect();
                    let status = if schedule::is_paused_on_date(habit, session.now.date_naive()) {
                        format!("paused until {}", habit.paused_until.as_deref().unwrap_or_default())
                    } else if state.daily.completed_today.contains(&habit.id) {
                        "done today".to_string()
                    } else if state.daily.paid_today.contains(&habit.id) {
                        "missed today".to_string()
                    } else {
                        "open".to_string()
                    };
                    println!(
                        "{}  {:<20} {:<16} days={:<14} stake={:.2}  {}",
                        habit.id,
                        habit.name,
                        deadline_label(habit),
                        days.join(","),
                        habit.skip_cost,
                        status
                    );
                }
            }
        }
        HabitAction::Update {
            id,
            name,
            fields,
            no_charity,
        } => {
            let mut habit = existing(&session, id)?;
            if let Some(name) = name {
                habit.name = name;
            }
            fields.apply(&mut habit);
            if no_charity {
                habit.stake_destination = StakeDestination::Myself;
                habit.charity_name = None;
            }
            apply(&mut session, Action::UpdateHabit(habit))?;
        }
        HabitAction::Delete { id } => {
            apply(&mut session, Action::DeleteHabit(id))?;
        }
        HabitAction::Pause { id, until } => {
            let mut habit = existing(&session, id)?;
            habit.paused_until = Some(date_key(until));
            apply(&mut session, Action::UpdateHabit(habit))?;
        }
        HabitAction::Resume { id } => {
            let mut habit = existing(&session, id)?;
            habit.paused_until = None;
            apply(&mut session, Action::UpdateHabit(habit))?;
        }
    }
    Ok(())
}
