//! Habit definitions.
//!
//! A habit is a recurring daily commitment with a local wall-clock deadline
//! and a monetary stake charged when it is missed. Habits are plain data;
//! the only owner allowed to change them is the habit registry.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Day keys, 0 = Sunday .. 6 = Saturday.
pub const ALL_DAYS: [u8; 7] = [0, 1, 2, 3, 4, 5, 6];

/// Habit identifier.
///
/// The value is the creation instant in epoch milliseconds, so it doubles as
/// the habit's creation timestamp. It never changes after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(i64);

impl HabitId {
    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn from_instant(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_millis())
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Creation instant encoded in the id.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HabitId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

/// Where a missed habit's stake goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StakeDestination {
    /// Forfeited to the user's own stake pool.
    #[default]
    #[serde(rename = "self")]
    Myself,
    #[serde(rename = "charity")]
    Charity,
}

/// A recurring habit.
///
/// Field names follow the camelCase JSON shape shared with client devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    /// Empty means every day.
    #[serde(default)]
    pub days_of_week: BTreeSet<u8>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub skip_cost: f64,
    #[serde(default)]
    pub stake_destination: StakeDestination,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charity_name: Option<String>,
    /// Inclusive "YYYY-MM-DD" pause end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_until: Option<String>,
}

/// Habit fields supplied by the editor before an id is assigned.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitDraft {
    pub name: String,
    #[serde(default)]
    pub days_of_week: BTreeSet<u8>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub skip_cost: f64,
    #[serde(default)]
    pub stake_destination: StakeDestination,
    #[serde(default)]
    pub charity_name: Option<String>,
    #[serde(default)]
    pub paused_until: Option<String>,
}

impl HabitDraft {
    pub fn into_habit(self, id: HabitId) -> Habit {
        Habit {
            id,
            name: self.name,
            days_of_week: self.days_of_week,
            all_day: self.all_day,
            start_time: self.start_time,
            end_time: self.end_time,
            skip_cost: self.skip_cost,
            stake_destination: self.stake_destination,
            charity_name: self.charity_name,
            paused_until: self.paused_until,
        }
    }
}

impl Habit {
    /// Days this habit recurs on. Falls back to all seven days when the
    /// stored set has no valid day keys.
    pub fn effective_days(&self) -> BTreeSet<u8> {
        let days: BTreeSet<u8> = self
            .days_of_week
            .iter()
            .copied()
            .filter(|d| *d <= 6)
            .collect();
        if days.is_empty() {
            ALL_DAYS.into_iter().collect()
        } else {
            days
        }
    }

    /// Parsed `endTime`, or `None` when it is absent or malformed.
    pub fn end_time_of_day(&self) -> Option<NaiveTime> {
        self.end_time.as_deref().and_then(parse_wall_time)
    }

    /// Validate and canonicalize a habit coming from the editor.
    ///
    /// Fills the default day set, drops out-of-range day keys, clears the
    /// time window for all-day habits and the charity name for self stakes.
    pub fn normalize(mut self) -> Result<Self, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".into()));
        }
        if !self.skip_cost.is_finite() || self.skip_cost < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "skipCost".into(),
                message: format!("must be a non-negative amount, got {}", self.skip_cost),
            });
        }

        self.days_of_week = self.effective_days();

        if self.all_day {
            self.start_time = None;
            self.end_time = None;
        } else {
            let end = self
                .end_time
                .as_deref()
                .ok_or_else(|| ValidationError::MissingField("endTime".into()))?;
            if parse_wall_time(end).is_none() {
                return Err(ValidationError::InvalidValue {
                    field: "endTime".into(),
                    message: format!("expected HH:MM, got '{end}'"),
                });
            }
            if let Some(start) = self.start_time.as_deref() {
                if parse_wall_time(start).is_none() {
                    return Err(ValidationError::InvalidValue {
                        field: "startTime".into(),
                        message: format!("expected HH:MM, got '{start}'"),
                    });
                }
            }
        }

        if self.stake_destination == StakeDestination::Myself {
            self.charity_name = None;
        }

        if let Some(paused) = self.paused_until.as_deref() {
            if chrono::NaiveDate::parse_from_str(paused, "%Y-%m-%d").is_err() {
                return Err(ValidationError::InvalidValue {
                    field: "pausedUntil".into(),
                    message: format!("expected YYYY-MM-DD, got '{paused}'"),
                });
            }
        }

        Ok(self)
    }
}

/// Parse an "HH:MM" wall-clock string.
///
/// Returns `None` for anything that is not two numeric fields forming a
/// valid time of day.
pub fn parse_wall_time(s: &str) -> Option<NaiveTime> {
    let (hour, minute) = s.trim().split_once(':')?;
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}
