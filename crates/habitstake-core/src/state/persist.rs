//! Versioned JSON blob for the client state snapshot.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{AppState, DailyState, DEFAULT_WALLET};
use crate::error::{CoreError, Result, StorageError};
use crate::habit::{Habit, HabitId};

/// Current blob layout version.
pub const STATE_VERSION: u32 = 1;

/// On-disk shape of [`AppState`].
///
/// Every field except the date has a default so blobs written by older
/// clients (which lacked `version` and `penalizedToday`) still load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub version: u32,
    #[serde(default = "default_wallet")]
    pub wallet: f64,
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub completed_today: BTreeSet<HabitId>,
    #[serde(default)]
    pub paid_today: BTreeSet<HabitId>,
    #[serde(default)]
    pub penalized_today: BTreeSet<HabitId>,
    pub last_checked_date: NaiveDate,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub habit_history: BTreeMap<HabitId, BTreeSet<NaiveDate>>,
}

fn default_wallet() -> f64 {
    DEFAULT_WALLET
}

impl From<&AppState> for PersistedState {
    fn from(state: &AppState) -> Self {
        let daily = state.daily.clone();
        Self {
            version: STATE_VERSION,
            wallet: state.wallet,
            habits: state.habits.clone(),
            completed_today: daily.completed_today,
            paid_today: daily.paid_today,
            penalized_today: daily.penalized_today,
            last_checked_date: daily.last_checked_date,
            current_streak: daily.current_streak,
            longest_streak: daily.longest_streak,
            habit_history: daily.habit_history,
        }
    }
}

impl From<PersistedState> for AppState {
    fn from(blob: PersistedState) -> Self {
        Self {
            wallet: blob.wallet.max(0.0),
            habits: blob.habits,
            daily: DailyState {
                completed_today: blob.completed_today,
                paid_today: blob.paid_today,
                penalized_today: blob.penalized_today,
                last_checked_date: blob.last_checked_date,
                current_streak: blob.current_streak,
                longest_streak: blob.longest_streak,
                habit_history: blob.habit_history,
            },
        }
    }
}

impl AppState {
    /// Serialize the snapshot as the versioned blob.
    pub fn to_blob(&self) -> Result<String> {
        Ok(serde_json::to_string(&PersistedState::from(self))?)
    }

    /// Load a snapshot from its blob.
    ///
    /// Blobs written by a newer layout version are refused rather than
    /// silently truncated.
    pub fn from_blob(json: &str) -> Result<Self> {
        let blob: PersistedState = serde_json::from_str(json)?;
        if blob.version > STATE_VERSION {
            return Err(CoreError::Storage(StorageError::Corrupt {
                key: "app_state".into(),
                message: format!(
                    "blob version {} is newer than supported version {STATE_VERSION}",
                    blob.version
                ),
            }));
        }
        Ok(blob.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::HabitDraft;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn blob_is_flat_and_versioned() {
        let mut state = AppState::new(date(6));
        let habit = HabitDraft {
            name: "Stretch".into(),
            end_time: Some("07:30".into()),
            ..HabitDraft::default()
        }
        .into_habit(HabitId::from_millis(42));
        state.habits.push(habit);
        state.daily.completed_today.insert(HabitId::from_millis(42));
        state
            .daily
            .habit_history
            .entry(HabitId::from_millis(42))
            .or_default()
            .insert(date(6));

        let json: serde_json::Value = serde_json::from_str(&state.to_blob().unwrap()).unwrap();
        assert_eq!(json["version"], STATE_VERSION);
        assert_eq!(json["wallet"], 100.0);
        assert_eq!(json["lastCheckedDate"], "2024-05-06");
        assert_eq!(json["completedToday"][0], 42);
        assert_eq!(json["habitHistory"]["42"][0], "2024-05-06");

        let back = AppState::from_blob(&json.to_string()).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn legacy_blob_without_version_loads() {
        let state = AppState::from_blob(
            r#"{"wallet": 80, "habits": [], "completedToday": [], "paidToday": [],
                "lastCheckedDate": "2024-05-06", "currentStreak": 3, "longestStreak": 7,
                "habitHistory": {}}"#,
        )
        .unwrap();
        assert_eq!(state.wallet, 80.0);
        assert_eq!(state.daily.current_streak, 3);
        assert!(state.daily.penalized_today.is_empty());
    }

    #[test]
    fn newer_blob_version_is_refused() {
        let err = AppState::from_blob(r#"{"version": 99, "lastCheckedDate": "2024-05-06"}"#)
            .unwrap_err();
        assert!(matches!(err, CoreError::Storage(StorageError::Corrupt { .. })));
    }
}
