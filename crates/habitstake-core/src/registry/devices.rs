//! Server-side device registry.
//!
//! Each device syncs its full habit list and timezone offset; the stored
//! record is replaced wholesale every time (last write wins, no merge).
//! Records live in the key-value store under `device:<id>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{Result, StorageError};
use crate::habit::Habit;
use crate::push::PushTarget;
use crate::storage::KvStore;

pub const DEVICE_KEY_PREFIX: &str = "device:";

/// Hex characters kept from the endpoint digest.
const DEVICE_ID_LEN: usize = 32;

/// Stable device id: truncated SHA-256 of the push endpoint.
pub fn device_id_for_endpoint(endpoint: &str) -> String {
    let digest = Sha256::digest(endpoint.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(DEVICE_ID_LEN);
    id
}

fn device_key(device_id: &str) -> String {
    format!("{DEVICE_KEY_PREFIX}{device_id}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub device_id: String,
    pub push_target: PushTarget,
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub tz_offset_minutes: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

/// Result of reading every device record.
#[derive(Debug, Default)]
pub struct DeviceScan {
    pub devices: Vec<DeviceRecord>,
    /// Keys whose value failed to parse; skipped.
    pub corrupt: Vec<String>,
}

pub struct DeviceRegistry<'a> {
    store: &'a dyn KvStore,
}

impl<'a> DeviceRegistry<'a> {
    pub fn new(store: &'a dyn KvStore) -> Self {
        Self { store }
    }

    /// Replace the device's record with the client's current snapshot.
    pub fn sync(
        &self,
        target: PushTarget,
        habits: Vec<Habit>,
        tz_offset_minutes: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<DeviceRecord> {
        let record = DeviceRecord {
            device_id: device_id_for_endpoint(&target.endpoint),
            push_target: target,
            habits,
            tz_offset_minutes,
            updated_at: now,
        };
        let json = serde_json::to_string(&record)?;
        self.store.set(&device_key(&record.device_id), &json, None)?;
        info!(
            device_id = %record.device_id,
            habits = record.habits.len(),
            tz_offset_minutes = ?record.tz_offset_minutes,
            "device synced"
        );
        Ok(record)
    }

    pub fn get(&self, device_id: &str) -> Result<Option<DeviceRecord>> {
        let key = device_key(device_id);
        match self.store.get(&key)? {
            Some(json) => serde_json::from_str(&json).map(Some).map_err(|e| {
                StorageError::Corrupt {
                    key,
                    message: e.to_string(),
                }
                .into()
            }),
            None => Ok(None),
        }
    }

    pub fn remove(&self, device_id: &str) -> Result<bool> {
        Ok(self.store.delete(&device_key(device_id))?)
    }

    /// Every parseable record. Unparseable ones are logged and skipped.
    pub fn scan(&self) -> Result<DeviceScan> {
        let mut scan = DeviceScan::default();
        for (key, json) in self.store.scan_prefix(DEVICE_KEY_PREFIX)? {
            match serde_json::from_str::<DeviceRecord>(&json) {
                Ok(record) => scan.devices.push(record),
                Err(e) => {
                    warn!(%key, error = %e, "skipping unreadable device record");
                    scan.corrupt.push(key);
                }
            }
        }
        Ok(scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{HabitDraft, HabitId};
    use crate::push::PushKeys;
    use crate::storage::MemoryStore;

    fn target(endpoint: &str) -> PushTarget {
        PushTarget {
            endpoint: endpoint.into(),
            keys: PushKeys {
                p256dh: "p".into(),
                auth: "a".into(),
            },
        }
    }

    fn habit(name: &str) -> Habit {
        HabitDraft {
            name: name.into(),
            end_time: Some("18:00".into()),
            ..HabitDraft::default()
        }
        .into_habit(HabitId::from_millis(1))
    }

    #[test]
    fn device_id_is_stable_and_endpoint_specific() {
        let a = device_id_for_endpoint("https://push.example/a");
        assert_eq!(a, device_id_for_endpoint("https://push.example/a"));
        assert_ne!(a, device_id_for_endpoint("https://push.example/b"));
        assert_eq!(a.len(), DEVICE_ID_LEN);
    }

    #[test]
    fn sync_replaces_record_wholesale() {
        let store = MemoryStore::new();
        let registry = DeviceRegistry::new(&store);
        let first = registry
            .sync(target("https://push.example/a"), vec![habit("Gym"), habit("Read")], Some(300), Utc::now())
            .unwrap();
        registry
            .sync(target("https://push.example/a"), vec![habit("Walk")], None, Utc::now())
            .unwrap();

        let stored = registry.get(&first.device_id).unwrap().unwrap();
        assert_eq!(stored.habits.len(), 1);
        assert_eq!(stored.habits[0].name, "Walk");
        assert_eq!(stored.tz_offset_minutes, None);
    }

    #[test]
    fn scan_skips_corrupt_records() {
        let store = MemoryStore::new();
        let registry = DeviceRegistry::new(&store);
        registry
            .sync(target("https://push.example/a"), vec![habit("Gym")], Some(0), Utc::now())
            .unwrap();
        store.set("device:broken", "{not json", None).unwrap();

        let scan = registry.scan().unwrap();
        assert_eq!(scan.devices.len(), 1);
        assert_eq!(scan.corrupt, vec!["device:broken".to_string()]);
    }

    #[test]
    fn remove_forgets_device() {
        let store = MemoryStore::new();
        let registry = DeviceRegistry::new(&store);
        let record = registry
            .sync(target("https://push.example/a"), Vec::new(), None, Utc::now())
            .unwrap();
        assert!(registry.remove(&record.device_id).unwrap());
        assert!(registry.get(&record.device_id).unwrap().is_none());
    }
}
