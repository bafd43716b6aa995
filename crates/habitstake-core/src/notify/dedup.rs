//! Reminder dedup keys.
//!
//! One key per (device, habit, minute bucket). Claiming a key is a single
//! atomic set-if-absent, so overlapping ticks cannot both send.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::error::StorageError;
use crate::habit::HabitId;
use crate::storage::KvStore;

pub const DEDUP_KEY_PREFIX: &str = "dedup:";

/// Whole minutes since the epoch.
pub fn minute_bucket(at: DateTime<Utc>) -> i64 {
    at.timestamp().div_euclid(60)
}

pub fn dedup_key(device_id: &str, habit_id: HabitId, bucket: i64) -> String {
    let digest = Sha256::digest(format!("{device_id}:{habit_id}:{bucket}").as_bytes());
    format!("{DEDUP_KEY_PREFIX}{}", hex::encode(digest))
}

pub struct DedupStore<'a> {
    store: &'a dyn KvStore,
    ttl: Duration,
}

impl<'a> DedupStore<'a> {
    pub fn new(store: &'a dyn KvStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Claim a key. `false` means another attempt already owns it.
    pub fn claim(&self, key: &str) -> Result<bool, StorageError> {
        self.store
            .set_if_absent(key, &Utc::now().to_rfc3339(), Some(self.ttl))
    }

    /// Give a key back after a failed send so a retry can claim it.
    pub fn release(&self, key: &str) -> Result<(), StorageError> {
        self.store.delete(key).map(|_| ())
    }

    pub fn contains(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.store.get(key)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    #[test]
    fn bucket_truncates_to_minute() {
        let a = Utc.with_ymd_and_hms(2024, 3, 4, 23, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 3, 4, 23, 0, 59).unwrap();
        let c = Utc.with_ymd_and_hms(2024, 3, 4, 23, 1, 0).unwrap();
        assert_eq!(minute_bucket(a), minute_bucket(b));
        assert_ne!(minute_bucket(a), minute_bucket(c));
    }

    #[test]
    fn key_depends_on_every_component() {
        let h = HabitId::from_millis(1);
        let base = dedup_key("dev", h, 10);
        assert_eq!(base, dedup_key("dev", h, 10));
        assert_ne!(base, dedup_key("dev2", h, 10));
        assert_ne!(base, dedup_key("dev", HabitId::from_millis(2), 10));
        assert_ne!(base, dedup_key("dev", h, 11));
        assert!(base.starts_with(DEDUP_KEY_PREFIX));
    }

    #[test]
    fn second_claim_in_bucket_fails_until_released() {
        let store = MemoryStore::new();
        let dedup = DedupStore::new(&store, Duration::seconds(120));
        let key = dedup_key("dev", HabitId::from_millis(1), 5);
        assert!(dedup.claim(&key).unwrap());
        assert!(!dedup.claim(&key).unwrap());
        dedup.release(&key).unwrap();
        assert!(dedup.claim(&key).unwrap());
        assert!(dedup.contains(&key).unwrap());
    }
}
