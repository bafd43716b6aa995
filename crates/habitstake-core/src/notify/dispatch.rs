//! Periodic reminder dispatch.
//!
//! Invoked once per external tick (typically every minute). For each
//! registered device the tick resolves the device's local wall clock and
//! sends a reminder for every habit whose deadline minute is now. The dedup
//! claim makes the tick safe to retry or run concurrently: at most one send
//! per device, habit and minute bucket.
//!
//! Failures are isolated. A failed send is recorded and the scan continues;
//! its dedup claim is released so a retry inside the same minute can send.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::dedup::{dedup_key, minute_bucket, DedupStore};
use crate::error::Result;
use crate::habit::HabitId;
use crate::push::{PushPayload, PushSender};
use crate::registry::{DeviceRecord, DeviceRegistry};
use crate::schedule;
use crate::storage::KvStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub device_id: String,
    pub habit_id: HabitId,
}

/// Aggregate outcome of one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub sent: Vec<Delivery>,
    pub failed: Vec<Delivery>,
    /// Reminders skipped because their dedup key was already claimed.
    pub duplicates: usize,
    /// Device records skipped because they could not be parsed.
    pub corrupt_records: usize,
}

pub struct DispatchEngine<'a> {
    store: &'a dyn KvStore,
    sender: &'a dyn PushSender,
    dedup_ttl: Duration,
}

impl<'a> DispatchEngine<'a> {
    pub fn new(store: &'a dyn KvStore, sender: &'a dyn PushSender, dedup_ttl: Duration) -> Self {
        Self {
            store,
            sender,
            dedup_ttl,
        }
    }

    /// Run one tick at `now`.
    ///
    /// # Errors
    /// Only a failure to list devices aborts the tick; everything after that
    /// is recorded per delivery.
    pub fn run_tick(&self, now: DateTime<Utc>) -> Result<DispatchReport> {
        let scan = DeviceRegistry::new(self.store).scan()?;
        let dedup = DedupStore::new(self.store, self.dedup_ttl);
        let bucket = minute_bucket(now);

        let mut report = DispatchReport {
            corrupt_records: scan.corrupt.len(),
            ..DispatchReport::default()
        };
        for device in &scan.devices {
            self.dispatch_device(device, now, bucket, &dedup, &mut report);
        }

        info!(
            devices = scan.devices.len(),
            sent = report.sent.len(),
            failed = report.failed.len(),
            duplicates = report.duplicates,
            "reminder tick finished"
        );
        Ok(report)
    }

    fn dispatch_device(
        &self,
        device: &DeviceRecord,
        now: DateTime<Utc>,
        bucket: i64,
        dedup: &DedupStore<'_>,
        report: &mut DispatchReport,
    ) {
        let local = schedule::device_local_time(now, device.tz_offset_minutes);

        for habit in &device.habits {
            if !schedule::matches_reminder_minute(habit, local) {
                continue;
            }
            let delivery = Delivery {
                device_id: device.device_id.clone(),
                habit_id: habit.id,
            };
            let key = dedup_key(&device.device_id, habit.id, bucket);

            match dedup.claim(&key) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(device_id = %device.device_id, habit_id = %habit.id, "reminder already sent this minute");
                    report.duplicates += 1;
                    continue;
                }
                Err(e) => {
                    warn!(device_id = %device.device_id, habit_id = %habit.id, error = %e, "dedup claim failed");
                    report.failed.push(delivery);
                    continue;
                }
            }

            match self.sender.send(&device.push_target, &PushPayload::reminder(habit)) {
                Ok(()) => {
                    debug!(device_id = %device.device_id, habit_id = %habit.id, "reminder sent");
                    report.sent.push(delivery);
                }
                Err(e) => {
                    warn!(device_id = %device.device_id, habit_id = %habit.id, error = %e, "reminder send failed");
                    if let Err(e) = dedup.release(&key) {
                        warn!(%key, error = %e, "could not release dedup key");
                    }
                    report.failed.push(delivery);
                }
            }
        }
    }
}
