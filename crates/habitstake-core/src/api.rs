//! Server endpoint handlers.
//!
//! Transport-agnostic: each handler takes the request method and body and
//! returns a status plus JSON body, so any HTTP front end (or the CLI `cron`
//! command) can host them.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::error::{ConfigError, DeliveryError};
use crate::habit::Habit;
use crate::notify::DispatchEngine;
use crate::push::{PushKeys, PushSender, PushTarget, VapidConfig};
use crate::registry::DeviceRegistry;
use crate::storage::{DispatchConfig, KvStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    fn method_not_allowed() -> Self {
        Self::error(405, "Method not allowed")
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeRequest {
    #[serde(default)]
    subscription: Option<SubscriptionBody>,
    #[serde(default)]
    habits: Vec<Habit>,
    #[serde(default)]
    tz_offset_minutes: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct SubscriptionBody {
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    keys: PushKeys,
}

/// Device sync: store the device's habits and timezone under its endpoint.
pub fn handle_subscribe(store: &dyn KvStore, method: &Method, body: &str, now: DateTime<Utc>) -> ApiResponse {
    if *method != Method::Post {
        return ApiResponse::method_not_allowed();
    }
    let request: SubscribeRequest = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "rejecting malformed subscribe body");
            return ApiResponse::error(400, "Invalid request body");
        }
    };
    let Some((endpoint, keys)) = request
        .subscription
        .and_then(|s| s.endpoint.filter(|e| !e.trim().is_empty()).map(|e| (e, s.keys)))
    else {
        return ApiResponse::error(400, "Missing subscription data");
    };

    let target = PushTarget { endpoint, keys };
    match DeviceRegistry::new(store).sync(target, request.habits, request.tz_offset_minutes, now) {
        Ok(record) => ApiResponse::ok(json!({ "ok": true, "id": record.device_id })),
        Err(e) => {
            error!(error = %e, "device sync failed");
            ApiResponse::error(500, e.to_string())
        }
    }
}

/// Periodic tick: push every reminder due this minute.
///
/// `make_sender` is only called once credentials are known to be present.
pub fn handle_tick<F, S>(
    store: &dyn KvStore,
    method: &Method,
    vapid: Result<VapidConfig, ConfigError>,
    make_sender: F,
    config: &DispatchConfig,
    now: DateTime<Utc>,
) -> ApiResponse
where
    F: FnOnce(VapidConfig) -> Result<S, DeliveryError>,
    S: PushSender,
{
    if !matches!(method, Method::Get | Method::Post) {
        return ApiResponse::method_not_allowed();
    }
    let vapid = match vapid {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "push credentials unavailable");
            return ApiResponse::error(500, "Missing VAPID credentials");
        }
    };
    let sender = match make_sender(vapid) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "could not build push sender");
            return ApiResponse::error(500, e.to_string());
        }
    };

    match DispatchEngine::new(store, &sender, config.dedup_ttl()).run_tick(now) {
        Ok(report) => ApiResponse::ok(json!({
            "ok": true,
            "sent": report.sent,
            "failed": report.failed,
        })),
        Err(e) => {
            error!(error = %e, "tick failed");
            ApiResponse::error(500, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::HabitId;
    use crate::notify::{dedup_key, minute_bucket};
    use crate::push::PushPayload;
    use crate::registry::device_id_for_endpoint;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use std::cell::Cell;

    struct CountingSender<'a>(&'a Cell<usize>);

    impl PushSender for CountingSender<'_> {
        fn send(&self, _target: &PushTarget, _payload: &PushPayload) -> Result<(), DeliveryError> {
            self.0.set(self.0.get() + 1);
            Ok(())
        }
    }

    fn vapid() -> Result<VapidConfig, ConfigError> {
        Ok(VapidConfig {
            public_key: "pub".into(),
            subject: "mailto:ops@example.com".into(),
        })
    }

    fn subscribe_body() -> String {
        json!({
            "subscription": {"endpoint": "https://push.example/dev1", "keys": {"p256dh": "p", "auth": "a"}},
            "habits": [{"id": 1, "name": "Gym", "daysOfWeek": [], "allDay": false, "endTime": "18:00", "skipCost": 5}],
            "tzOffsetMinutes": 300
        })
        .to_string()
    }

    #[test]
    fn subscribe_stores_device() {
        let store = MemoryStore::new();
        let resp = handle_subscribe(&store, &Method::Post, &subscribe_body(), Utc::now());
        assert_eq!(resp.status, 200);
        let id = device_id_for_endpoint("https://push.example/dev1");
        assert_eq!(resp.body, json!({"ok": true, "id": id}));
        let record = DeviceRegistry::new(&store).get(&id).unwrap().unwrap();
        assert_eq!(record.tz_offset_minutes, Some(300));
        assert_eq!(record.habits.len(), 1);
    }

    #[test]
    fn subscribe_without_endpoint_is_bad_request() {
        let store = MemoryStore::new();
        let resp = handle_subscribe(&store, &Method::Post, r#"{"habits": []}"#, Utc::now());
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body, json!({"error": "Missing subscription data"}));

        let resp = handle_subscribe(&store, &Method::Post, "not json", Utc::now());
        assert_eq!(resp.status, 400);
    }

    #[test]
    fn subscribe_rejects_other_methods() {
        let store = MemoryStore::new();
        assert_eq!(handle_subscribe(&store, &Method::Get, "", Utc::now()).status, 405);
    }

    #[test]
    fn tick_sends_once_and_records_dedup_key() {
        let store = MemoryStore::new();
        handle_subscribe(&store, &Method::Post, &subscribe_body(), Utc::now());
        let count = Cell::new(0);
        // 23:00 UTC is 18:00 at UTC-5.
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 23, 0, 5).unwrap();

        let resp = handle_tick(
            &store,
            &Method::Get,
            vapid(),
            |_| Ok(CountingSender(&count)),
            &DispatchConfig::default(),
            now,
        );
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["ok"], json!(true));
        assert_eq!(resp.body["sent"].as_array().map(Vec::len), Some(1));
        assert_eq!(count.get(), 1);

        let key = dedup_key(
            &device_id_for_endpoint("https://push.example/dev1"),
            HabitId::from_millis(1),
            minute_bucket(now),
        );
        assert!(store.get(&key).unwrap().is_some());

        let again = handle_tick(
            &store,
            &Method::Post,
            vapid(),
            |_| Ok(CountingSender(&count)),
            &DispatchConfig::default(),
            now,
        );
        assert_eq!(again.body["sent"], json!([]));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn tick_without_credentials_is_server_error() {
        let store = MemoryStore::new();
        let count = Cell::new(0);
        let resp = handle_tick(
            &store,
            &Method::Get,
            Err(ConfigError::MissingKey("VAPID_PUBLIC_KEY".into())),
            |_| Ok(CountingSender(&count)),
            &DispatchConfig::default(),
            Utc::now(),
        );
        assert_eq!(resp.status, 500);
    }

    #[test]
    fn tick_rejects_other_methods() {
        let store = MemoryStore::new();
        let count = Cell::new(0);
        let resp = handle_tick(
            &store,
            &Method::from("DELETE"),
            vapid(),
            |_| Ok(CountingSender(&count)),
            &DispatchConfig::default(),
            Utc::now(),
        );
        assert_eq!(resp.status, 405);
    }
}
