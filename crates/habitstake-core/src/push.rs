//! Push delivery collaborator.
//!
//! The dispatch engine only needs "send this payload to that subscription".
//! [`HttpPushSender`] posts the JSON payload straight to the subscription
//! endpoint through a signing push gateway. Payload encryption and the VAPID
//! JWT are the gateway's job; the sender only identifies the application with
//! the gateway-specific header `Authorization: vapid k=<public key>, s=<subject>`.
//! The private key never leaves the gateway, so it is checked for presence
//! and not kept.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, DeliveryError};
use crate::habit::{Habit, HabitId};

pub const VAPID_PUBLIC_KEY_ENV: &str = "VAPID_PUBLIC_KEY";
pub const VAPID_PRIVATE_KEY_ENV: &str = "VAPID_PRIVATE_KEY";
pub const VAPID_SUBJECT_ENV: &str = "VAPID_SUBJECT";

/// Delivery identity, read from the environment only.
#[derive(Debug, Clone)]
pub struct VapidConfig {
    pub public_key: String,
    pub subject: String,
}

impl VapidConfig {
    /// Read credentials from the process environment.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingKey`] naming the first absent variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary lookup; empty values count as
    /// missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
        };
        let public_key = require(VAPID_PUBLIC_KEY_ENV)?;
        require(VAPID_PRIVATE_KEY_ENV)?;
        Ok(Self {
            public_key,
            subject: require(VAPID_SUBJECT_ENV)?,
        })
    }
}

/// Browser subscription keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushKeys {
    #[serde(default)]
    pub p256dh: String,
    #[serde(default)]
    pub auth: String,
}

/// Opaque delivery descriptor for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushTarget {
    pub endpoint: String,
    #[serde(default)]
    pub keys: PushKeys,
}

/// Reminder payload shown by the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub habit_id: HabitId,
    /// Lets the device collapse repeated reminders for one habit.
    pub tag: String,
}

impl PushPayload {
    pub fn reminder(habit: &Habit) -> Self {
        Self {
            title: "Habit check-in".to_string(),
            body: format!("Did you complete \"{}\" today?", habit.name),
            habit_id: habit.id,
            tag: format!("habit-{}", habit.id),
        }
    }
}

/// Something that can deliver a payload to a device.
pub trait PushSender {
    fn send(&self, target: &PushTarget, payload: &PushPayload) -> Result<(), DeliveryError>;
}

/// Blocking HTTP push sender.
pub struct HttpPushSender {
    client: reqwest::blocking::Client,
    vapid: VapidConfig,
    ttl_secs: u32,
}

impl HttpPushSender {
    pub fn new(vapid: VapidConfig, ttl_secs: u32, timeout: std::time::Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            vapid,
            ttl_secs,
        })
    }
}

impl PushSender for HttpPushSender {
    fn send(&self, target: &PushTarget, payload: &PushPayload) -> Result<(), DeliveryError> {
        let resp = self
            .client
            .post(&target.endpoint)
            .header("TTL", self.ttl_secs.to_string())
            .header("Urgency", "normal")
            .header("Topic", &payload.tag)
            .header(
                "Authorization",
                format!("vapid k={}, s={}", self.vapid.public_key, self.vapid.subject),
            )
            .json(payload)
            .send()?;

        let status = resp.status().as_u16();
        debug!(status, endpoint = %target.endpoint, "push service responded");
        match status {
            200..=299 => Ok(()),
            404 | 410 => Err(DeliveryError::Gone(status)),
            _ => Err(DeliveryError::Rejected {
                status,
                body: resp.text().unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vapid() -> VapidConfig {
        VapidConfig {
            public_key: "pub".into(),
            subject: "mailto:ops@example.com".into(),
        }
    }

    fn payload() -> PushPayload {
        PushPayload {
            title: "Habit check-in".into(),
            body: "Did you complete \"Gym\" today?".into(),
            habit_id: HabitId::from_millis(7),
            tag: "habit-7".into(),
        }
    }

    #[test]
    fn vapid_lookup_reports_first_missing_key() {
        let env: HashMap<&str, &str> = [(VAPID_PUBLIC_KEY_ENV, "pub"), (VAPID_SUBJECT_ENV, " ")].into();
        let err = VapidConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(k) if k == VAPID_PRIVATE_KEY_ENV));
    }

    #[test]
    fn vapid_lookup_requires_private_key_but_does_not_keep_it() {
        let env: HashMap<&str, &str> = [
            (VAPID_PUBLIC_KEY_ENV, "pub"),
            (VAPID_PRIVATE_KEY_ENV, "priv"),
            (VAPID_SUBJECT_ENV, "mailto:ops@example.com"),
        ]
        .into();
        let vapid = VapidConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(vapid.public_key, "pub");
        assert!(!format!("{vapid:?}").contains("priv"));
    }

    #[test]
    fn send_posts_payload_with_headers() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/push/abc")
            .match_header("ttl", "60")
            .match_header("topic", "habit-7")
            .match_header("authorization", "vapid k=pub, s=mailto:ops@example.com")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"habitId": 7})))
            .with_status(201)
            .create();

        let sender = HttpPushSender::new(vapid(), 60, std::time::Duration::from_secs(5)).unwrap();
        let target = PushTarget {
            endpoint: format!("{}/push/abc", server.url()),
            keys: PushKeys::default(),
        };
        sender.send(&target, &payload()).unwrap();
        mock.assert();
    }

    #[test]
    fn gone_subscription_is_reported() {
        let mut server = mockito::Server::new();
        server.mock("POST", "/push/old").with_status(410).create();

        let sender = HttpPushSender::new(vapid(), 60, std::time::Duration::from_secs(5)).unwrap();
        let target = PushTarget {
            endpoint: format!("{}/push/old", server.url()),
            keys: PushKeys::default(),
        };
        let err = sender.send(&target, &payload()).unwrap_err();
        assert!(matches!(err, DeliveryError::Gone(410)));
    }

    #[test]
    fn rejection_keeps_status_and_body() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/push/bad")
            .with_status(400)
            .with_body("bad payload")
            .create();

        let sender = HttpPushSender::new(vapid(), 60, std::time::Duration::from_secs(5)).unwrap();
        let target = PushTarget {
            endpoint: format!("{}/push/bad", server.url()),
            keys: PushKeys::default(),
        };
        match sender.send(&target, &payload()).unwrap_err() {
            DeliveryError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad payload");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
