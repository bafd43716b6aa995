//! Payment collaborator.
//!
//! A missed check-in asks the processor to collect the habit's stake. Only
//! the request leaves this crate; capture and settlement happen elsewhere.
//! The caller logs the outcome and never rolls back the missed answer.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::PaymentError;
use crate::habit::{Habit, StakeDestination};
use crate::storage::PaymentConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    /// Amount in currency units; sent to the processor in cents.
    pub amount: f64,
    pub habit_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub destination: StakeDestination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charity_name: Option<String>,
}

impl ChargeRequest {
    pub fn for_habit(habit: &Habit, config: &PaymentConfig) -> Self {
        Self {
            amount: habit.skip_cost,
            habit_name: habit.name.clone(),
            customer_id: config.customer_id.clone(),
            email: config.email.clone(),
            destination: habit.stake_destination,
            charity_name: habit.charity_name.clone(),
        }
    }

    pub fn amount_cents(&self) -> i64 {
        (self.amount * 100.0).round() as i64
    }
}

/// What the processor hands back for client-side confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHandle {
    pub client_secret: String,
    #[serde(rename = "id")]
    pub payment_id: String,
}

pub trait PaymentProcessor {
    fn charge(&self, request: &ChargeRequest) -> Result<PaymentHandle, PaymentError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChargeBody<'a> {
    amount: i64,
    habit_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    destination: StakeDestination,
    #[serde(skip_serializing_if = "Option::is_none")]
    charity_name: Option<&'a str>,
}

/// Posts charge requests to an HTTP payment endpoint.
pub struct HttpPaymentProcessor {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpPaymentProcessor {
    pub fn new(endpoint: impl Into<String>, timeout: std::time::Duration) -> Result<Self, PaymentError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Build from config. [`PaymentError::NotConfigured`] without an endpoint.
    pub fn from_config(config: &PaymentConfig, timeout: std::time::Duration) -> Result<Self, PaymentError> {
        match config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            Some(endpoint) => Self::new(endpoint, timeout),
            None => Err(PaymentError::NotConfigured),
        }
    }
}

impl PaymentProcessor for HttpPaymentProcessor {
    fn charge(&self, request: &ChargeRequest) -> Result<PaymentHandle, PaymentError> {
        let body = ChargeBody {
            amount: request.amount_cents(),
            habit_name: &request.habit_name,
            customer_id: request.customer_id.as_deref(),
            email: request.email.as_deref(),
            destination: request.destination,
            charity_name: request.charity_name.as_deref(),
        };
        debug!(habit = %request.habit_name, cents = body.amount, "requesting charge");

        let resp = self.client.post(&self.endpoint).json(&body).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PaymentError::Declined {
                status: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        let handle: PaymentHandle = resp.json()?;
        info!(payment_id = %handle.payment_id, habit = %request.habit_name, "charge created");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{HabitDraft, HabitId};

    fn habit() -> Habit {
        HabitDraft {
            name: "Gym".into(),
            end_time: Some("18:00".into()),
            skip_cost: 5.25,
            stake_destination: StakeDestination::Charity,
            charity_name: Some("Food Bank".into()),
            ..HabitDraft::default()
        }
        .into_habit(HabitId::from_millis(1))
    }

    fn config() -> PaymentConfig {
        PaymentConfig {
            endpoint: None,
            customer_id: Some("cus_1".into()),
            email: None,
        }
    }

    #[test]
    fn request_carries_stake_and_destination() {
        let req = ChargeRequest::for_habit(&habit(), &config());
        assert_eq!(req.amount_cents(), 525);
        assert_eq!(req.destination, StakeDestination::Charity);
        assert_eq!(req.customer_id.as_deref(), Some("cus_1"));
    }

    #[test]
    fn missing_endpoint_is_not_configured() {
        let err = HttpPaymentProcessor::from_config(&config(), std::time::Duration::from_secs(1)).err();
        assert!(matches!(err, Some(PaymentError::NotConfigured)));
    }

    #[test]
    fn charge_posts_cents_and_parses_handle() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/charge")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "amount": 525,
                "habitName": "Gym",
                "destination": "charity",
                "charityName": "Food Bank"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"clientSecret":"pi_1_secret","id":"pi_1"}"#)
            .create();

        let processor =
            HttpPaymentProcessor::new(format!("{}/charge", server.url()), std::time::Duration::from_secs(5)).unwrap();
        let handle = processor
            .charge(&ChargeRequest::for_habit(&habit(), &config()))
            .unwrap();
        mock.assert();
        assert_eq!(handle.payment_id, "pi_1");
        assert_eq!(handle.client_secret, "pi_1_secret");
    }

    #[test]
    fn declined_charge_keeps_status() {
        let mut server = mockito::Server::new();
        server.mock("POST", "/charge").with_status(402).with_body("card declined").create();

        let processor =
            HttpPaymentProcessor::new(format!("{}/charge", server.url()), std::time::Duration::from_secs(5)).unwrap();
        let err = processor
            .charge(&ChargeRequest::for_habit(&habit(), &config()))
            .unwrap_err();
        assert!(matches!(err, PaymentError::Declined { status: 402, .. }));
    }
}
