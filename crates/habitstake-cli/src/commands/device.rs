use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Utc};
use clap::Subcommand;
use habitstake_core::api::{handle_subscribe, ApiResponse, Method};
use habitstake_core::registry::DeviceRegistry;
use habitstake_core::Database;
use serde_json::json;

use super::{print_json, CmdResult, Session};

#[derive(Subcommand)]
pub enum DeviceAction {
    /// Register a device from a subscribe request body (JSON file, `-` for stdin)
    Subscribe {
        file: PathBuf,
    },
    /// Register this machine's habits and timezone under a push endpoint
    Sync {
        /// Push subscription endpoint
        endpoint: String,
        #[arg(long, default_value = "")]
        p256dh: String,
        #[arg(long, default_value = "")]
        auth: String,
    },
    /// List registered devices
    List,
    /// Forget a device
    Remove {
        device_id: String,
    },
}

fn finish(resp: ApiResponse) -> CmdResult {
    print_json(&resp.body)?;
    if resp.status == 200 {
        Ok(())
    } else {
        Err(format!("request failed with status {}", resp.status).into())
    }
}

/// Minutes to add to local time to get UTC (UTC-5 is 300).
fn tz_offset_minutes(now: DateTime<FixedOffset>) -> i32 {
    -now.offset().local_minus_utc() / 60
}

pub fn run(action: DeviceAction, at: Option<DateTime<FixedOffset>>) -> CmdResult {
    match action {
        DeviceAction::Subscribe { file } => {
            let body = if file.as_os_str() == "-" {
                std::io::read_to_string(std::io::stdin())?
            } else {
                std::fs::read_to_string(&file)?
            };
            let db = Database::open()?;
            finish(handle_subscribe(&db, &Method::Post, &body, Utc::now()))
        }
        DeviceAction::Sync {
            endpoint,
            p256dh,
            auth,
        } => {
            let session = Session::open(at)?;
            let body = json!({
                "subscription": { "endpoint": endpoint, "keys": { "p256dh": p256dh, "auth": auth } },
                "habits": session.tracker.state().habits,
                "tzOffsetMinutes": tz_offset_minutes(session.now),
            });
            session.save()?;
            finish(handle_subscribe(&session.db, &Method::Post, &body.to_string(), Utc::now()))
        }
        DeviceAction::List => {
            let db = Database::open()?;
            let scan = DeviceRegistry::new(&db).scan()?;
            let devices: Vec<_> = scan
                .devices
                .iter()
                .map(|d| {
                    json!({
                        "deviceId": d.device_id,
                        "endpoint": d.push_target.endpoint,
                        "habits": d.habits.len(),
                        "tzOffsetMinutes": d.tz_offset_minutes,
                        "updatedAt": d.updated_at,
                    })
                })
                .collect();
            print_json(&json!({ "devices": devices, "unreadable": scan.corrupt }))
        }
        DeviceAction::Remove { device_id } => {
            let db = Database::open()?;
            if DeviceRegistry::new(&db).remove(&device_id)? {
                print_json(&json!({ "ok": true, "id": device_id }))
            } else {
                Err(format!("unknown device: {device_id}").into())
            }
        }
    }
}
