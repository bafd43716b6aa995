use chrono::Utc;
use clap::Subcommand;
use habitstake_core::api::{handle_tick, ApiResponse, Method};
use habitstake_core::error::Result as CoreResult;
use habitstake_core::push::{HttpPushSender, VapidConfig};
use habitstake_core::{Config, Database};
use serde_json::json;
use tracing::{info, warn};

use super::{print_json, CmdResult};

#[derive(Subcommand)]
pub enum CronAction {
    /// Run one reminder tick now
    Tick {
        /// Request method to simulate
        #[arg(long, default_value = "GET")]
        method: String,
    },
    /// Tick repeatedly until interrupted
    Run {
        /// Seconds between ticks
        #[arg(long, default_value_t = 60)]
        interval: u64,
    },
    /// Delete expired dedup keys
    Purge,
}

/// One stateless tick against the default store.
fn tick_once(method: &Method) -> CoreResult<ApiResponse> {
    let config = Config::load()?;
    let db = Database::open()?;
    let dispatch = &config.dispatch;
    Ok(handle_tick(
        &db,
        method,
        VapidConfig::from_env(),
        |vapid| HttpPushSender::new(vapid, dispatch.push_ttl_secs, dispatch.request_timeout()),
        dispatch,
        Utc::now(),
    ))
}

pub fn run(action: CronAction) -> CmdResult {
    match action {
        CronAction::Tick { method } => {
            let resp = tick_once(&Method::from(method.as_str()))?;
            print_json(&resp.body)?;
            if resp.status != 200 {
                return Err(format!("tick failed with status {}", resp.status).into());
            }
            Ok(())
        }
        CronAction::Run { interval } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run_loop(interval));
            Ok(())
        }
        CronAction::Purge => {
            let db = Database::open()?;
            let removed = db.purge_expired()?;
            print_json(&json!({ "removed": removed }))
        }
    }
}

async fn run_loop(interval_secs: u64) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
    info!(interval_secs, "reminder cron started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // The push and store clients block; keep them off the runtime thread.
                match tokio::task::spawn_blocking(|| tick_once(&Method::Post)).await {
                    Ok(Ok(resp)) if resp.status == 200 => {
                        if let Ok(line) = serde_json::to_string(&resp.body) {
                            println!("{line}");
                        }
                    }
                    Ok(Ok(resp)) => warn!(status = resp.status, body = %resp.body, "tick rejected"),
                    Ok(Err(e)) => warn!(error = %e, "tick failed"),
                    Err(e) => warn!(error = %e, "tick task panicked"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }
}
