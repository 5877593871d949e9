//! Event Scheduler command line front-end.
//!
//! # Usage
//!
//! ```bash
//! # Against the in-memory gateway (default without configuration)
//! cargo run --bin event-scheduler --features cli -- dashboard
//!
//! # Against the scheduling service
//! SCHEDULER_API_URL=http://localhost:8282/api/v1 \
//!   cargo run --bin event-scheduler --features cli -- summary 42
//! ```
//!
//! # Commands
//!
//! - `dashboard`: headline numbers over every schedule
//! - `summary <id>`: detail figures and timeline for one schedule
//! - `validate <file>`: validate a schedule JSON file locally
//! - `archive`: schedules that have already ended
//!
//! # Environment Variables
//!
//! - `GATEWAY_TYPE`: `http` or `local` (overridden by `gateway.toml`)
//! - `SCHEDULER_API_URL`: Service base URL
//! - `SCHEDULER_API_TIMEOUT`: Request timeout in seconds
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::fs;

use anyhow::{bail, Context};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use event_scheduler::api::ScheduleId;
use event_scheduler::gateway::services::fetch_all;
use event_scheduler::gateway::{GatewayConfig, GatewayFactory, HttpSettings};
use event_scheduler::models::Schedule;
use event_scheduler::services::insights::{archived, dashboard_stats, schedule_summary};
use event_scheduler::services::timeline::timeline;
use event_scheduler::services::validate;

const USAGE: &str = "usage: event-scheduler <dashboard | summary <id> | validate <file> | archive>";

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn page_size() -> u32 {
    match GatewayConfig::from_default_location() {
        Ok(config) => config.http.page_size,
        Err(_) => HttpSettings::from_env().page_size,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().map(String::as_str);

    // Validation is local and needs no gateway
    if command == Some("validate") {
        let path = args.get(1).context(USAGE)?;
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
        let schedule: Schedule = serde_json::from_str(&content)
            .with_context(|| format!("Invalid schedule in {}", path))?;
        let errors = validate(&schedule);
        info!("{} validation errors in {}", errors.len(), path);
        print_json(&errors)?;
        if !errors.is_empty() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let gateway = GatewayFactory::from_default_config()?;
    let now = Utc::now();

    match (command, args.get(1)) {
        (Some("dashboard"), None) => {
            let schedules = fetch_all(gateway.as_ref(), page_size()).await?;
            print_json(&dashboard_stats(&schedules, now))?;
        }
        (Some("summary"), Some(raw_id)) => {
            let id: i64 = raw_id
                .parse()
                .with_context(|| format!("Invalid schedule id '{}'", raw_id))?;
            let schedule = gateway.get(ScheduleId::new(id)).await?;

            #[derive(Serialize)]
            struct Detail<'a> {
                name: &'a str,
                summary: event_scheduler::services::ScheduleSummary,
                timeline: Vec<event_scheduler::services::timeline::TimelineEntry>,
            }

            print_json(&Detail {
                name: &schedule.name,
                summary: schedule_summary(&schedule, now),
                timeline: timeline(&schedule),
            })?;
        }
        (Some("archive"), None) => {
            let schedules = fetch_all(gateway.as_ref(), page_size()).await?;
            print_json(&archived(&schedules, now))?;
        }
        _ => bail!(USAGE),
    }

    Ok(())
}
