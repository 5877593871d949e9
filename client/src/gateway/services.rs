//! Gateway-agnostic operations built on top of [`ScheduleGateway`].
//!
//! These functions work with any gateway implementation and hold the
//! orchestration the views need: walking every page, fetching row details
//! concurrently, and dropping analysis results that were overtaken by a
//! newer request.
//!
//! # Usage
//!
//! ```no_run
//! use event_scheduler::gateway::{services, LocalGateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = LocalGateway::new();
//!     let schedules = services::fetch_all(&gateway, 10).await?;
//!     println!("Found {} schedules", schedules.len());
//!     Ok(())
//! }
//! ```

use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;

use super::error::GatewayResult;
use super::traits::ScheduleGateway;
use crate::api::{OptimizationResult, Schedule, ScheduleAnalysis};
use crate::services::insights::{schedule_summary, ScheduleSummary};
use crate::services::request_guard::RequestGuard;

/// Upper bound on pages walked by [`fetch_all`].
const MAX_PAGES: u32 = 1_000;

// ==================== Listing ====================

/// Fetch every schedule by walking the paged listing.
///
/// # Arguments
/// * `gateway` - Gateway implementation
/// * `page_size` - Rows requested per page
///
/// # Returns
/// * `Ok(Vec<Schedule>)` - All schedules, in listing order
/// * `Err(GatewayError)` - The first page request that failed
pub async fn fetch_all<G>(gateway: &G, page_size: u32) -> GatewayResult<Vec<Schedule>>
where
    G: ScheduleGateway + ?Sized,
{
    let page_size = page_size.max(1);
    let mut schedules = Vec::new();

    for page in 1..=MAX_PAGES {
        let result = gateway.list(page, page_size).await?;
        let received = result.data.len();
        let total = result.total;
        schedules.extend(result.data);

        if received == 0 || schedules.len() as u64 >= total {
            break;
        }
    }

    debug!("Fetched {} schedules", schedules.len());
    Ok(schedules)
}

/// A listed schedule together with its detail summary.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleOverview {
    pub schedule: Schedule,
    pub summary: ScheduleSummary,
}

/// Fetch one page, then each row's full detail concurrently, and summarize.
///
/// Rows whose detail request fails are logged and left out; a failure of the
/// page request itself is returned.
pub async fn page_summaries<G>(
    gateway: &G,
    page: u32,
    page_size: u32,
    now: DateTime<Utc>,
) -> GatewayResult<Vec<ScheduleOverview>>
where
    G: ScheduleGateway + ?Sized,
{
    let listing = gateway.list(page, page_size).await?;

    let details = join_all(listing.data.into_iter().map(|row| async move {
        match row.id {
            Some(id) => gateway.get(id).await.map_err(|e| (id, e)),
            None => Ok(row),
        }
    }))
    .await;

    let mut overviews = Vec::with_capacity(details.len());
    for detail in details {
        match detail {
            Ok(schedule) => {
                let summary = schedule_summary(&schedule, now);
                overviews.push(ScheduleOverview { schedule, summary });
            }
            Err((id, e)) => warn!("Skipping schedule {}: {}", id, e),
        }
    }

    info!("Summarized {} schedules on page {}", overviews.len(), page);
    Ok(overviews)
}

// ==================== Analysis ====================

fn analysis_target(kind: &str, schedule: &Schedule) -> String {
    match schedule.id {
        Some(id) => format!("{}:{}", kind, id),
        None => format!("{}:new", kind),
    }
}

/// Analyze `schedule`, discarding the result if a newer analysis of the same
/// schedule was started while this one was in flight.
///
/// # Returns
/// * `Ok(Some(analysis))` - The result is current
/// * `Ok(None)` - The result was stale and dropped
/// * `Err(GatewayError)` - The call failed
pub async fn analyze_latest<G>(
    gateway: &G,
    guard: &RequestGuard,
    schedule: &Schedule,
) -> GatewayResult<Option<ScheduleAnalysis>>
where
    G: ScheduleGateway + ?Sized,
{
    let ticket = guard.begin(analysis_target("analyze", schedule));
    let analysis = gateway.analyze(schedule).await?;
    Ok(guard.accept(&ticket, analysis))
}

/// Optimize `schedule` with the same stale-response rule as [`analyze_latest`].
pub async fn optimize_latest<G>(
    gateway: &G,
    guard: &RequestGuard,
    schedule: &Schedule,
) -> GatewayResult<Option<OptimizationResult>>
where
    G: ScheduleGateway + ?Sized,
{
    let ticket = guard.begin(analysis_target("optimize", schedule));
    let result = gateway.optimize(schedule).await?;
    Ok(guard.accept(&ticket, result))
}
