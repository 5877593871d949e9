//! Derived statistics for the dashboard, list and detail views.
//!
//! Every function here is pure given `(schedules, now)`. The current time is
//! always an explicit argument, so results are recomputed per call and never
//! cached across a time boundary.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Block, Schedule};

/// Risk scores at or below this value are "low".
pub const RISK_LOW_MAX: f64 = 0.3;
/// Risk scores above [`RISK_LOW_MAX`] and at or below this value are
/// "medium"; anything higher is "high".
pub const RISK_MEDIUM_MAX: f64 = 0.7;
/// A risk factor whose `probability * impact` exceeds this is high risk.
pub const HIGH_SEVERITY_THRESHOLD: f64 = 0.7;
/// How many upcoming entries the dashboard and detail views list.
pub const UPCOMING_LIMIT: usize = 5;

/// Risk bucket of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bucket a score in [0, 1]. NaN counts as 0.
    pub fn from_score(score: f64) -> Self {
        let score = if score.is_nan() { 0.0 } else { score };
        if score <= RISK_LOW_MAX {
            RiskLevel::Low
        } else if score <= RISK_MEDIUM_MAX {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    /// Bucket of a schedule; a missing risk score counts as 0.
    pub fn of(schedule: &Schedule) -> Self {
        Self::from_score(schedule.risk_score.unwrap_or(0.0))
    }
}

/// Convert a fraction in [0, 1] into a whole percentage for display.
pub fn as_percent(fraction: f64) -> i64 {
    (fraction * 100.0).round() as i64
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

// ==================== Risk distribution ====================

/// Bucket counts plus their share of the total, in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub total: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub low_percent: f64,
    pub medium_percent: f64,
    pub high_percent: f64,
}

/// Partition schedules into risk buckets. The buckets cover the whole input
/// with no overlap; an empty input yields all zeros.
pub fn risk_distribution(schedules: &[Schedule]) -> RiskDistribution {
    let mut dist = RiskDistribution {
        total: schedules.len(),
        ..Default::default()
    };

    for schedule in schedules {
        match RiskLevel::of(schedule) {
            RiskLevel::Low => dist.low += 1,
            RiskLevel::Medium => dist.medium += 1,
            RiskLevel::High => dist.high += 1,
        }
    }

    dist.low_percent = share(dist.low, dist.total);
    dist.medium_percent = share(dist.medium, dist.total);
    dist.high_percent = share(dist.high, dist.total);
    dist
}

// ==================== Temporal partitioning ====================

/// Where a schedule sits relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    /// `start_date <= now <= end_date`
    Active,
    /// `start_date > now`
    Upcoming,
    /// `end_date < now`
    Ended,
    /// Not enough dates to place it.
    Unscheduled,
}

impl ScheduleStatus {
    pub fn classify(schedule: &Schedule, now: DateTime<Utc>) -> Self {
        match (schedule.start_date, schedule.end_date) {
            (Some(start), _) if start > now => ScheduleStatus::Upcoming,
            (Some(start), Some(end)) if start <= now && now <= end => ScheduleStatus::Active,
            (_, Some(end)) if end < now => ScheduleStatus::Ended,
            _ => ScheduleStatus::Unscheduled,
        }
    }
}

/// Active and upcoming schedules, in input order.
#[derive(Debug, Clone, Default)]
pub struct TimePartition<'a> {
    pub active: Vec<&'a Schedule>,
    pub upcoming: Vec<&'a Schedule>,
}

pub fn partition_by_time(schedules: &[Schedule], now: DateTime<Utc>) -> TimePartition<'_> {
    let mut partition = TimePartition::default();
    for schedule in schedules {
        match ScheduleStatus::classify(schedule, now) {
            ScheduleStatus::Active => partition.active.push(schedule),
            ScheduleStatus::Upcoming => partition.upcoming.push(schedule),
            ScheduleStatus::Ended | ScheduleStatus::Unscheduled => {}
        }
    }
    partition
}

/// The next [`UPCOMING_LIMIT`] schedules to start, soonest first.
pub fn upcoming_schedules(schedules: &[Schedule], now: DateTime<Utc>) -> Vec<&Schedule> {
    let mut upcoming = partition_by_time(schedules, now).upcoming;
    upcoming.sort_by_key(|s| s.start_date);
    upcoming.truncate(UPCOMING_LIMIT);
    upcoming
}

/// Schedules running at `now`, in input order.
pub fn active_schedules(schedules: &[Schedule], now: DateTime<Utc>) -> Vec<&Schedule> {
    partition_by_time(schedules, now).active
}

/// Schedules that ended before `now`, most recently ended first.
pub fn archived(schedules: &[Schedule], now: DateTime<Utc>) -> Vec<&Schedule> {
    let mut ended: Vec<&Schedule> = schedules
        .iter()
        .filter(|s| matches!(s.end_date, Some(end) if end < now))
        .collect();
    ended.sort_by(|a, b| b.end_date.cmp(&a.end_date));
    ended
}

// ==================== Dashboard ====================

/// Headline numbers for the dashboard cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_schedules: usize,
    pub upcoming: usize,
    pub active: usize,
    /// Mean risk score over the schedules that carry one (0 if none do).
    pub average_risk: f64,
    pub high_risk: usize,
    pub risk_distribution: RiskDistribution,
}

pub fn dashboard_stats(schedules: &[Schedule], now: DateTime<Utc>) -> DashboardStats {
    let partition = partition_by_time(schedules, now);
    let scores: Vec<f64> = schedules.iter().filter_map(|s| s.risk_score).collect();
    let distribution = risk_distribution(schedules);

    DashboardStats {
        total_schedules: schedules.len(),
        upcoming: partition.upcoming.len(),
        active: partition.active.len(),
        average_risk: mean(&scores),
        high_risk: distribution.high,
        risk_distribution: distribution,
    }
}

// ==================== Per-schedule summary ====================

/// Whether any of the block's risk factors is above [`HIGH_SEVERITY_THRESHOLD`].
pub fn is_high_risk(block: &Block) -> bool {
    block
        .risk_factors
        .iter()
        .any(|r| r.severity() > HIGH_SEVERITY_THRESHOLD)
}

/// Sum of block durations in minutes, saturating at `i64::MAX`.
pub fn total_minutes(durations: impl IntoIterator<Item = i64>) -> i64 {
    durations.into_iter().fold(0, i64::saturating_add)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    pub block_type: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingBlock {
    pub name: String,
    pub block_type: String,
    pub start_time: DateTime<Utc>,
    pub duration: Option<i64>,
}

/// Figures shown on a schedule's detail view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub block_count: usize,
    /// Sum of block durations, in minutes.
    pub total_duration: i64,
    /// Block count per type, in order of first appearance.
    pub type_breakdown: Vec<TypeCount>,
    pub high_risk_count: usize,
    /// Mean over blocks with a defined complexity (0 if none).
    pub average_complexity: f64,
    pub upcoming_blocks: Vec<UpcomingBlock>,
}

pub fn schedule_summary(schedule: &Schedule, now: DateTime<Utc>) -> ScheduleSummary {
    let blocks = &schedule.blocks;

    let mut type_breakdown: Vec<TypeCount> = Vec::new();
    let mut type_index: HashMap<&str, usize> = HashMap::new();
    for block in blocks {
        let block_type = block.type_or_default();
        match type_index.get(block_type) {
            Some(&i) => type_breakdown[i].count += 1,
            None => {
                type_index.insert(block_type, type_breakdown.len());
                type_breakdown.push(TypeCount {
                    block_type: block_type.to_string(),
                    count: 1,
                });
            }
        }
    }

    let complexities: Vec<f64> = blocks.iter().filter_map(|b| b.complexity).collect();

    let mut upcoming: Vec<UpcomingBlock> = blocks
        .iter()
        .filter_map(|b| {
            b.start_time.filter(|t| *t > now).map(|start_time| UpcomingBlock {
                name: b.name.clone(),
                block_type: b.type_or_default().to_string(),
                start_time,
                duration: b.duration,
            })
        })
        .collect();
    upcoming.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    upcoming.truncate(UPCOMING_LIMIT);

    ScheduleSummary {
        block_count: blocks.len(),
        total_duration: total_minutes(blocks.iter().filter_map(|b| b.duration)),
        type_breakdown,
        high_risk_count: blocks.iter().filter(|b| is_high_risk(b)).count(),
        average_complexity: mean(&complexities),
        upcoming_blocks: upcoming,
    }
}
