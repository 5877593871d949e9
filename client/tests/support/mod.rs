#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use event_scheduler::models::{
    parse_iso8601, Block, BlockItem, Equipment, Participant, RiskFactor, RiskType, Schedule,
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

// ==================== Fixtures ====================

pub fn at(s: &str) -> DateTime<Utc> {
    parse_iso8601(s).expect("valid timestamp")
}

/// A valid one-day festival with three blocks:
/// - "Setup": setup, 45 min, one high-severity technical risk
/// - "Main Act": performance, 90 min, one item with two participants
/// - "Break": break, 15 min, no start time
pub fn festival() -> Schedule {
    let setup = Block::new("Setup", 45)
        .with_type("setup")
        .with_complexity(0.5)
        .with_start_time(at("2024-06-15T09:00:00Z"))
        .with_equipment(Equipment::new("Stage lights"))
        .with_risk_factor(RiskFactor::new(RiskType::Technical, 0.9, 0.9));

    let main_act = Block::new("Main Act", 90)
        .with_type("performance")
        .with_complexity(0.8)
        .with_start_time(at("2024-06-15T10:00:00Z"))
        .with_risk_factor(RiskFactor::new(RiskType::Weather, 0.5, 0.5))
        .with_item(
            BlockItem::new("Headliner")
                .with_participant(Participant::new("Ana").with_role("vocals"))
                .with_participant(Participant::new("Ben").with_role("drums")),
        );

    let pause = Block::new("Break", 15).with_type("break");

    Schedule::new("Summer Fest")
        .with_dates(at("2024-06-15T08:00:00Z"), at("2024-06-15T22:00:00Z"))
        .with_block(setup)
        .with_block(main_act)
        .with_block(pause)
}

/// A schedule spanning `[start, end]` with a given risk score.
pub fn dated(name: &str, start: &str, end: &str, risk: Option<f64>) -> Schedule {
    let mut schedule = Schedule::new(name).with_dates(at(start), at(end));
    schedule.risk_score = risk;
    schedule
}
