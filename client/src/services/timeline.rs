//! Display ordering for blocks and items.
//!
//! `order` is a sort key, not a dense index: gaps and ties are allowed, and
//! ties fall back to the position in the owning collection.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Block, BlockItem, Schedule};
use crate::services::insights::is_high_risk;

/// Blocks in timeline order: by `start_time` (unset last), then `order`,
/// then original position.
pub fn ordered_blocks(schedule: &Schedule) -> Vec<&Arc<Block>> {
    let mut blocks: Vec<&Arc<Block>> = schedule.blocks.iter().collect();
    // sort_by is stable, which keeps original position as the last tie-breaker
    blocks.sort_by(|a, b| {
        let by_start = match (a.start_time, b.start_time) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        by_start.then(a.order.cmp(&b.order))
    });
    blocks
}

/// Items of a block sorted by `order`, ties kept in collection order.
pub fn ordered_items(block: &Block) -> Vec<&Arc<BlockItem>> {
    let mut items: Vec<&Arc<BlockItem>> = block.items.iter().collect();
    items.sort_by_key(|item| item.order);
    items
}

/// One row of the rendered timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Position of the block in `schedule.blocks`.
    pub index: usize,
    pub name: String,
    pub block_type: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    pub high_risk: bool,
}

/// `start` plus `minutes`, or `None` when the result is not representable.
pub fn end_time(start: DateTime<Utc>, minutes: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_minutes(minutes).and_then(|delta| start.checked_add_signed(delta))
}

pub fn timeline(schedule: &Schedule) -> Vec<TimelineEntry> {
    ordered_blocks(schedule)
        .into_iter()
        .map(|block| {
            let index = schedule
                .blocks
                .iter()
                .position(|b| Arc::ptr_eq(b, block))
                .unwrap_or_default();
            let end = match (block.start_time, block.duration) {
                (Some(start), Some(minutes)) => end_time(start, minutes),
                _ => None,
            };
            TimelineEntry {
                index,
                name: block.name.clone(),
                block_type: block.type_or_default().to_string(),
                start: block.start_time,
                end,
                duration: block.duration,
                high_risk: is_high_risk(block),
            }
        })
        .collect()
}
