//! Entity model for event schedules.
//!
//! A [`Schedule`] exclusively owns its blocks; a [`Block`] owns its equipment,
//! items and risk factors; a [`BlockItem`] owns its participants and local
//! equipment. Children are held behind `Arc` so that an edit can produce a new
//! tree which shares every untouched node with the previous one.
//!
//! Field names match the gateway's snake_case JSON 1:1. Identifiers are
//! `None` until the gateway has persisted the entity.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::time::iso8601_option;
use crate::api::{
    BlockId, BlockItemId, EquipmentId, ParticipantId, RiskFactorId, ScheduleId,
};

/// Default buffer time offered for a new schedule, in minutes.
pub const DEFAULT_BUFFER_TIME: i64 = 30;
/// Default duration for a new block or item, in minutes.
pub const DEFAULT_DURATION: i64 = 30;
/// Block type used when none is set.
pub const FALLBACK_BLOCK_TYPE: &str = "other";

/// Gateways written in Go send `null` for empty slices.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Top-level event timeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ScheduleId>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, with = "iso8601_option")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "iso8601_option")]
    pub end_date: Option<DateTime<Utc>>,
    /// Padding reserved between blocks, in minutes (0-180).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_time: Option<i64>,
    /// Server-computed risk score in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    /// Server-computed total duration, in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub blocks: Vec<Arc<Block>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<i64>,
}

impl Schedule {
    /// A blank schedule as offered by the creation form.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buffer_time: Some(DEFAULT_BUFFER_TIME),
            ..Default::default()
        }
    }

    pub fn with_dates(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(Arc::new(block));
        self
    }

    /// Whether the gateway has assigned this schedule an id.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// A scheduled segment of the event (performance, setup, break, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_id: Option<ScheduleId>,
    #[serde(default)]
    pub name: String,
    /// Minutes; required and strictly positive for a valid block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Free-form type: `performance`, `setup`, `break`, `other` or a custom name.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_staff: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_break_duration: Option<i64>,
    #[serde(
        default,
        with = "iso8601_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub order: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub equipment: Vec<Arc<Equipment>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<Arc<BlockItem>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub risk_factors: Vec<Arc<RiskFactor>>,
    /// Blocks this one depends on; referential only.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub dependencies: Vec<BlockId>,
}

impl Block {
    pub fn new(name: impl Into<String>, duration: i64) -> Self {
        Self {
            name: name.into(),
            duration: Some(duration),
            ..Default::default()
        }
    }

    /// The blank block appended by the editor's "add block" action.
    pub fn draft() -> Self {
        Self {
            duration: Some(DEFAULT_DURATION),
            block_type: Some(FALLBACK_BLOCK_TYPE.to_string()),
            complexity: Some(0.0),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, block_type: impl Into<String>) -> Self {
        self.block_type = Some(block_type.into());
        self
    }

    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn with_risk_factor(mut self, risk: RiskFactor) -> Self {
        self.risk_factors.push(Arc::new(risk));
        self
    }

    pub fn with_item(mut self, item: BlockItem) -> Self {
        self.items.push(Arc::new(item));
        self
    }

    pub fn with_equipment(mut self, equipment: Equipment) -> Self {
        self.equipment.push(Arc::new(equipment));
        self
    }

    /// Type used for grouping, with absent or blank types folded into `other`.
    pub fn type_or_default(&self) -> &str {
        match self.block_type.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => FALLBACK_BLOCK_TYPE,
        }
    }
}

/// A sub-unit of a block with its own participants.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<BlockId>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub equipment: Vec<Arc<Equipment>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub participants: Vec<Arc<Participant>>,
}

impl BlockItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The blank item appended under `block`; it inherits the block's type.
    pub fn draft_for(block: &Block) -> Self {
        Self {
            duration: Some(DEFAULT_DURATION),
            item_type: block.block_type.clone(),
            ..Default::default()
        }
    }

    pub fn with_participant(mut self, participant: Participant) -> Self {
        self.participants.push(Arc::new(participant));
        self
    }
}

/// A piece of equipment needed by a block or item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EquipmentId>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub equipment_type: Option<String>,
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity_score: Option<f64>,
}

impl Equipment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            setup_time: Some(0),
            complexity_score: Some(0.0),
            ..Default::default()
        }
    }
}

/// Hazard category of a risk factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskType {
    Weather,
    Technical,
    Logistics,
    #[default]
    #[serde(other)]
    Other,
}

impl RiskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskType::Weather => "weather",
            RiskType::Technical => "technical",
            RiskType::Logistics => "logistics",
            RiskType::Other => "other",
        }
    }
}

/// A named hazard attached to a block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskFactor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RiskFactorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<BlockId>,
    #[serde(rename = "type", default)]
    pub risk_type: RiskType,
    #[serde(default)]
    pub probability: f64,
    #[serde(default)]
    pub impact: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mitigation: Option<String>,
}

impl RiskFactor {
    pub fn new(risk_type: RiskType, probability: f64, impact: f64) -> Self {
        Self {
            risk_type,
            probability,
            impact,
            ..Default::default()
        }
    }

    /// Combined severity, `probability * impact`.
    pub fn severity(&self) -> f64 {
        self.probability * self.impact
    }
}

/// A person taking part in a block item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_item_id: Option<BlockItemId>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
}

impl Participant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_wire_schedule() {
        let json = r#"{
            "id": 7,
            "name": "Summer Fest",
            "start_date": "2024-06-01T10:00:00Z",
            "end_date": "2024-06-02T02:00:00Z",
            "buffer_time": 15,
            "risk_score": 0.42,
            "blocks": [
                {
                    "id": 11,
                    "schedule_id": 7,
                    "name": "Main act",
                    "duration": 90,
                    "type": "performance",
                    "complexity": 0.8,
                    "order": 2,
                    "risk_factors": [
                        { "type": "weather", "probability": 0.5, "impact": 0.6 }
                    ],
                    "items": null,
                    "equipment": null
                }
            ]
        }"#;

        let schedule: Schedule = serde_json::from_str(json).unwrap();
        assert_eq!(schedule.id, Some(ScheduleId(7)));
        assert_eq!(schedule.blocks.len(), 1);
        let block = &schedule.blocks[0];
        assert_eq!(block.block_type.as_deref(), Some("performance"));
        assert_eq!(block.order, 2);
        assert!(block.items.is_empty());
        assert_eq!(block.risk_factors[0].risk_type, RiskType::Weather);
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let block = Block::new("Setup", 45).with_type("setup");
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "setup");
        assert_eq!(value["duration"], 45);
        assert!(value.get("id").is_none());
        assert!(value.get("dependencies").is_none());
        assert!(value["items"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_risk_type_maps_to_other() {
        let risk: RiskFactor =
            serde_json::from_str(r#"{"type": "fire", "probability": 0.1, "impact": 0.2}"#)
                .unwrap();
        assert_eq!(risk.risk_type, RiskType::Other);
    }

    #[test]
    fn test_severity() {
        let risk = RiskFactor::new(RiskType::Technical, 0.9, 0.9);
        assert!((risk.severity() - 0.81).abs() < 1e-12);
    }

    #[test]
    fn test_drafts_follow_form_defaults() {
        let block = Block::draft();
        assert_eq!(block.duration, Some(DEFAULT_DURATION));
        assert_eq!(block.type_or_default(), "other");

        let block = Block::new("Show", 60).with_type("performance");
        let item = BlockItem::draft_for(&block);
        assert_eq!(item.item_type.as_deref(), Some("performance"));
        assert_eq!(item.duration, Some(DEFAULT_DURATION));

        assert_eq!(Schedule::new("x").buffer_time, Some(DEFAULT_BUFFER_TIME));
    }

    #[test]
    fn test_blank_type_falls_back() {
        let block = Block::new("Gap", 10).with_type("  ");
        assert_eq!(block.type_or_default(), FALLBACK_BLOCK_TYPE);
    }
}
