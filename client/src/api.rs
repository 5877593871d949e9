//! Public API surface of the client core.
//!
//! This file consolidates the identifier newtypes and the DTOs exchanged with
//! the scheduling gateway. The entity tree itself lives in [`crate::models`]
//! and is re-exported here so callers can import everything from one place.
//! All types derive Serialize/Deserialize for JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::time::iso8601_option;

pub use crate::models::{
    Block, BlockItem, Equipment, Participant, RiskFactor, RiskType, Schedule,
};

crate::define_id_type!(
    /// Schedule identifier (assigned by the gateway).
    i64,
    ScheduleId
);
crate::define_id_type!(
    /// Block identifier.
    i64,
    BlockId
);
crate::define_id_type!(
    /// Block item identifier.
    i64,
    BlockItemId
);
crate::define_id_type!(
    /// Equipment identifier.
    i64,
    EquipmentId
);
crate::define_id_type!(
    /// Risk factor identifier.
    i64,
    RiskFactorId
);
crate::define_id_type!(
    /// Participant identifier.
    i64,
    ParticipantId
);

/// One page of schedules as returned by `GET /schedules`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulePage {
    #[serde(default)]
    pub data: Vec<Schedule>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

impl SchedulePage {
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            page,
            page_size,
        }
    }

    /// Number of pages needed for `total` rows.
    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size as u64)
    }
}

/// Result of `POST /schedules/analyze`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleAnalysis {
    #[serde(default)]
    pub risk_score: f64,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub time_analysis: Vec<TimeAnalysisEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_analysis: Option<ResourceAnalysis>,
}

/// Per-block timing commentary from the analysis service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeAnalysisEntry {
    #[serde(default, alias = "block")]
    pub block_name: String,
    #[serde(default)]
    pub analysis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
}

/// Equipment and staffing load computed by the analysis service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceAnalysis {
    #[serde(default)]
    pub equipment: Vec<EquipmentUsage>,
    #[serde(default)]
    pub staff: Vec<StaffRequirement>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EquipmentUsage {
    pub name: String,
    /// Fraction in [0, 1]; above 0.8 is shown as overloaded.
    pub utilization: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffRequirement {
    #[serde(rename = "timeSlot", alias = "time_slot")]
    pub time_slot: String,
    pub required: i64,
    pub available: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortage: Option<i64>,
}

/// Result of `POST /schedules/optimize`: improvement name to description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizationResult {
    #[serde(default)]
    pub improvements: BTreeMap<String, serde_json::Value>,
}

/// Representation requested from `GET /schedules/{id}/public`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicFormat {
    #[default]
    Json,
    Text,
}

impl PublicFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublicFormat::Json => "json",
            PublicFormat::Text => "text",
        }
    }
}

/// Audience-facing projection of a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublicProjection {
    Structured(PublicSchedule),
    Text(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicSchedule {
    #[serde(default)]
    pub event_name: String,
    #[serde(default, with = "iso8601_option")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<PublicItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicItem {
    #[serde(default)]
    pub title: String,
    #[serde(default, with = "iso8601_option")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_items: Vec<PublicItem>,
}

/// Staff-facing projection of a schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolunteerSchedule {
    #[serde(default)]
    pub event_name: String,
    #[serde(default, with = "iso8601_option")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub items: Vec<VolunteerItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolunteerItem {
    #[serde(default)]
    pub title: String,
    #[serde(default, with = "iso8601_option")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub tech_break: bool,
    #[serde(default)]
    pub required_staff: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_notes: Option<String>,
}

/// Body of `POST /schedules/arrange`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrangeItemsRequest {
    pub schedule_id: ScheduleId,
    pub items: Vec<BlockItem>,
}

/// Error body returned by the gateway on a failed request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_transparent() {
        let id: ScheduleId = serde_json::from_str("42").unwrap();
        assert_eq!(id, ScheduleId::new(42));
        assert_eq!(serde_json::to_string(&BlockId(3)).unwrap(), "3");
        assert_eq!(ScheduleId(5).to_string(), "5");
        assert_eq!(i64::from(ParticipantId(9)), 9);
    }

    #[test]
    fn test_page_count() {
        let page = SchedulePage {
            total: 21,
            ..SchedulePage::empty(1, 10)
        };
        assert_eq!(page.page_count(), 3);
        assert_eq!(SchedulePage::empty(1, 0).page_count(), 0);
    }

    #[test]
    fn test_analysis_accepts_both_block_keys() {
        let json = r#"{
            "risk_score": 0.55,
            "recommendations": ["Add rain cover"],
            "time_analysis": [
                { "block": "Opening", "analysis": "tight" },
                { "block_name": "Closing", "analysis": "ok", "conflicts": ["stage reuse"] }
            ],
            "resource_analysis": {
                "equipment": [{ "name": "PA", "utilization": 0.9 }],
                "staff": [{
                    "timeSlot": "10:00-12:00",
                    "required": 5,
                    "available": 3,
                    "shortage": 2
                }]
            }
        }"#;
        let analysis: ScheduleAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.time_analysis[0].block_name, "Opening");
        assert_eq!(analysis.time_analysis[1].conflicts.len(), 1);
        let resources = analysis.resource_analysis.unwrap();
        assert_eq!(resources.staff[0].shortage, Some(2));
    }

    #[test]
    fn test_public_projection_variants() {
        let text: PublicProjection = serde_json::from_str(r#""Fest: 10:00 Opening""#).unwrap();
        assert!(matches!(text, PublicProjection::Text(_)));

        let structured: PublicProjection =
            serde_json::from_str(r#"{"event_name": "Fest", "items": []}"#).unwrap();
        match structured {
            PublicProjection::Structured(s) => assert_eq!(s.event_name, "Fest"),
            other => panic!("unexpected projection: {:?}", other),
        }
    }

    #[test]
    fn test_error_payload_details() {
        let payload: ErrorPayload = serde_json::from_str(
            r#"{"error": "validation failed", "details": {"name": "required"}}"#,
        )
        .unwrap();
        assert_eq!(payload.details.unwrap()["name"], "required");
    }
}
