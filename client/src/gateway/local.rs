//! In-memory local gateway implementation.
//!
//! Stores schedules in memory and stands in for the remote service in unit
//! tests, offline development and the CLI's `local` mode. Ids are assigned on
//! persist, derived fields (`total_duration`, `risk_score`) are recomputed on
//! every write, and analysis, optimization and projections are produced by
//! simple deterministic rules so results are reproducible.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::error::{ErrorContext, GatewayError, GatewayResult};
use super::traits::ScheduleGateway;
use crate::api::{
    BlockId, BlockItem, BlockItemId, EquipmentId, EquipmentUsage, OptimizationResult,
    ParticipantId, PublicFormat, PublicItem, PublicProjection, PublicSchedule, ResourceAnalysis,
    RiskFactorId, Schedule, ScheduleAnalysis, ScheduleId, SchedulePage, TimeAnalysisEntry,
    VolunteerItem, VolunteerSchedule,
};
use crate::models::{Block, Equipment, DEFAULT_BUFFER_TIME};
use crate::services::insights::{is_high_risk, total_minutes, HIGH_SEVERITY_THRESHOLD};
use crate::services::timeline::{end_time, ordered_blocks, ordered_items};

/// Buffer below which the analysis recommends more slack, in minutes.
const MIN_COMFORTABLE_BUFFER: i64 = 15;
/// Block complexity above which a technical break is recommended.
const COMPLEX_BLOCK: f64 = 0.7;

/// In-memory local gateway.
///
/// Clones share the same underlying store.
///
/// # Example
/// ```
/// use event_scheduler::gateway::LocalGateway;
/// use event_scheduler::models::Schedule;
///
/// let gateway = LocalGateway::new();
/// let id = gateway.insert(Schedule::new("Summer Fest"));
/// assert!(gateway.has_schedule(id));
/// ```
#[derive(Clone)]
pub struct LocalGateway {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    schedules: BTreeMap<ScheduleId, Schedule>,
    next_schedule_id: i64,
    next_entity_id: i64,
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            schedules: BTreeMap::new(),
            next_schedule_id: 1,
            next_entity_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalData {
    fn take_entity_id(&mut self) -> i64 {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Assign ids to every unsaved node and point children at their parents.
    fn assign_ids(&mut self, schedule: &mut Schedule) {
        let schedule_id = schedule.id;
        for block in schedule.blocks.iter_mut() {
            let block = Arc::make_mut(block);
            if block.id.is_none() {
                block.id = Some(BlockId(self.take_entity_id()));
            }
            block.schedule_id = schedule_id;

            for equipment in block.equipment.iter_mut() {
                self.assign_equipment_id(equipment);
            }
            for risk in block.risk_factors.iter_mut() {
                let risk = Arc::make_mut(risk);
                if risk.id.is_none() {
                    risk.id = Some(RiskFactorId(self.take_entity_id()));
                }
                risk.block_id = block.id;
            }
            for item in block.items.iter_mut() {
                let item = Arc::make_mut(item);
                if item.id.is_none() {
                    item.id = Some(BlockItemId(self.take_entity_id()));
                }
                item.block_id = block.id;
                for equipment in item.equipment.iter_mut() {
                    self.assign_equipment_id(equipment);
                }
                for participant in item.participants.iter_mut() {
                    let participant = Arc::make_mut(participant);
                    if participant.id.is_none() {
                        participant.id = Some(ParticipantId(self.take_entity_id()));
                    }
                    participant.block_item_id = item.id;
                }
            }
        }
    }

    fn assign_equipment_id(&mut self, equipment: &mut Arc<Equipment>) {
        if equipment.id.is_none() {
            Arc::make_mut(equipment).id = Some(EquipmentId(self.take_entity_id()));
        }
    }
}

/// Risk of one block: the worst `probability * impact` among its factors.
fn block_risk(block: &Block) -> f64 {
    block
        .risk_factors
        .iter()
        .map(|r| r.severity())
        .fold(0.0, f64::max)
}

/// Schedule risk estimate: mean block risk, 0 without blocks.
pub fn estimate_risk(schedule: &Schedule) -> f64 {
    if schedule.blocks.is_empty() {
        return 0.0;
    }
    let total: f64 = schedule.blocks.iter().map(|b| block_risk(b)).sum();
    total / schedule.blocks.len() as f64
}

fn refresh_derived(schedule: &mut Schedule) {
    let durations = schedule.blocks.iter().filter_map(|b| b.duration);
    schedule.total_duration = Some(total_minutes(durations));
    schedule.risk_score = Some(estimate_risk(schedule));
}

fn clock(ts: Option<chrono::DateTime<chrono::Utc>>) -> String {
    ts.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

impl LocalGateway {
    /// Create a new empty local gateway.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Create a gateway pre-populated with `schedules`.
    pub fn with_schedules(schedules: impl IntoIterator<Item = Schedule>) -> Self {
        let gateway = Self::new();
        for schedule in schedules {
            gateway.insert(schedule);
        }
        gateway
    }

    /// Store a schedule directly, bypassing the health check.
    ///
    /// # Returns
    /// The id assigned to the schedule (any existing id is replaced)
    pub fn insert(&self, mut schedule: Schedule) -> ScheduleId {
        let mut data = self.data.write();
        let id = ScheduleId(data.next_schedule_id);
        data.next_schedule_id += 1;
        schedule.id = Some(id);
        data.assign_ids(&mut schedule);
        refresh_derived(&mut schedule);
        data.schedules.insert(id, schedule);
        id
    }

    /// Set the health status for simulating an unreachable service.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Remove every schedule, keeping the health status.
    pub fn clear(&self) {
        let mut data = self.data.write();
        let is_healthy = data.is_healthy;
        *data = LocalData {
            is_healthy,
            ..Default::default()
        };
    }

    /// Get the number of schedules stored.
    pub fn schedule_count(&self) -> usize {
        self.data.read().schedules.len()
    }

    /// Check if a schedule exists.
    pub fn has_schedule(&self, id: ScheduleId) -> bool {
        self.data.read().schedules.contains_key(&id)
    }

    /// Helper to check health and return an unreachable error if unhealthy.
    fn check_health(&self, operation: &str) -> GatewayResult<()> {
        if !self.data.read().is_healthy {
            return Err(GatewayError::unreachable(
                "Local gateway is marked unhealthy",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }

    /// Helper to get a schedule or return a 404 error.
    fn get_schedule_impl(&self, id: ScheduleId, operation: &str) -> GatewayResult<Schedule> {
        self.data
            .read()
            .schedules
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("schedule", id, operation))
    }

    fn analyze_impl(schedule: &Schedule) -> ScheduleAnalysis {
        let buffer = schedule.buffer_time.unwrap_or(DEFAULT_BUFFER_TIME);
        let mut recommendations = Vec::new();

        if !schedule.blocks.is_empty() && buffer < MIN_COMFORTABLE_BUFFER {
            recommendations.push(format!(
                "Increase the buffer between blocks to at least {} minutes",
                MIN_COMFORTABLE_BUFFER
            ));
        }

        for block in ordered_blocks(schedule) {
            if is_high_risk(block) {
                let unmitigated = block
                    .risk_factors
                    .iter()
                    .filter(|r| r.severity() > HIGH_SEVERITY_THRESHOLD && r.mitigation.is_none());
                for risk in unmitigated {
                    recommendations.push(format!(
                        "Add a mitigation for the {} risk in '{}'",
                        risk.risk_type.as_str(),
                        block.name
                    ));
                }
            }
            if block.complexity.unwrap_or(0.0) > COMPLEX_BLOCK
                && block.tech_break_duration.unwrap_or(0) == 0
            {
                recommendations.push(format!(
                    "Schedule a technical break after '{}'",
                    block.name
                ));
            }
        }

        let ordered = ordered_blocks(schedule);
        let mut time_analysis = Vec::with_capacity(ordered.len());
        for (pos, block) in ordered.iter().enumerate() {
            let duration = block.duration.unwrap_or(0);
            let mut entry = TimeAnalysisEntry {
                block_name: block.name.clone(),
                analysis: format!("{} min starting at {}", duration, clock(block.start_time)),
                ..Default::default()
            };

            // Blocks whose end is not representable get no conflict check
            let ready = block
                .start_time
                .zip(duration.checked_add(buffer))
                .and_then(|(start, minutes)| end_time(start, minutes));
            let next = ordered.get(pos + 1).and_then(|n| n.start_time);
            if let (Some(ready), Some(next)) = (ready, next) {
                if ready > next {
                    entry.conflicts.push(format!(
                        "Overlaps '{}' by {} min including buffer",
                        ordered[pos + 1].name,
                        (ready - next).num_minutes()
                    ));
                    entry.suggestions = Some(format!(
                        "Move '{}' to {} or later",
                        ordered[pos + 1].name,
                        ready.format("%H:%M")
                    ));
                }
            }
            if block.start_time.is_none() {
                entry.warnings = Some("No start time set".to_string());
            }
            time_analysis.push(entry);
        }

        let mut usage: BTreeMap<String, usize> = BTreeMap::new();
        for block in schedule.blocks.iter() {
            let mut names: Vec<&str> = block.equipment.iter().map(|e| e.name.as_str()).collect();
            for item in block.items.iter() {
                names.extend(item.equipment.iter().map(|e| e.name.as_str()));
            }
            names.sort_unstable();
            names.dedup();
            for name in names {
                *usage.entry(name.to_string()).or_default() += 1;
            }
        }
        let block_count = schedule.blocks.len().max(1) as f64;
        let equipment = usage
            .into_iter()
            .map(|(name, used)| EquipmentUsage {
                name,
                utilization: used as f64 / block_count,
            })
            .collect();

        ScheduleAnalysis {
            risk_score: estimate_risk(schedule),
            recommendations,
            time_analysis,
            resource_analysis: Some(ResourceAnalysis {
                equipment,
                staff: Vec::new(),
            }),
        }
    }

    fn optimize_impl(schedule: &Schedule) -> OptimizationResult {
        let buffer = schedule.buffer_time.unwrap_or(DEFAULT_BUFFER_TIME);
        let ordered = ordered_blocks(schedule);
        let mut improvements = BTreeMap::new();

        let order: Vec<String> = ordered.iter().map(|b| b.name.clone()).collect();
        improvements.insert("suggested_order".to_string(), serde_json::json!(order));

        let work = total_minutes(ordered.iter().filter_map(|b| b.duration));
        let gaps = (ordered.len().saturating_sub(1) as i64).saturating_mul(buffer);
        improvements.insert(
            "estimated_duration".to_string(),
            serde_json::json!(format!(
                "{} min including {} min of buffers",
                work.saturating_add(gaps),
                gaps
            )),
        );

        let unplaced = ordered.iter().filter(|b| b.start_time.is_none()).count();
        if unplaced > 0 {
            improvements.insert(
                "unplaced_blocks".to_string(),
                serde_json::json!(format!("{} blocks have no start time", unplaced)),
            );
        }

        OptimizationResult { improvements }
    }

    fn public_impl(schedule: &Schedule) -> PublicSchedule {
        let items = ordered_blocks(schedule)
            .into_iter()
            .map(|block| PublicItem {
                title: block.name.clone(),
                time: block.start_time,
                description: block.location.clone(),
                sub_items: ordered_items(block)
                    .into_iter()
                    .map(|item| PublicItem {
                        title: item.name.clone(),
                        time: None,
                        description: item.description.clone(),
                        sub_items: Vec::new(),
                    })
                    .collect(),
            })
            .collect();

        PublicSchedule {
            event_name: schedule.name.clone(),
            date: schedule.start_date,
            items,
        }
    }

    fn public_text(public: &PublicSchedule) -> String {
        let mut lines = vec![public.event_name.clone()];
        for item in &public.items {
            lines.push(format!("{} {}", clock(item.time), item.title));
            for sub in &item.sub_items {
                lines.push(format!("  - {}", sub.title));
            }
        }
        lines.join("\n")
    }

    fn volunteer_impl(schedule: &Schedule) -> VolunteerSchedule {
        let mut notes = Vec::new();
        let mut items = Vec::new();

        for block in ordered_blocks(schedule) {
            for risk in block.risk_factors.iter() {
                if let Some(mitigation) = &risk.mitigation {
                    notes.push(format!("{}: {}", block.name, mitigation));
                }
            }

            let mut equipment: Vec<&Equipment> =
                block.equipment.iter().map(|e| e.as_ref()).collect();
            for item in block.items.iter() {
                equipment.extend(item.equipment.iter().map(|e| e.as_ref()));
            }
            let setup: Vec<String> = equipment
                .iter()
                .filter(|e| e.setup_time.unwrap_or(0) > 0)
                .map(|e| format!("{} ({} min)", e.name, e.setup_time.unwrap_or(0)))
                .collect();

            let instructions: Vec<&str> = block
                .items
                .iter()
                .filter_map(|i| i.requirements.as_deref())
                .collect();

            let break_duration = block.tech_break_duration.filter(|d| *d > 0);
            items.push(VolunteerItem {
                title: block.name.clone(),
                time: block.start_time,
                location: block.location.clone(),
                tech_break: break_duration.is_some(),
                required_staff: block.required_staff.unwrap_or(0),
                break_duration,
                instructions: (!instructions.is_empty()).then(|| instructions.join("; ")),
                equipment: equipment.iter().map(|e| e.name.clone()).collect(),
                setup_notes: (!setup.is_empty()).then(|| format!("Set up {}", setup.join(", "))),
            });
        }

        VolunteerSchedule {
            event_name: schedule.name.clone(),
            date: schedule.start_date,
            notes,
            items,
        }
    }
}

impl Default for LocalGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScheduleGateway for LocalGateway {
    async fn list(&self, page: u32, page_size: u32) -> GatewayResult<SchedulePage> {
        self.check_health("list_schedules")?;
        let data = self.data.read();
        let page = page.max(1);
        let skip = (page as usize - 1).saturating_mul(page_size as usize);

        Ok(SchedulePage {
            data: data
                .schedules
                .values()
                .skip(skip)
                .take(page_size as usize)
                .cloned()
                .collect(),
            total: data.schedules.len() as u64,
            page,
            page_size,
        })
    }

    async fn get(&self, id: ScheduleId) -> GatewayResult<Schedule> {
        self.check_health("get_schedule")?;
        self.get_schedule_impl(id, "get_schedule")
    }

    async fn create(&self, schedule: &Schedule) -> GatewayResult<Schedule> {
        self.check_health("create_schedule")?;
        let id = self.insert(schedule.clone());
        log::info!("Created schedule {} ('{}')", id, schedule.name);
        self.get_schedule_impl(id, "create_schedule")
    }

    async fn update(&self, id: ScheduleId, schedule: &Schedule) -> GatewayResult<Schedule> {
        self.check_health("update_schedule")?;
        let mut data = self.data.write();
        if !data.schedules.contains_key(&id) {
            return Err(GatewayError::not_found("schedule", id, "update_schedule"));
        }

        let mut stored = schedule.clone();
        stored.id = Some(id);
        data.assign_ids(&mut stored);
        refresh_derived(&mut stored);
        data.schedules.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: ScheduleId) -> GatewayResult<()> {
        self.check_health("delete_schedule")?;
        match self.data.write().schedules.remove(&id) {
            Some(_) => Ok(()),
            None => Err(GatewayError::not_found("schedule", id, "delete_schedule")),
        }
    }

    async fn arrange_items(
        &self,
        schedule_id: ScheduleId,
        items: &[BlockItem],
    ) -> GatewayResult<()> {
        self.check_health("arrange_items")?;
        let mut data = self.data.write();
        let schedule = data
            .schedules
            .get_mut(&schedule_id)
            .ok_or_else(|| GatewayError::not_found("schedule", schedule_id, "arrange_items"))?;

        let orders: HashMap<BlockItemId, i64> = items
            .iter()
            .filter_map(|item| item.id.map(|id| (id, item.order)))
            .collect();

        for block in schedule.blocks.iter_mut() {
            let touches = block
                .items
                .iter()
                .any(|i| i.id.is_some_and(|id| orders.contains_key(&id)));
            if !touches {
                continue;
            }
            for item in Arc::make_mut(block).items.iter_mut() {
                if let Some(order) = item.id.and_then(|id| orders.get(&id)) {
                    Arc::make_mut(item).order = *order;
                }
            }
        }
        Ok(())
    }

    async fn analyze(&self, schedule: &Schedule) -> GatewayResult<ScheduleAnalysis> {
        self.check_health("analyze_schedule")?;
        Ok(Self::analyze_impl(schedule))
    }

    async fn optimize(&self, schedule: &Schedule) -> GatewayResult<OptimizationResult> {
        self.check_health("optimize_schedule")?;
        Ok(Self::optimize_impl(schedule))
    }

    async fn get_public(
        &self,
        id: ScheduleId,
        format: PublicFormat,
    ) -> GatewayResult<PublicProjection> {
        self.check_health("get_public_schedule")?;
        let public = Self::public_impl(&self.get_schedule_impl(id, "get_public_schedule")?);
        Ok(match format {
            PublicFormat::Json => PublicProjection::Structured(public),
            PublicFormat::Text => PublicProjection::Text(Self::public_text(&public)),
        })
    }

    async fn get_volunteer(&self, id: ScheduleId) -> GatewayResult<VolunteerSchedule> {
        self.check_health("get_volunteer_schedule")?;
        let schedule = self.get_schedule_impl(id, "get_volunteer_schedule")?;
        Ok(Self::volunteer_impl(&schedule))
    }

    async fn health_check(&self) -> GatewayResult<bool> {
        Ok(self.data.read().is_healthy)
    }
}
