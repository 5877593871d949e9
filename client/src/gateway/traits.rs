//! Gateway trait for the remote scheduling service.
//!
//! The service owns persistence, analysis, optimization and the public and
//! volunteer projections. The client core only calls it through this trait.

use async_trait::async_trait;

use super::error::GatewayResult;
use crate::api::{
    BlockItem, OptimizationResult, PublicFormat, PublicProjection, Schedule, ScheduleAnalysis,
    ScheduleId, SchedulePage, VolunteerSchedule,
};

/// Remote scheduling service.
///
/// Every call is asynchronous, independent and at-most-once: implementations
/// do not retry on their own.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ScheduleGateway: Send + Sync {
    // ==================== Schedules ====================

    /// Fetch one page of schedules.
    ///
    /// # Arguments
    /// * `page` - 1-based page number
    /// * `page_size` - Rows per page
    async fn list(&self, page: u32, page_size: u32) -> GatewayResult<SchedulePage>;

    /// Fetch a schedule with its full block tree.
    async fn get(&self, id: ScheduleId) -> GatewayResult<Schedule>;

    /// Persist a new schedule.
    ///
    /// # Returns
    /// * `Ok(Schedule)` - The stored schedule with all ids assigned
    async fn create(&self, schedule: &Schedule) -> GatewayResult<Schedule>;

    /// Replace a stored schedule.
    ///
    /// # Returns
    /// * `Ok(Schedule)` - The schedule as stored by the service
    async fn update(&self, id: ScheduleId, schedule: &Schedule) -> GatewayResult<Schedule>;

    async fn delete(&self, id: ScheduleId) -> GatewayResult<()>;

    /// Persist a new arrangement of block items.
    async fn arrange_items(
        &self,
        schedule_id: ScheduleId,
        items: &[BlockItem],
    ) -> GatewayResult<()>;

    // ==================== Analysis ====================

    async fn analyze(&self, schedule: &Schedule) -> GatewayResult<ScheduleAnalysis>;

    async fn optimize(&self, schedule: &Schedule) -> GatewayResult<OptimizationResult>;

    // ==================== Projections ====================

    /// Audience-facing view of a schedule, structured or as plain text.
    async fn get_public(
        &self,
        id: ScheduleId,
        format: PublicFormat,
    ) -> GatewayResult<PublicProjection>;

    /// Staff-facing view of a schedule.
    async fn get_volunteer(&self, id: ScheduleId) -> GatewayResult<VolunteerSchedule>;

    // ==================== Health ====================

    /// Check whether the service answers.
    async fn health_check(&self) -> GatewayResult<bool>;
}
