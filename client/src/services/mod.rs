//! Service layer: the pure editing and aggregation core.
//!
//! Nothing here performs network I/O. The validator, mutator, aggregator and
//! timeline are plain functions over [`crate::models::Schedule`] values; the
//! request guard and custom type store are small shared-state helpers used
//! by callers of the gateway.

pub mod custom_types;
pub mod editor;
pub mod insights;
pub mod request_guard;
pub mod timeline;
pub mod validation;

pub use custom_types::{
    create_custom_type, event_type_options, CustomEventType, CustomTypeError, CustomTypeStore,
    InMemoryCustomTypeStore, JsonFileCustomTypeStore,
};
pub use editor::{
    BlockPatch, Edit, EditError, EditResult, EquipmentOwner, EquipmentPath, ItemPath,
    ParticipantPath, RiskFactorPath, SchedulePatch,
};
pub use insights::{
    dashboard_stats, risk_distribution, schedule_summary, DashboardStats, RiskDistribution,
    RiskLevel, ScheduleStatus, ScheduleSummary,
};
pub use request_guard::{RequestGuard, Ticket};
pub use validation::{validate, validate_block, ValidationError};
