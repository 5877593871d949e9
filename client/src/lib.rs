//! # Event Scheduler Client Core
//!
//! Editing and aggregation core of the event-schedule administration client.
//!
//! A schedule is a tree (Schedule → Block → BlockItem → Participant, with
//! equipment and risk factors hanging off blocks and items). This crate keeps
//! that tree as an immutable value, produces new versions of it for every
//! edit, validates it before submission, and derives the statistics shown by
//! the dashboard and detail views. Persistence, analysis and optimization are
//! delegated to a remote scheduling service reached through a gateway trait.
//!
//! ## Architecture
//!
//! - [`models`]: entity tree and timestamp handling
//! - [`api`]: identifiers and DTOs exchanged with the gateway
//! - [`services`]: validator, tree mutator, aggregator, timeline ordering,
//!   stale-response guard and the custom event type store
//! - [`gateway`]: gateway trait, error taxonomy, configuration and the
//!   local / HTTP implementations
//! - [`session`]: an edit session tying the above together (undo/redo,
//!   validate-then-submit, reconciliation)

// GatewayError carries a context struct for diagnostics
#![allow(clippy::result_large_err)]

pub mod api;
pub mod gateway;
pub mod models;
pub mod services;
pub mod session;

pub use gateway::{GatewayError, GatewayResult, ScheduleGateway};
pub use session::{EditSession, SubmitError};
