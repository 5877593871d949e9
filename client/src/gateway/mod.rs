//! Access to the remote scheduling service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Edit session / CLI                                      │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  services.rs - paging, concurrent detail fetch,          │
//! │  stale-response filtering                                │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  ScheduleGateway trait (traits.rs)                       │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴────────────────┐
//!     │                                 │
//! ┌───▼──────────────┐     ┌──────────▼──────────────┐
//! │ HttpGateway      │     │ LocalGateway            │
//! │ (reqwest, JSON)  │     │ (in-memory)             │
//! └──────────────────┘     └─────────────────────────┘
//! ```
//!
//! Implementations are selected at runtime through [`GatewayFactory`], from
//! `gateway.toml` or the `GATEWAY_TYPE` / `SCHEDULER_API_URL` environment
//! variables.

#[cfg(not(any(feature = "local-gateway", feature = "http-gateway")))]
compile_error!("Enable at least one gateway feature.");

pub mod config;
pub mod error;
pub mod factory;
#[cfg(feature = "http-gateway")]
pub mod http;
#[cfg(feature = "local-gateway")]
pub mod local;
pub mod services;
pub mod traits;

pub use config::{ConfigError, GatewayConfig, HttpSettings};
pub use error::{ErrorContext, GatewayError, GatewayErrorKind, GatewayResult};
pub use factory::{GatewayFactory, GatewayType};
#[cfg(feature = "http-gateway")]
pub use http::HttpGateway;
#[cfg(feature = "local-gateway")]
pub use local::LocalGateway;
pub use traits::ScheduleGateway;
