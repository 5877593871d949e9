//! Error types for gateway operations.
//!
//! Every failed gateway call is classified into one of a few kinds so that
//! callers can react without looking at transport details:
//! - the service answered and rejected the request (`BadRequest`),
//! - the service could not be reached at all (`Unreachable`),
//! - the request could not be built (`RequestSetup`),
//! - the service answered with a body we cannot read (`Decode`).

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::api::ErrorPayload;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Structured context for gateway errors.
///
/// Records where the failure happened, for logs and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "get_schedule", "analyze")
    pub operation: Option<String>,
    /// The entity type involved (e.g., "schedule")
    pub entity: Option<String>,
    /// The entity ID if applicable
    pub entity_id: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
    /// Whether repeating the call may succeed
    pub retryable: bool,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the entity type.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Set the entity ID.
    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Mark this error as retryable.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref entity) = self.entity {
            parts.push(format!("entity={}", entity));
        }
        if let Some(ref id) = self.entity_id {
            parts.push(format!("id={}", id));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        if self.retryable {
            parts.push("retryable=true".to_string());
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Coarse classification surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    BadRequest,
    Unreachable,
    RequestSetup,
    InvalidResponse,
}

/// Error type for gateway operations
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The service answered with an error status.
    #[error("Request rejected ({status}): {message} {context}")]
    BadRequest {
        status: u16,
        message: String,
        /// Per-field messages from the error payload's `details`.
        field_errors: BTreeMap<String, String>,
        context: ErrorContext,
    },

    /// No response: connection refused, DNS failure, timeout.
    #[error("Service unreachable: {message} {context}")]
    Unreachable {
        message: String,
        context: ErrorContext,
    },

    /// The request could not be built or sent.
    #[error("Request setup failed: {message} {context}")]
    RequestSetup {
        message: String,
        context: ErrorContext,
    },

    /// The response body did not have the expected shape.
    #[error("Invalid response: {message} {context}")]
    Decode {
        message: String,
        context: ErrorContext,
    },
}

pub const UNREACHABLE_MESSAGE: &str =
    "Unable to reach the scheduling service. Please check your connection and try again.";
pub const REQUEST_SETUP_MESSAGE: &str = "Failed to send the request. Please try again.";
pub const INVALID_RESPONSE_MESSAGE: &str =
    "The scheduling service returned an unexpected response.";

impl GatewayError {
    /// Create a bad request error from a decoded error payload.
    pub fn bad_request(status: u16, payload: ErrorPayload, context: ErrorContext) -> Self {
        let message = if payload.error.trim().is_empty() {
            format!("Request failed with status {}", status)
        } else {
            payload.error
        };
        Self::BadRequest {
            status,
            message,
            field_errors: payload.details.unwrap_or_default(),
            context,
        }
    }

    /// Create a 404 bad request error for a missing entity.
    pub fn not_found(entity: &str, id: impl ToString, operation: &str) -> Self {
        let id = id.to_string();
        Self::BadRequest {
            status: 404,
            message: format!("{} {} not found", entity, id),
            field_errors: BTreeMap::new(),
            context: ErrorContext::new(operation)
                .with_entity(entity)
                .with_entity_id(id),
        }
    }

    /// Create an unreachable error; these are always retryable.
    pub fn unreachable(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Unreachable {
            message: message.into(),
            context: context.retryable(),
        }
    }

    /// Create a request setup error.
    pub fn request_setup(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::RequestSetup {
            message: message.into(),
            context,
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Decode {
            message: message.into(),
            context,
        }
    }

    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            Self::BadRequest { .. } => GatewayErrorKind::BadRequest,
            Self::Unreachable { .. } => GatewayErrorKind::Unreachable,
            Self::RequestSetup { .. } => GatewayErrorKind::RequestSetup,
            Self::Decode { .. } => GatewayErrorKind::InvalidResponse,
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message, .. } => message.clone(),
            Self::Unreachable { .. } => UNREACHABLE_MESSAGE.to_string(),
            Self::RequestSetup { .. } => REQUEST_SETUP_MESSAGE.to_string(),
            Self::Decode { .. } => INVALID_RESPONSE_MESSAGE.to_string(),
        }
    }

    /// Server-side per-field messages, empty unless the service sent `details`.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::BadRequest { field_errors, .. } if !field_errors.is_empty() => Some(field_errors),
            _ => None,
        }
    }

    /// HTTP status of a rejected request.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.context().retryable
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::BadRequest { context, .. } => context,
            Self::Unreachable { context, .. } => context,
            Self::RequestSetup { context, .. } => context,
            Self::Decode { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        match &mut self {
            Self::BadRequest { context, .. }
            | Self::Unreachable { context, .. }
            | Self::RequestSetup { context, .. }
            | Self::Decode { context, .. } => {
                context.operation = Some(operation.into());
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_display() {
        let ctx = ErrorContext::new("get_schedule")
            .with_entity("schedule")
            .with_entity_id(7)
            .retryable();
        assert_eq!(
            ctx.to_string(),
            "[operation=get_schedule, entity=schedule, id=7, retryable=true]"
        );
    }

    #[test]
    fn test_bad_request_keeps_details() {
        let mut details = BTreeMap::new();
        details.insert("name".to_string(), "must be unique".to_string());
        let err = GatewayError::bad_request(
            422,
            ErrorPayload {
                error: "Validation failed".into(),
                details: Some(details),
            },
            ErrorContext::new("create_schedule"),
        );
        assert_eq!(err.kind(), GatewayErrorKind::BadRequest);
        assert_eq!(err.user_message(), "Validation failed");
        assert_eq!(err.field_errors().unwrap()["name"], "must be unique");
        assert_eq!(err.status(), Some(422));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_empty_payload_message() {
        let err = GatewayError::bad_request(500, ErrorPayload::default(), ErrorContext::default());
        assert_eq!(err.user_message(), "Request failed with status 500");
        assert!(err.field_errors().is_none());
    }

    #[test]
    fn test_unreachable_is_generic_and_retryable() {
        let err = GatewayError::unreachable("connection refused", ErrorContext::new("list"));
        assert_eq!(err.user_message(), UNREACHABLE_MESSAGE);
        assert!(err.is_retryable());
        let err = err.with_operation("list_schedules");
        assert_eq!(err.context().operation.as_deref(), Some("list_schedules"));
    }
}
