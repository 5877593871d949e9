//! Edit session for a single schedule.
//!
//! An [`EditSession`] owns the schedule being edited. Edits are applied in
//! the order they are issued, each one against the latest value, and every
//! accepted edit is recorded so it can be undone. Submitting validates
//! locally first; only a valid schedule reaches the gateway. A failed save
//! leaves the edited value in place so it can be corrected and resubmitted.

use std::collections::BTreeMap;

use crate::gateway::{GatewayError, ScheduleGateway};
use crate::models::Schedule;
use crate::services::editor::{Edit, EditResult};
use crate::services::validation::{validate, ValidationError};

/// Number of undo steps kept.
pub const MAX_HISTORY: usize = 100;

/// Why a submission did not go through.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Local validation failed; nothing was sent.
    #[error("Schedule has {} validation error(s)", .0.len())]
    Validation(Vec<ValidationError>),

    /// The gateway call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone)]
pub struct EditSession {
    current: Schedule,
    /// Last value known to match the service (or the initial value).
    baseline: Schedule,
    history: Vec<Schedule>,
    future: Vec<Schedule>,
    validation_errors: Vec<ValidationError>,
    server_errors: BTreeMap<String, String>,
}

impl EditSession {
    /// Start editing `schedule`.
    pub fn new(schedule: Schedule) -> Self {
        Self {
            baseline: schedule.clone(),
            current: schedule,
            history: Vec::new(),
            future: Vec::new(),
            validation_errors: Vec::new(),
            server_errors: BTreeMap::new(),
        }
    }

    /// Start editing a blank, unsaved schedule.
    pub fn blank() -> Self {
        Self::new(Schedule::new(""))
    }

    pub fn current(&self) -> &Schedule {
        &self.current
    }

    /// Whether the current value differs from the last saved one.
    pub fn is_dirty(&self) -> bool {
        self.current != self.baseline
    }

    // ==================== Editing ====================

    /// Apply an edit to the current schedule.
    ///
    /// On error the session is left untouched.
    pub fn apply(&mut self, edit: &Edit) -> EditResult<&Schedule> {
        let next = edit.apply(&self.current)?;
        Ok(self.commit(next))
    }

    /// Replace the current schedule with the result of `f`.
    pub fn apply_with<F>(&mut self, f: F) -> EditResult<&Schedule>
    where
        F: FnOnce(&Schedule) -> EditResult<Schedule>,
    {
        let next = f(&self.current)?;
        Ok(self.commit(next))
    }

    fn commit(&mut self, next: Schedule) -> &Schedule {
        let previous = std::mem::replace(&mut self.current, next);
        self.history.push(previous);
        if self.history.len() > MAX_HISTORY {
            self.history.remove(0);
        }
        self.future.clear();
        &self.current
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Step back one edit. Returns `false` if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                let undone = std::mem::replace(&mut self.current, previous);
                self.future.push(undone);
                true
            }
            None => false,
        }
    }

    /// Re-apply the last undone edit. Returns `false` if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.future.pop() {
            Some(next) => {
                let previous = std::mem::replace(&mut self.current, next);
                self.history.push(previous);
                true
            }
            None => false,
        }
    }

    // ==================== Validation ====================

    /// Validate the current schedule and remember the result for
    /// [`field_error`](Self::field_error).
    pub fn validate(&mut self) -> &[ValidationError] {
        self.validation_errors = validate(&self.current);
        &self.validation_errors
    }

    pub fn validation_errors(&self) -> &[ValidationError] {
        &self.validation_errors
    }

    /// Per-field messages returned by the service on the last failed save.
    pub fn server_errors(&self) -> &BTreeMap<String, String> {
        &self.server_errors
    }

    /// Message to show next to `field`: a local validation error first,
    /// otherwise a server-side one.
    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.validation_errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
            .or_else(|| self.server_errors.get(field).map(String::as_str))
    }

    // ==================== Submission ====================

    /// Validate, then create or update the schedule through `gateway`.
    ///
    /// On success the current value is replaced by the service's response
    /// (which carries assigned ids and server-computed fields) and becomes
    /// the new baseline; undo history is cleared. On failure the edited
    /// value is kept.
    pub async fn submit<G>(&mut self, gateway: &G) -> Result<&Schedule, SubmitError>
    where
        G: ScheduleGateway + ?Sized,
    {
        let errors = self.validate().to_vec();
        if !errors.is_empty() {
            log::debug!("Submission blocked by {} validation errors", errors.len());
            return Err(SubmitError::Validation(errors));
        }

        let result = match self.current.id {
            Some(id) => gateway.update(id, &self.current).await,
            None => gateway.create(&self.current).await,
        };

        match result {
            Ok(saved) => {
                log::info!("Saved schedule {:?}", saved.id);
                self.server_errors.clear();
                self.baseline = saved.clone();
                self.current = saved;
                self.history.clear();
                self.future.clear();
                Ok(&self.current)
            }
            Err(e) => {
                log::warn!("Failed to save schedule: {}", e);
                self.server_errors = e.field_errors().cloned().unwrap_or_default();
                Err(SubmitError::Gateway(e))
            }
        }
    }

    /// Replace the session's value with a freshly fetched copy, dropping
    /// local edits and history.
    pub fn reset_to(&mut self, schedule: Schedule) {
        *self = Self::new(schedule);
    }
}
