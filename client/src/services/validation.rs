//! Schedule validation.
//!
//! Every rule is evaluated independently and all violations are collected;
//! nothing short-circuits. An empty list means the schedule may be submitted.
//! The validator is pure: it never mutates its input and performs no I/O.

use serde::{Deserialize, Serialize};

use crate::models::{Block, BlockItem, Equipment, RiskFactor, Schedule};

/// Upper bound for a schedule's buffer time, in minutes.
pub const MAX_BUFFER_TIME: i64 = 180;

/// A single user-correctable problem, addressed by field path
/// (`name`, `end_date`, `blocks[2].duration`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn is_unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Validate a whole schedule.
///
/// # Arguments
/// * `schedule` - The schedule to check
///
/// # Returns
/// All violations found, in field order. Empty when valid.
pub fn validate(schedule: &Schedule) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if schedule.name.trim().is_empty() {
        errors.push(ValidationError::new("name", "Name is required"));
    }

    if schedule.start_date.is_none() {
        errors.push(ValidationError::new("start_date", "Start date is required"));
    }
    if schedule.end_date.is_none() {
        errors.push(ValidationError::new("end_date", "End date is required"));
    }
    if let (Some(start), Some(end)) = (schedule.start_date, schedule.end_date) {
        if start >= end {
            errors.push(ValidationError::new(
                "end_date",
                "End date must be after start date",
            ));
        }
    }

    if let Some(buffer) = schedule.buffer_time {
        if !(0..=MAX_BUFFER_TIME).contains(&buffer) {
            errors.push(ValidationError::new(
                "buffer_time",
                format!("Buffer time must be between 0 and {} minutes", MAX_BUFFER_TIME),
            ));
        }
    }

    for (i, block) in schedule.blocks.iter().enumerate() {
        check_block(block, &format!("blocks[{}].", i), &mut errors);
    }

    errors
}

/// Validate a single block in isolation, with paths relative to the block
/// (`name`, `items[0].duration`, ...).
pub fn validate_block(block: &Block) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    check_block(block, "", &mut errors);
    errors
}

/// Whether `errors` contains an entry for `field`.
pub fn has_error(errors: &[ValidationError], field: &str) -> bool {
    errors.iter().any(|e| e.field == field)
}

/// First message recorded for `field`, if any.
pub fn error_for<'a>(errors: &'a [ValidationError], field: &str) -> Option<&'a str> {
    errors
        .iter()
        .find(|e| e.field == field)
        .map(|e| e.message.as_str())
}

fn check_block(block: &Block, prefix: &str, errors: &mut Vec<ValidationError>) {
    if block.name.trim().is_empty() {
        errors.push(ValidationError::new(
            format!("{}name", prefix),
            "Block name is required",
        ));
    }

    match block.duration {
        None => errors.push(ValidationError::new(
            format!("{}duration", prefix),
            "Duration is required",
        )),
        Some(d) if d <= 0 => errors.push(ValidationError::new(
            format!("{}duration", prefix),
            "Duration must be greater than 0",
        )),
        Some(_) => {}
    }

    if let Some(c) = block.complexity {
        if !is_unit_interval(c) {
            errors.push(ValidationError::new(
                format!("{}complexity", prefix),
                "Complexity must be between 0 and 1",
            ));
        }
    }

    for (field, value) in [
        ("max_participants", block.max_participants),
        ("required_staff", block.required_staff),
        ("tech_break_duration", block.tech_break_duration),
    ] {
        if matches!(value, Some(v) if v < 0) {
            errors.push(ValidationError::new(
                format!("{}{}", prefix, field),
                "Value cannot be negative",
            ));
        }
    }

    for (k, equipment) in block.equipment.iter().enumerate() {
        check_equipment(equipment, &format!("{}equipment[{}].", prefix, k), errors);
    }

    for (k, risk) in block.risk_factors.iter().enumerate() {
        check_risk(risk, &format!("{}risk_factors[{}].", prefix, k), errors);
    }

    for (j, item) in block.items.iter().enumerate() {
        check_item(item, &format!("{}items[{}].", prefix, j), errors);
    }
}

fn check_item(item: &BlockItem, prefix: &str, errors: &mut Vec<ValidationError>) {
    // Item name may stay empty; duration, when given, has to be positive.
    if matches!(item.duration, Some(d) if d <= 0) {
        errors.push(ValidationError::new(
            format!("{}duration", prefix),
            "Duration must be greater than 0",
        ));
    }
    for (k, equipment) in item.equipment.iter().enumerate() {
        check_equipment(equipment, &format!("{}equipment[{}].", prefix, k), errors);
    }
}

fn check_equipment(equipment: &Equipment, prefix: &str, errors: &mut Vec<ValidationError>) {
    if matches!(equipment.setup_time, Some(t) if t < 0) {
        errors.push(ValidationError::new(
            format!("{}setup_time", prefix),
            "Setup time cannot be negative",
        ));
    }
    if matches!(equipment.complexity_score, Some(c) if !is_unit_interval(c)) {
        errors.push(ValidationError::new(
            format!("{}complexity_score", prefix),
            "Complexity score must be between 0 and 1",
        ));
    }
}

fn check_risk(risk: &RiskFactor, prefix: &str, errors: &mut Vec<ValidationError>) {
    if !is_unit_interval(risk.probability) {
        errors.push(ValidationError::new(
            format!("{}probability", prefix),
            "Probability must be between 0 and 1",
        ));
    }
    if !is_unit_interval(risk.impact) {
        errors.push(ValidationError::new(
            format!("{}impact", prefix),
            "Impact must be between 0 and 1",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_iso8601, RiskType};

    fn valid_schedule() -> Schedule {
        Schedule::new("Fest").with_dates(
            parse_iso8601("2024-06-01T10:00Z").unwrap(),
            parse_iso8601("2024-06-01T22:00Z").unwrap(),
        )
    }

    #[test]
    fn test_valid_schedule_has_no_errors() {
        let schedule = valid_schedule().with_block(Block::new("Setup", 45).with_complexity(0.5));
        assert!(validate(&schedule).is_empty());
    }

    #[test]
    fn test_end_before_start_reports_end_date_only() {
        let schedule = Schedule::new("Fest").with_dates(
            parse_iso8601("2024-06-01T10:00Z").unwrap(),
            parse_iso8601("2024-06-01T09:00Z").unwrap(),
        );
        let errors = validate(&schedule);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "end_date");
    }

    #[test]
    fn test_equal_dates_rejected() {
        let at = parse_iso8601("2024-06-01T10:00Z").unwrap();
        let schedule = Schedule::new("Fest").with_dates(at, at);
        assert!(has_error(&validate(&schedule), "end_date"));
    }

    #[test]
    fn test_missing_dates_and_blank_name() {
        let schedule = Schedule::new("   ");
        let errors = validate(&schedule);
        assert!(has_error(&errors, "name"));
        assert!(has_error(&errors, "start_date"));
        assert!(has_error(&errors, "end_date"));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_buffer_time_bounds() {
        let mut schedule = valid_schedule();
        schedule.buffer_time = Some(181);
        assert!(has_error(&validate(&schedule), "buffer_time"));
        schedule.buffer_time = Some(-1);
        assert!(has_error(&validate(&schedule), "buffer_time"));
        schedule.buffer_time = Some(180);
        assert!(validate(&schedule).is_empty());
        schedule.buffer_time = None;
        assert!(validate(&schedule).is_empty());
    }

    #[test]
    fn test_block_paths_are_indexed() {
        let mut bad = Block::new("", 0);
        bad.complexity = Some(1.5);
        let schedule = valid_schedule()
            .with_block(Block::new("Fine", 10))
            .with_block(bad);
        let errors = validate(&schedule);
        assert!(has_error(&errors, "blocks[1].name"));
        assert!(has_error(&errors, "blocks[1].duration"));
        assert!(has_error(&errors, "blocks[1].complexity"));
        assert!(!errors.iter().any(|e| e.field.starts_with("blocks[0]")));
    }

    #[test]
    fn test_missing_block_duration() {
        let block = Block {
            name: "No length".into(),
            ..Default::default()
        };
        assert_eq!(
            error_for(&validate_block(&block), "duration"),
            Some("Duration is required")
        );
    }

    #[test]
    fn test_nested_rules() {
        let mut equipment = Equipment::new("Crane");
        equipment.setup_time = Some(-5);
        let block = Block::new("Stage", 60)
            .with_risk_factor(RiskFactor::new(RiskType::Weather, 1.2, 0.5))
            .with_item(BlockItem {
                duration: Some(0),
                ..Default::default()
            })
            .with_equipment(equipment);
        let errors = validate_block(&block);
        assert!(has_error(&errors, "risk_factors[0].probability"));
        assert!(!has_error(&errors, "risk_factors[0].impact"));
        assert!(!has_error(&errors, "items[0].name"));
        assert!(has_error(&errors, "items[0].duration"));
        assert!(has_error(&errors, "equipment[0].setup_time"));
    }

    #[test]
    fn test_validate_does_not_mutate() {
        let schedule = valid_schedule().with_block(Block::new("", -3));
        let before = schedule.clone();
        let _ = validate(&schedule);
        assert_eq!(schedule, before);
    }
}
