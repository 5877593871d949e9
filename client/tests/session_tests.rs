mod support;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use event_scheduler::api::{
    BlockItem, ErrorPayload, OptimizationResult, PublicFormat, PublicProjection, ScheduleAnalysis,
    ScheduleId, SchedulePage, VolunteerSchedule,
};
use event_scheduler::gateway::{
    ErrorContext, GatewayError, GatewayErrorKind, GatewayResult, LocalGateway, ScheduleGateway,
};
use event_scheduler::models::{Block, Schedule};
use event_scheduler::services::editor::{BlockPatch, Edit, SchedulePatch};
use event_scheduler::{EditSession, SubmitError};

use support::festival;

/// Gateway that rejects every save with a field-level error and counts calls.
#[derive(Default)]
struct RejectingGateway {
    calls: AtomicUsize,
}

impl RejectingGateway {
    fn rejection(operation: &str) -> GatewayError {
        let mut details = BTreeMap::new();
        details.insert("name".to_string(), "Name already taken".to_string());
        GatewayError::bad_request(
            400,
            ErrorPayload {
                error: "Invalid schedule".into(),
                details: Some(details),
            },
            ErrorContext::new(operation),
        )
    }
}

#[async_trait]
impl ScheduleGateway for RejectingGateway {
    async fn list(&self, page: u32, page_size: u32) -> GatewayResult<SchedulePage> {
        Ok(SchedulePage::empty(page, page_size))
    }

    async fn get(&self, id: ScheduleId) -> GatewayResult<Schedule> {
        Err(GatewayError::not_found("schedule", id, "get_schedule"))
    }

    async fn create(&self, _schedule: &Schedule) -> GatewayResult<Schedule> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Self::rejection("create_schedule"))
    }

    async fn update(&self, _id: ScheduleId, _schedule: &Schedule) -> GatewayResult<Schedule> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Self::rejection("update_schedule"))
    }

    async fn delete(&self, _id: ScheduleId) -> GatewayResult<()> {
        Ok(())
    }

    async fn arrange_items(&self, _id: ScheduleId, _items: &[BlockItem]) -> GatewayResult<()> {
        Ok(())
    }

    async fn analyze(&self, _schedule: &Schedule) -> GatewayResult<ScheduleAnalysis> {
        Ok(ScheduleAnalysis::default())
    }

    async fn optimize(&self, _schedule: &Schedule) -> GatewayResult<OptimizationResult> {
        Ok(OptimizationResult::default())
    }

    async fn get_public(
        &self,
        _id: ScheduleId,
        _format: PublicFormat,
    ) -> GatewayResult<PublicProjection> {
        Ok(PublicProjection::Text(String::new()))
    }

    async fn get_volunteer(&self, id: ScheduleId) -> GatewayResult<VolunteerSchedule> {
        Err(GatewayError::not_found("schedule", id, "get_volunteer_schedule"))
    }

    async fn health_check(&self) -> GatewayResult<bool> {
        Ok(true)
    }
}

#[tokio::test]
async fn test_invalid_schedule_never_reaches_gateway() {
    let gateway = RejectingGateway::default();
    let mut session = EditSession::blank();

    let err = session.submit(&gateway).await.unwrap_err();
    match err {
        SubmitError::Validation(errors) => {
            assert!(errors.iter().any(|e| e.field == "name"));
            assert!(errors.iter().any(|e| e.field == "start_date"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.field_error("end_date"), Some("End date is required"));
}

#[tokio::test]
async fn test_create_then_update_reconciles() {
    let gateway = LocalGateway::new();
    let mut session = EditSession::new(festival());
    assert!(!session.is_dirty());

    let saved = session.submit(&gateway).await.unwrap().clone();
    let id = saved.id.expect("assigned id");
    assert!(saved.blocks.iter().all(|b| b.id.is_some()));
    assert_eq!(saved.total_duration, Some(150));
    assert!(saved.risk_score.is_some());
    assert!(!session.can_undo());
    assert_eq!(gateway.schedule_count(), 1);

    session
        .apply(&Edit::PatchBlock {
            index: 2,
            patch: BlockPatch {
                duration: Some(30),
                ..Default::default()
            },
        })
        .unwrap();
    assert!(session.is_dirty());

    let updated = session.submit(&gateway).await.unwrap();
    assert_eq!(updated.id, Some(id));
    assert_eq!(updated.total_duration, Some(165));
    assert_eq!(gateway.schedule_count(), 1);
    assert!(!session.is_dirty());
}

#[tokio::test]
async fn test_gateway_failure_keeps_edits() {
    let gateway = RejectingGateway::default();
    let mut session = EditSession::new(festival());
    session
        .apply(&Edit::PatchSchedule(SchedulePatch {
            name: Some("Winter Fest".into()),
            ..Default::default()
        }))
        .unwrap();

    let err = session.submit(&gateway).await.unwrap_err();
    match &err {
        SubmitError::Gateway(e) => {
            assert_eq!(e.kind(), GatewayErrorKind::BadRequest);
            assert_eq!(e.user_message(), "Invalid schedule");
        }
        other => panic!("expected gateway error, got {:?}", other),
    }

    assert_eq!(session.current().name, "Winter Fest");
    assert_eq!(session.field_error("name"), Some("Name already taken"));
    assert!(session.can_undo());

    // still re-submittable
    let _ = session.submit(&gateway).await;
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unreachable_service_keeps_edits() {
    let gateway = LocalGateway::new();
    gateway.set_healthy(false);

    let mut session = EditSession::new(festival());
    session.apply(&Edit::AddBlock(Block::new("Encore", 20))).unwrap();

    let err = session.submit(&gateway).await.unwrap_err();
    assert!(matches!(
        &err,
        SubmitError::Gateway(e) if e.kind() == GatewayErrorKind::Unreachable && e.is_retryable()
    ));
    assert_eq!(session.current().blocks.len(), 4);
    assert!(session.server_errors().is_empty());

    gateway.set_healthy(true);
    let saved = session.submit(&gateway).await.unwrap();
    assert!(saved.id.is_some());
}

#[tokio::test]
async fn test_update_of_deleted_schedule_is_bad_request() {
    let gateway = LocalGateway::new();
    let mut session = EditSession::new(festival());
    let id = session.submit(&gateway).await.unwrap().id.unwrap();
    gateway.delete(id).await.unwrap();

    let err = session.submit(&gateway).await.unwrap_err();
    match err {
        SubmitError::Gateway(e) => assert_eq!(e.status(), Some(404)),
        other => panic!("expected gateway error, got {:?}", other),
    }
}
