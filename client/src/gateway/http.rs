//! REST gateway for the remote scheduling service.
//!
//! Talks JSON over HTTP with `reqwest` and maps every failure onto
//! [`GatewayError`]:
//! - transport failures (refused connection, DNS, timeout) → `Unreachable`
//! - a request that could not be built → `RequestSetup`
//! - an error status → `BadRequest`, with the `{ error, details }` payload
//!   decoded when present
//! - a success body of the wrong shape → `Decode`, naming the offending path

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::config::HttpSettings;
use super::error::{ErrorContext, GatewayError, GatewayResult};
use super::traits::ScheduleGateway;
use crate::api::{
    ArrangeItemsRequest, BlockItem, ErrorPayload, OptimizationResult, PublicFormat,
    PublicProjection, Schedule, ScheduleAnalysis, ScheduleId, SchedulePage, VolunteerSchedule,
};

/// REST client implementation of [`ScheduleGateway`].
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

fn classify_transport(err: reqwest::Error, context: ErrorContext) -> GatewayError {
    if err.is_builder() {
        GatewayError::request_setup(err.to_string(), context)
    } else if err.is_decode() {
        GatewayError::decode(err.to_string(), context)
    } else {
        // connect, timeout, request and body errors all mean no usable response
        GatewayError::unreachable(err.to_string(), context)
    }
}

/// Body of an error response; a body that cannot be read is logged and
/// treated as empty so the status alone classifies the error.
fn error_body<E: std::fmt::Display>(body: Result<String, E>, context: &ErrorContext) -> String {
    body.unwrap_or_else(|e| {
        log::warn!("Failed to read error body {}: {}", context, e);
        String::new()
    })
}

impl HttpGateway {
    /// Build a gateway from settings.
    ///
    /// # Returns
    /// * `Ok(HttpGateway)` - Ready to use; no request is sent yet
    /// * `Err(GatewayError::RequestSetup)` - If the HTTP client cannot be built
    pub fn new(settings: &HttpSettings) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| {
                GatewayError::request_setup(
                    format!("Failed to build HTTP client: {}", e),
                    ErrorContext::new("build_client"),
                )
            })?;

        Ok(Self {
            client,
            base_url: settings.normalized_base_url().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the response if its status is a success.
    async fn send(
        &self,
        request: RequestBuilder,
        context: &ErrorContext,
    ) -> GatewayResult<Response> {
        let response = request.send().await.map_err(|e| {
            log::warn!("Scheduling service unreachable {}: {}", context, e);
            classify_transport(e, context.clone())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = error_body(response.text().await, context);
        let error = Self::rejection(status, &body, context.clone());
        log::warn!("Scheduling service rejected request: {}", error);
        Err(error)
    }

    /// Turn an error status and body into a `BadRequest`.
    fn rejection(status: StatusCode, body: &str, context: ErrorContext) -> GatewayError {
        let payload = serde_json::from_str::<ErrorPayload>(body).unwrap_or_else(|_| ErrorPayload {
            error: match body.trim() {
                "" => status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string(),
                text => text.to_string(),
            },
            details: None,
        });
        GatewayError::bad_request(status.as_u16(), payload, context)
    }

    async fn read_json<T: DeserializeOwned>(
        response: Response,
        context: &ErrorContext,
    ) -> GatewayResult<T> {
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(e, context.clone()))?;

        let deserializer = &mut serde_json::Deserializer::from_str(&body);
        serde_path_to_error::deserialize(deserializer).map_err(|e| {
            let message = format!("{} at '{}'", e.inner(), e.path());
            log::warn!("Undecodable response {}: {}", context, message);
            GatewayError::decode(message, context.clone())
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        context: ErrorContext,
    ) -> GatewayResult<T> {
        let response = self.send(self.client.get(self.url(path)), &context).await?;
        Self::read_json(response, &context).await
    }

    async fn send_json<B, T>(
        &self,
        request: RequestBuilder,
        body: &B,
        context: ErrorContext,
    ) -> GatewayResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(request.json(body), &context).await?;
        Self::read_json(response, &context).await
    }
}

fn schedule_context(operation: &str, id: ScheduleId) -> ErrorContext {
    ErrorContext::new(operation)
        .with_entity("schedule")
        .with_entity_id(id)
}

#[async_trait]
impl ScheduleGateway for HttpGateway {
    async fn list(&self, page: u32, page_size: u32) -> GatewayResult<SchedulePage> {
        let path = format!("/schedules?page={}&page_size={}", page, page_size);
        self.get_json(&path, ErrorContext::new("list_schedules"))
            .await
    }

    async fn get(&self, id: ScheduleId) -> GatewayResult<Schedule> {
        self.get_json(
            &format!("/schedules/{}", id),
            schedule_context("get_schedule", id),
        )
        .await
    }

    async fn create(&self, schedule: &Schedule) -> GatewayResult<Schedule> {
        let context = ErrorContext::new("create_schedule").with_entity("schedule");
        let created: Schedule = self
            .send_json(self.client.post(self.url("/schedules")), schedule, context)
            .await?;
        log::info!("Created schedule {:?} ('{}')", created.id, created.name);
        Ok(created)
    }

    async fn update(&self, id: ScheduleId, schedule: &Schedule) -> GatewayResult<Schedule> {
        let request = self.client.put(self.url(&format!("/schedules/{}", id)));
        self.send_json(request, schedule, schedule_context("update_schedule", id))
            .await
    }

    async fn delete(&self, id: ScheduleId) -> GatewayResult<()> {
        let request = self.client.delete(self.url(&format!("/schedules/{}", id)));
        self.send(request, &schedule_context("delete_schedule", id))
            .await?;
        log::info!("Deleted schedule {}", id);
        Ok(())
    }

    async fn arrange_items(
        &self,
        schedule_id: ScheduleId,
        items: &[BlockItem],
    ) -> GatewayResult<()> {
        let body = ArrangeItemsRequest {
            schedule_id,
            items: items.to_vec(),
        };
        let request = self.client.post(self.url("/schedules/arrange")).json(&body);
        self.send(request, &schedule_context("arrange_items", schedule_id))
            .await?;
        Ok(())
    }

    async fn analyze(&self, schedule: &Schedule) -> GatewayResult<ScheduleAnalysis> {
        let request = self.client.post(self.url("/schedules/analyze"));
        self.send_json(request, schedule, ErrorContext::new("analyze_schedule"))
            .await
    }

    async fn optimize(&self, schedule: &Schedule) -> GatewayResult<OptimizationResult> {
        let request = self.client.post(self.url("/schedules/optimize"));
        self.send_json(request, schedule, ErrorContext::new("optimize_schedule"))
            .await
    }

    async fn get_public(
        &self,
        id: ScheduleId,
        format: PublicFormat,
    ) -> GatewayResult<PublicProjection> {
        let context = schedule_context("get_public_schedule", id);
        let path = format!("/schedules/{}/public?format={}", id, format.as_str());
        let response = self.send(self.client.get(self.url(&path)), &context).await?;

        match format {
            PublicFormat::Json => Self::read_json(response, &context).await,
            PublicFormat::Text => response
                .text()
                .await
                .map(PublicProjection::Text)
                .map_err(|e| classify_transport(e, context)),
        }
    }

    async fn get_volunteer(&self, id: ScheduleId) -> GatewayResult<VolunteerSchedule> {
        self.get_json(
            &format!("/schedules/{}/volunteer", id),
            schedule_context("get_volunteer_schedule", id),
        )
        .await
    }

    async fn health_check(&self) -> GatewayResult<bool> {
        let context = ErrorContext::new("health_check");
        let response = self
            .client
            .get(self.url("/schedules?page=1&page_size=1"))
            .send()
            .await
            .map_err(|e| classify_transport(e, context))?;
        Ok(response.status().is_success())
    }
}
