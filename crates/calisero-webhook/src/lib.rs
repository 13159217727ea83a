//! Framework-agnostic processing of Calisero delivery-report webhooks.
//!
//! The flow for one request is: guards ([`verify`]) → decode ([`WebhookPayload`]) →
//! [`classify`] → publish on the [`EventBus`] → `200 {"ok":true}`.

pub mod classify;
pub mod verify;

use std::sync::Arc;

use calisero_core::{
    EventBus, Headers, WebhookError, WebhookEvent, WebhookPayload, WebhookResponse,
};
use tracing::debug;

pub use classify::{classify, CreditThresholds};
pub use verify::{
    sign, signature_matches, SignatureVerifier, TokenVerifier, WebhookRequest, WebhookVerifier,
    SIGNATURE_HEADER, TOKEN_PARAM,
};

/// Framework-agnostic webhook processor that handles the core webhook logic
#[derive(Clone)]
pub struct WebhookProcessor {
    guards: Arc<Vec<Arc<dyn WebhookVerifier>>>,
    thresholds: CreditThresholds,
    events: EventBus,
}

impl WebhookProcessor {
    /// A processor without guards or thresholds.
    pub fn new(events: EventBus) -> Self {
        Self {
            guards: Arc::new(Vec::new()),
            thresholds: CreditThresholds::default(),
            events,
        }
    }

    /// Append a guard. Guards run in the order they were added.
    pub fn with_guard(mut self, guard: Arc<dyn WebhookVerifier>) -> Self {
        let mut g = (*self.guards).clone();
        g.push(guard);
        self.guards = Arc::new(g);
        self
    }

    pub fn with_thresholds(mut self, thresholds: CreditThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> &CreditThresholds {
        &self.thresholds
    }

    /// Process an incoming webhook request and return a framework-agnostic response
    pub fn process_webhook(
        &self,
        headers: Headers,
        query: Option<&str>,
        body: &[u8],
    ) -> WebhookResponse {
        match self.process_webhook_internal(&headers, query, body) {
            Ok(_) => WebhookResponse::ok(),
            Err(e) => WebhookResponse::rejected(&e),
        }
    }

    fn process_webhook_internal(
        &self,
        headers: &Headers,
        query: Option<&str>,
        body: &[u8],
    ) -> Result<Vec<WebhookEvent>, WebhookError> {
        let request = WebhookRequest {
            headers,
            query,
            body,
        };
        for guard in self.guards.iter() {
            guard.verify(&request)?;
        }

        let payload = WebhookPayload::from_slice(body);
        let events = classify(&payload, &self.thresholds);
        debug!(
            status = payload.status(),
            events = events.len(),
            "webhook classified"
        );

        for event in &events {
            self.events.publish(event);
        }
        Ok(events)
    }
}

/// Helper trait for framework adapters to convert headers
pub trait HeaderConverter {
    type HeaderType;

    fn to_generic_headers(headers: &Self::HeaderType) -> Headers;
}

/// Helper trait for framework adapters to convert responses
pub trait ResponseConverter {
    type ResponseType;

    fn from_webhook_response(response: WebhookResponse) -> Self::ResponseType;
}
