//! # Calisero Core
//!
//! Core traits and types for the Calisero SMS integration.
//!
//! This crate provides the building blocks every other crate shares:
//! - [`CaliseroApi`] trait, the REST contract of the provider
//! - [`CaliseroError`] and [`WebhookError`], the error taxonomy
//! - [`WebhookPayload`] and [`WebhookEvent`] for delivery reports
//! - [`EventBus`] for fanning events out to listeners
//! - [`WebhookResponse`], a framework-agnostic HTTP answer
//!
//! ## Example
//!
//! ```rust,ignore
//! use calisero_core::{CaliseroApi, CreateMessageRequest};
//!
//! // Any transport implements CaliseroApi
//! let response = api.create_message(&CreateMessageRequest {
//!     recipient: "+40712345678".into(),
//!     body: "Hello world!".into(),
//!     ..Default::default()
//! }).await?;
//! ```

pub mod api;
pub mod error;
pub mod events;
pub mod payload;
pub mod validation;

pub use api::*;
pub use error::*;
pub use events::{EventBus, EventListener, TracingListener, WebhookEvent};
pub use payload::{RawFields, StatusReport, WebhookPayload};

/// Lightweight header representation to avoid tying the core to any HTTP framework.
pub type Headers = Vec<(String, String)>;

/// Case-insensitive header lookup.
pub fn header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Resolves the public URL the webhook endpoint is mounted at.
pub trait WebhookRoute: Send + Sync {
    /// `None` when the route is not registered or its URL cannot be built.
    fn url(&self) -> Option<String>;
}

/// Route resolver for processes that do not serve the webhook themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnmountedRoute;

impl WebhookRoute for UnmountedRoute {
    fn url(&self) -> Option<String> {
        None
    }
}

/// Generic webhook response that can be converted to any framework's response type
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookResponse {
    pub status: HttpStatus,
    pub body: String,
    pub content_type: String,
}

impl WebhookResponse {
    pub fn ok() -> Self {
        Self::json(HttpStatus::Ok, serde_json::json!({ "ok": true }))
    }

    pub fn error(status: HttpStatus, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    pub fn rejected(error: &WebhookError) -> Self {
        Self::error(error.status(), &error.to_string())
    }

    fn json(status: HttpStatus, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            content_type: "application/json".to_string(),
        }
    }
}
