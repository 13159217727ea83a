use axum::{
    extract::{RawQuery, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    response::IntoResponse,
    routing::post,
    Router,
};
use bytes::Bytes;
use calisero_core::{Headers, WebhookRoute};
use calisero_webhook::{HeaderConverter, ResponseConverter, WebhookProcessor};

#[derive(Clone)]
pub struct AppState {
    pub processor: WebhookProcessor,
}

/// Axum-specific header converter
pub struct AxumHeaderConverter;

impl HeaderConverter for AxumHeaderConverter {
    type HeaderType = HeaderMap;

    fn to_generic_headers(headers: &Self::HeaderType) -> Headers {
        headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

/// Axum-specific response converter
pub struct AxumResponseConverter;

impl ResponseConverter for AxumResponseConverter {
    type ResponseType = axum::response::Response;

    fn from_webhook_response(response: calisero_core::WebhookResponse) -> Self::ResponseType {
        let status = axum::http::StatusCode::from_u16(response.status.as_u16())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);

        (status, [(CONTENT_TYPE, response.content_type)], response.body).into_response()
    }
}

/// Delivery-report handler: POST /<webhook path>
pub async fn webhook(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let generic_headers = AxumHeaderConverter::to_generic_headers(&headers);
    let response = state
        .processor
        .process_webhook(generic_headers, query.as_deref(), &body);
    AxumResponseConverter::from_webhook_response(response)
}

/// `calisero/webhook` and `/calisero/webhook/` both become `/calisero/webhook`.
pub fn route_path(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}

/// Router serving the webhook on `path`.
pub fn webhook_router(path: &str, processor: WebhookProcessor) -> Router {
    Router::new()
        .route(&route_path(path), post(webhook))
        .with_state(AppState { processor })
}

/// Public URL of a mounted webhook router.
#[derive(Debug, Clone)]
pub struct MountedRoute {
    public_url: String,
    path: String,
}

impl MountedRoute {
    /// `public_url` is where the router's root is reachable from the outside.
    pub fn new(public_url: impl Into<String>, path: &str) -> Self {
        Self {
            public_url: public_url.into(),
            path: route_path(path),
        }
    }

    /// The router was nested under `prefix`.
    pub fn nested(mut self, prefix: &str) -> Self {
        let prefix = prefix.trim_matches('/');
        if !prefix.is_empty() {
            self.path = format!("/{}{}", prefix, self.path);
        }
        self
    }
}

impl WebhookRoute for MountedRoute {
    fn url(&self) -> Option<String> {
        let base = self.public_url.trim_end_matches('/');
        if base.is_empty() {
            return None;
        }
        Some(format!("{}{}", base, self.path))
    }
}
