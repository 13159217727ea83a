use std::collections::BTreeMap;

/// Field name to the list of messages the API returned for it.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Errors that can occur while talking to the Calisero API or preparing a call to it.
#[derive(Debug, thiserror::Error)]
pub enum CaliseroError {
    /// Bad input shape, either caught locally or reported by the API (HTTP 422).
    #[error("validation error: {message}")]
    Validation { message: String, errors: FieldErrors },
    /// HTTP 429. `retry_after` is in seconds when the API sent one.
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
    },
    /// HTTP 401
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// HTTP 403
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// HTTP 404
    #[error("not found: {0}")]
    NotFound(String),
    /// HTTP 5xx
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// Any other non-success answer from the API.
    #[error("api error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        request_id: Option<String>,
    },
    /// Transport failure before a response was received.
    #[error("http error: {0}")]
    Http(String),
    /// The API answered but the body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// A required setting is missing.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CaliseroError {
    /// Local validation failure without per-field details.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors: FieldErrors::new(),
        }
    }

    /// Whether a client may retry the same call later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server { .. } | Self::Http(_)
        )
    }
}

/// Reasons a webhook request is rejected before any event is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("Webhook secret not configured")]
    SecretNotConfigured,
    #[error("Missing webhook signature")]
    MissingSignature,
    #[error("Invalid webhook signature")]
    InvalidSignature,
    #[error("invalid_webhook_token")]
    InvalidToken,
}

/// HTTP status code for web responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok = 200,
    Unauthorized = 401,
    InternalServerError = 500,
}

impl HttpStatus {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl WebhookError {
    /// Missing server configuration is a 500, everything else is an authentication failure.
    pub fn status(&self) -> HttpStatus {
        match self {
            Self::SecretNotConfigured => HttpStatus::InternalServerError,
            Self::MissingSignature | Self::InvalidSignature | Self::InvalidToken => {
                HttpStatus::Unauthorized
            }
        }
    }
}
