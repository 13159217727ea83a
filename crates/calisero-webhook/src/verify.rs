//! Webhook authentication.
//!
//! Two guards can protect the endpoint, alone or together:
//!
//! - [`SignatureVerifier`]: Calisero signs the raw body with HMAC-SHA256 and sends the
//!   lowercase hex digest in `X-Webhook-Signature`.
//! - [`TokenVerifier`]: a shared token appended to the callback URL as `?token=`.
//!
//! Both compare in constant time. The signature must be computed on the raw body
//! bytes, never on re-serialized JSON.

use calisero_core::{header, Headers, WebhookError};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{error, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
pub const TOKEN_PARAM: &str = "token";

/// The parts of an inbound HTTP request the guards look at.
#[derive(Debug, Clone, Copy)]
pub struct WebhookRequest<'a> {
    pub headers: &'a Headers,
    /// Raw query string, without the leading `?`.
    pub query: Option<&'a str>,
    pub body: &'a [u8],
}

/// A guard in front of the webhook handler.
pub trait WebhookVerifier: Send + Sync {
    fn verify(&self, request: &WebhookRequest<'_>) -> Result<(), WebhookError>;
}

fn digest(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(err) => {
            error!(error = %err, "Failed to create HMAC instance");
            return None;
        }
    };
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Lowercase hex HMAC-SHA256 of `body` keyed with `secret`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    digest(secret, body).unwrap_or_default()
}

/// Constant-time comparison of `signature` with the expected signature of `body`.
pub fn signature_matches(secret: &str, body: &[u8], signature: &str) -> bool {
    match digest(secret, body) {
        Some(expected) => expected.as_bytes().ct_eq(signature.as_bytes()).into(),
        None => false,
    }
}

/// HMAC signature guard. Fails closed: without a secret every request is refused.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: Option<String>,
}

impl SignatureVerifier {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }
}

impl WebhookVerifier for SignatureVerifier {
    fn verify(&self, request: &WebhookRequest<'_>) -> Result<(), WebhookError> {
        let Some(secret) = self.secret.as_deref() else {
            warn!("webhook rejected: secret not configured");
            return Err(WebhookError::SecretNotConfigured);
        };

        let signature = header(request.headers, SIGNATURE_HEADER)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                warn!("webhook rejected: missing signature header");
                WebhookError::MissingSignature
            })?;

        if !signature_matches(secret, request.body, signature) {
            warn!("webhook rejected: signature mismatch");
            return Err(WebhookError::InvalidSignature);
        }

        Ok(())
    }
}

/// Query-string token guard. Without a configured token it lets everything through.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    token: Option<String>,
}

impl TokenVerifier {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
        }
    }
}

impl WebhookVerifier for TokenVerifier {
    fn verify(&self, request: &WebhookRequest<'_>) -> Result<(), WebhookError> {
        let Some(expected) = self.token.as_deref() else {
            return Ok(());
        };

        let provided = request.query.and_then(query_token).unwrap_or_default();
        let matches: bool = expected.as_bytes().ct_eq(provided.as_bytes()).into();

        if provided.is_empty() || !matches {
            warn!("webhook rejected: invalid token");
            return Err(WebhookError::InvalidToken);
        }

        Ok(())
    }
}

/// Value of the `token` query parameter. The last occurrence wins.
fn query_token(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(k, _)| k == TOKEN_PARAM)
        .last()
        .map(|(_, v)| v.into_owned())
}
