//! Outgoing request parameters and their normalization from loose JSON maps.
//!
//! Optional keys may be spelled in snake_case or camelCase. When both
//! spellings carry a non-null value the snake_case one is used.

use calisero_core::{CaliseroError, CreateMessageRequest, CreateVerificationRequest, FieldErrors};
use serde_json::{Map, Value};

/// Parameters for sending one SMS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendSmsParams {
    /// Recipient in E.164 form
    pub to: String,
    /// Message body
    pub text: String,
    /// Sender ID
    pub from: Option<String>,
    pub visible_body: Option<String>,
    /// Minutes the message stays deliverable
    pub validity: Option<i64>,
    pub schedule_at: Option<String>,
    pub callback_url: Option<String>,
    pub idempotency_key: Option<String>,
}

impl SendSmsParams {
    pub fn new(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn visible_body(mut self, visible_body: impl Into<String>) -> Self {
        self.visible_body = Some(visible_body.into());
        self
    }

    pub fn validity(mut self, minutes: i64) -> Self {
        self.validity = Some(minutes);
        self
    }

    pub fn schedule_at(mut self, schedule_at: impl Into<String>) -> Self {
        self.schedule_at = Some(schedule_at.into());
        self
    }

    pub fn callback_url(mut self, callback_url: impl Into<String>) -> Self {
        self.callback_url = Some(callback_url.into());
        self
    }

    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Normalize a loose map.
    ///
    /// `to` and `text` may also be given as `recipient` and `body`. Numbers are
    /// accepted where strings are expected, and `validity` accepts integer
    /// strings. Missing `to`/`text` become empty strings; the gateway rejects them.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, CaliseroError> {
        let to = text_field(map, &["to", "recipient"])?.unwrap_or_default();
        let text = text_field(map, &["text", "body"])?.unwrap_or_default();

        Ok(Self {
            to,
            text,
            from: text_field(map, &["from", "sender"])?,
            visible_body: text_field(map, &["visible_body", "visibleBody"])?,
            validity: integer_field(map, &["validity"])?,
            schedule_at: text_field(map, &["schedule_at", "scheduleAt"])?,
            callback_url: text_field(map, &["callback_url", "callbackUrl"])?
                .filter(|url| !url.trim().is_empty()),
            idempotency_key: text_field(map, &["idempotency_key", "idempotencyKey"])?,
        })
    }

    /// Request body with the callback URL the caller resolved.
    pub fn into_request(self, callback_url: Option<String>) -> CreateMessageRequest {
        CreateMessageRequest {
            recipient: self.to,
            body: self.text,
            visible_body: self.visible_body,
            validity: self.validity,
            schedule_at: self.schedule_at,
            callback_url,
            sender: self.from,
            idempotency_key: self.idempotency_key,
        }
    }
}

/// Parameters for starting a phone verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationParams {
    pub to: String,
    pub brand: Option<String>,
    pub template: Option<String>,
    /// Minutes until the code expires
    pub expires_in: Option<u32>,
}

impl VerificationParams {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            ..Default::default()
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> Result<Self, CaliseroError> {
        let expires_in = integer_field(map, &["expires_in", "expiresIn"])?
            .map(|minutes| {
                u32::try_from(minutes).map_err(|_| invalid_field("expires_in", "must be a positive integer"))
            })
            .transpose()?;

        Ok(Self {
            to: text_field(map, &["to", "phone"])?.unwrap_or_default(),
            brand: text_field(map, &["brand"])?,
            template: text_field(map, &["template"])?,
            expires_in,
        })
    }

    pub fn into_request(self) -> CreateVerificationRequest {
        CreateVerificationRequest {
            phone: self.to,
            brand: self.brand,
            template: self.template,
            expires_in: self.expires_in,
        }
    }
}

/// Parameters for checking a verification code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationCheckParams {
    pub to: String,
    pub code: String,
}

impl VerificationCheckParams {
    pub fn new(to: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            code: code.into(),
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> Result<Self, CaliseroError> {
        Ok(Self {
            to: text_field(map, &["to", "phone"])?.unwrap_or_default(),
            code: text_field(map, &["code"])?.unwrap_or_default(),
        })
    }
}

/// First non-null value among `keys`, in order.
fn pick<'a>(map: &'a Map<String, Value>, keys: &[&'a str]) -> Option<(&'a str, &'a Value)> {
    keys.iter()
        .find_map(|key| map.get(*key).filter(|v| !v.is_null()).map(|v| (*key, v)))
}

fn invalid_field(key: &str, problem: &str) -> CaliseroError {
    let message = format!("The {} field {}.", key, problem);
    let mut errors = FieldErrors::new();
    errors.insert(key.to_string(), vec![message.clone()]);
    CaliseroError::Validation { message, errors }
}

fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Result<Option<String>, CaliseroError> {
    match pick(map, keys) {
        None => Ok(None),
        Some((_, Value::String(s))) => Ok(Some(s.clone())),
        Some((_, Value::Number(n))) => Ok(Some(n.to_string())),
        Some((key, _)) => Err(invalid_field(key, "must be a string")),
    }
}

fn integer_field(map: &Map<String, Value>, keys: &[&str]) -> Result<Option<i64>, CaliseroError> {
    let Some((key, value)) = pick(map, keys) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| invalid_field(key, "must be an integer"))
}
