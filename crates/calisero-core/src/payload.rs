//! Delivery reports posted to the webhook endpoint.
//!
//! Calisero posts a flat JSON object per status change:
//!
//! ```json
//! {
//!   "price": 0.0378,
//!   "sender": "CALISERO",
//!   "sentAt": "2025-09-19T11:59:44.000000Z",
//!   "status": "delivered",
//!   "messageId": "019961d8-3338-700c-be17-10d061f03a5c",
//!   "recipient": "+40742***350",
//!   "scheduleAt": "2025-09-19T11:59:42.000000Z",
//!   "deliveredAt": "2025-09-19T12:00:24.000000Z",
//!   "remainingBalance": 999.43
//! }
//! ```
//!
//! The body is decoded once into a [`WebhookPayload`]; nothing in it is mandatory and
//! an unexpected shape is never an error.

use serde::Serialize;
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub type RawFields = Map<String, Value>;

/// A delivery report whose `status` is one of the known values. Keeps every field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StatusReport {
    fields: RawFields,
}

impl StatusReport {
    pub fn new(fields: RawFields) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &RawFields {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn message_id(&self) -> Option<&str> {
        self.str_field("messageId")
    }

    pub fn recipient(&self) -> Option<&str> {
        self.str_field("recipient")
    }

    pub fn sender(&self) -> Option<&str> {
        self.str_field("sender")
    }

    pub fn price(&self) -> Option<f64> {
        self.fields.get("price").and_then(numeric)
    }

    pub fn schedule_at(&self) -> Option<OffsetDateTime> {
        self.timestamp("scheduleAt")
    }

    /// Only present for `sent` and `delivered`.
    pub fn sent_at(&self) -> Option<OffsetDateTime> {
        self.timestamp("sentAt")
    }

    /// Only present for `delivered`.
    pub fn delivered_at(&self) -> Option<OffsetDateTime> {
        self.timestamp("deliveredAt")
    }

    pub fn remaining_balance(&self) -> Option<f64> {
        remaining_balance(&self.fields)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    fn timestamp(&self, key: &str) -> Option<OffsetDateTime> {
        self.str_field(key)
            .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())
    }
}

/// Decoded webhook body.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookPayload {
    Sent(StatusReport),
    Delivered(StatusReport),
    Failed(StatusReport),
    /// Missing or unknown `status`, or a body that is not a JSON object.
    Unrecognized(RawFields),
}

impl WebhookPayload {
    /// Decode a raw request body. Never fails: garbage becomes an empty `Unrecognized`.
    pub fn from_slice(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => Self::from_fields(fields),
            _ => Self::Unrecognized(RawFields::new()),
        }
    }

    pub fn from_fields(fields: RawFields) -> Self {
        match fields.get("status").and_then(Value::as_str) {
            Some("sent") => Self::Sent(StatusReport::new(fields)),
            Some("delivered") => Self::Delivered(StatusReport::new(fields)),
            Some("failed") => Self::Failed(StatusReport::new(fields)),
            _ => Self::Unrecognized(fields),
        }
    }

    pub fn fields(&self) -> &RawFields {
        match self {
            Self::Sent(r) | Self::Delivered(r) | Self::Failed(r) => r.fields(),
            Self::Unrecognized(fields) => fields,
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.fields().get("status").and_then(Value::as_str)
    }

    /// `remainingBalance` as a float, when present and numeric.
    pub fn remaining_balance(&self) -> Option<f64> {
        remaining_balance(self.fields())
    }
}

fn remaining_balance(fields: &RawFields) -> Option<f64> {
    fields.get("remainingBalance").and_then(numeric)
}

/// JSON numbers and numeric strings count; everything else does not.
pub fn numeric(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> RawFields {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn decodes_known_statuses() {
        for (status, expected) in [("sent", "Sent"), ("delivered", "Delivered"), ("failed", "Failed")] {
            let payload = WebhookPayload::from_fields(fields(json!({ "status": status })));
            let name = match payload {
                WebhookPayload::Sent(_) => "Sent",
                WebhookPayload::Delivered(_) => "Delivered",
                WebhookPayload::Failed(_) => "Failed",
                WebhookPayload::Unrecognized(_) => "Unrecognized",
            };
            assert_eq!(name, expected);
        }
    }

    #[test]
    fn unknown_or_missing_status_is_unrecognized() {
        let p = WebhookPayload::from_fields(fields(json!({ "status": "queued", "messageId": "m" })));
        assert!(matches!(p, WebhookPayload::Unrecognized(ref f) if f.len() == 2));

        let p = WebhookPayload::from_fields(fields(json!({ "status": 3 })));
        assert!(matches!(p, WebhookPayload::Unrecognized(_)));

        let p = WebhookPayload::from_fields(RawFields::new());
        assert!(matches!(p, WebhookPayload::Unrecognized(_)));
    }

    #[test]
    fn garbage_body_is_empty_unrecognized() {
        assert_eq!(
            WebhookPayload::from_slice(b"not json"),
            WebhookPayload::Unrecognized(RawFields::new())
        );
        assert_eq!(
            WebhookPayload::from_slice(b"[1,2,3]"),
            WebhookPayload::Unrecognized(RawFields::new())
        );
    }

    #[test]
    fn report_accessors() {
        let body = br#"{
            "price": 0.0378,
            "sender": "CALISERO",
            "sentAt": "2025-09-19T11:59:44.000000Z",
            "status": "delivered",
            "messageId": "uuid-123",
            "recipient": "+40123456789",
            "scheduleAt": "2025-09-19T11:59:42.000000Z",
            "deliveredAt": "2025-09-19T12:00:24.000000Z",
            "remainingBalance": 999.43
        }"#;
        let WebhookPayload::Delivered(report) = WebhookPayload::from_slice(body) else {
            panic!("expected delivered");
        };
        assert_eq!(report.message_id(), Some("uuid-123"));
        assert_eq!(report.recipient(), Some("+40123456789"));
        assert_eq!(report.sender(), Some("CALISERO"));
        assert_eq!(report.price(), Some(0.0378));
        assert_eq!(report.remaining_balance(), Some(999.43));
        let delivered = report.delivered_at().unwrap();
        assert_eq!(delivered.hour(), 12);
        assert!(report.sent_at().unwrap() < delivered);
        assert_eq!(report.fields().len(), 9);
    }

    #[test]
    fn numeric_values() {
        assert_eq!(numeric(&json!(12)), Some(12.0));
        assert_eq!(numeric(&json!("99.5")), Some(99.5));
        assert_eq!(numeric(&json!(" 7 ")), Some(7.0));
        assert_eq!(numeric(&json!("abc")), None);
        assert_eq!(numeric(&json!("inf")), None);
        assert_eq!(numeric(&json!(null)), None);
        assert_eq!(numeric(&json!(true)), None);
    }
}
