use calisero_core::{WebhookEvent, WebhookPayload};

/// Optional balance thresholds. Unset thresholds never fire.
///
/// `critical` is checked first and suppresses `low` for the same report. The two
/// values are not required to be ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CreditThresholds {
    pub low: Option<f64>,
    pub critical: Option<f64>,
}

impl CreditThresholds {
    pub fn new(low: Option<f64>, critical: Option<f64>) -> Self {
        Self { low, critical }
    }

    /// Credit event for a remaining balance, if any threshold is reached.
    pub fn evaluate(&self, remaining_balance: f64) -> Option<WebhookEvent> {
        if self.critical.is_some_and(|c| remaining_balance <= c) {
            Some(WebhookEvent::CreditCritical { remaining_balance })
        } else if self.low.is_some_and(|l| remaining_balance <= l) {
            Some(WebhookEvent::CreditLow { remaining_balance })
        } else {
            None
        }
    }
}

/// Events a delivery report raises: at most one status event, then at most one
/// credit event.
pub fn classify(payload: &WebhookPayload, thresholds: &CreditThresholds) -> Vec<WebhookEvent> {
    let mut events = Vec::with_capacity(2);

    match payload {
        WebhookPayload::Delivered(r) => events.push(WebhookEvent::MessageDelivered(r.clone())),
        WebhookPayload::Failed(r) => events.push(WebhookEvent::MessageFailed(r.clone())),
        WebhookPayload::Sent(r) => events.push(WebhookEvent::MessageSent(r.clone())),
        WebhookPayload::Unrecognized(_) => {}
    }

    if let Some(event) = payload
        .remaining_balance()
        .and_then(|balance| thresholds.evaluate(balance))
    {
        events.push(event);
    }

    events
}
