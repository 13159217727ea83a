use std::sync::Arc;

use tracing::info;

use crate::payload::StatusReport;

/// Events raised by the webhook endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    MessageSent(StatusReport),
    MessageDelivered(StatusReport),
    MessageFailed(StatusReport),
    /// Remaining credit fell to or below the low threshold.
    CreditLow { remaining_balance: f64 },
    /// Remaining credit fell to or below the critical threshold.
    CreditCritical { remaining_balance: f64 },
}

impl WebhookEvent {
    /// Stable event name, e.g. for metrics labels or log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MessageSent(_) => "message_sent",
            Self::MessageDelivered(_) => "message_delivered",
            Self::MessageFailed(_) => "message_failed",
            Self::CreditLow { .. } => "credit_low",
            Self::CreditCritical { .. } => "credit_critical",
        }
    }

    pub fn report(&self) -> Option<&StatusReport> {
        match self {
            Self::MessageSent(r) | Self::MessageDelivered(r) | Self::MessageFailed(r) => Some(r),
            Self::CreditLow { .. } | Self::CreditCritical { .. } => None,
        }
    }
}

/// Something that reacts to webhook events (persistence, alerting, ...).
pub trait EventListener: Send + Sync {
    fn handle(&self, event: &WebhookEvent);
}

impl<F> EventListener for F
where
    F: Fn(&WebhookEvent) + Send + Sync,
{
    fn handle(&self, event: &WebhookEvent) {
        self(event)
    }
}

/// In-process bus. Listeners run synchronously, in registration order.
#[derive(Default, Clone)]
pub struct EventBus {
    listeners: Arc<Vec<Arc<dyn EventListener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: Arc<dyn EventListener>) -> Self {
        let mut l = (*self.listeners).clone();
        l.push(listener);
        self.listeners = Arc::new(l);
        self
    }

    pub fn publish(&self, event: &WebhookEvent) {
        for listener in self.listeners.iter() {
            listener.handle(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Logs every event it sees.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl EventListener for TracingListener {
    fn handle(&self, event: &WebhookEvent) {
        match event {
            WebhookEvent::CreditLow { remaining_balance }
            | WebhookEvent::CreditCritical { remaining_balance } => {
                tracing::warn!(event = event.name(), remaining_balance, "Calisero credit alert");
            }
            _ => {
                let report = event.report();
                info!(
                    event = event.name(),
                    message_id = report.and_then(StatusReport::message_id),
                    recipient = report.and_then(StatusReport::recipient),
                    "Calisero message status"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn publishes_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let first = {
            let seen = seen.clone();
            move |e: &WebhookEvent| seen.lock().unwrap().push(format!("first:{}", e.name()))
        };
        let second = {
            let seen = seen.clone();
            move |e: &WebhookEvent| seen.lock().unwrap().push(format!("second:{}", e.name()))
        };
        let bus = EventBus::new()
            .with(Arc::new(first))
            .with(Arc::new(second))
            .with(Arc::new(TracingListener));
        assert_eq!(bus.len(), 3);

        bus.publish(&WebhookEvent::CreditLow {
            remaining_balance: 10.0,
        });

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:credit_low".to_string(), "second:credit_low".to_string()]
        );
    }

    #[test]
    fn empty_bus_is_a_no_op() {
        let bus = EventBus::new();
        assert!(bus.is_empty());
        bus.publish(&WebhookEvent::CreditCritical {
            remaining_balance: 1.0,
        });
    }
}
