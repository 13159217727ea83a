//! Notification delivery over SMS.
//!
//! A notification renders an [`SmsMessage`] for a [`Notifiable`] recipient and
//! [`SmsChannel`] hands it to the gateway.

use std::sync::Arc;

use calisero_core::{CaliseroError, DataResponse, Message};
use tracing::debug;

use crate::gateway::SmsGateway;
use crate::params::SendSmsParams;

/// An SMS produced by a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmsMessage {
    pub content: String,
    pub from: Option<String>,
    /// Overrides the notifiable's own route
    pub to: Option<String>,
    pub schedule_at: Option<String>,
    pub idempotency_key: Option<String>,
}

impl SmsMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn schedule_at(mut self, schedule_at: impl Into<String>) -> Self {
        self.schedule_at = Some(schedule_at.into());
        self
    }

    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Something that can receive SMS notifications.
pub trait Notifiable: Send + Sync {
    /// Phone number to deliver to, if the recipient has one.
    fn sms_route(&self) -> Option<String>;
}

/// A notification with an SMS rendering.
pub trait SmsNotification: Send + Sync {
    fn to_sms(&self, notifiable: &dyn Notifiable) -> Option<SmsMessage>;
}

pub struct SmsChannel {
    gateway: Arc<dyn SmsGateway>,
}

impl SmsChannel {
    pub fn new(gateway: Arc<dyn SmsGateway>) -> Self {
        Self { gateway }
    }

    /// `Ok(None)` when there is nothing to send or nobody to send it to.
    pub async fn send(
        &self,
        notifiable: &dyn Notifiable,
        notification: &dyn SmsNotification,
    ) -> Result<Option<DataResponse<Message>>, CaliseroError> {
        let Some(message) = notification.to_sms(notifiable) else {
            debug!("notification has no SMS rendering, skipping");
            return Ok(None);
        };

        let recipient = message
            .to
            .clone()
            .filter(|to| !to.trim().is_empty())
            .or_else(|| notifiable.sms_route().filter(|to| !to.trim().is_empty()));
        let Some(to) = recipient else {
            debug!("notifiable has no SMS route, skipping");
            return Ok(None);
        };

        let params = SendSmsParams {
            to,
            text: message.content,
            from: message.from,
            schedule_at: message.schedule_at,
            idempotency_key: message.idempotency_key,
            ..Default::default()
        };
        self.gateway.send_sms(params).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::tests::FakeApi;
    use crate::gateway::{Calisero, GatewaySettings};

    struct User(Option<&'static str>);

    impl Notifiable for User {
        fn sms_route(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    struct OrderShipped(Option<SmsMessage>);

    impl SmsNotification for OrderShipped {
        fn to_sms(&self, _notifiable: &dyn Notifiable) -> Option<SmsMessage> {
            self.0.clone()
        }
    }

    fn channel() -> (Arc<FakeApi>, SmsChannel) {
        let api = Arc::new(FakeApi::default());
        let gateway = Calisero::new(api.clone(), GatewaySettings::default());
        (api, SmsChannel::new(Arc::new(gateway)))
    }

    #[tokio::test]
    async fn sends_to_the_notifiable_route() {
        let (api, channel) = channel();
        let message = SmsMessage::new("Your order shipped")
            .from("Shop")
            .idempotency_key("order-7");

        let sent = channel
            .send(&User(Some("+40712345678")), &OrderShipped(Some(message)))
            .await
            .unwrap();

        assert!(sent.is_some());
        let created = api.created.lock().unwrap();
        assert_eq!(created[0].recipient, "+40712345678");
        assert_eq!(created[0].body, "Your order shipped");
        assert_eq!(created[0].sender.as_deref(), Some("Shop"));
        assert_eq!(created[0].idempotency_key.as_deref(), Some("order-7"));
    }

    #[tokio::test]
    async fn message_recipient_overrides_the_route() {
        let (api, channel) = channel();
        let message = SmsMessage::new("Hi").to("+40799999999");

        channel
            .send(&User(Some("+40712345678")), &OrderShipped(Some(message)))
            .await
            .unwrap();

        assert_eq!(api.created.lock().unwrap()[0].recipient, "+40799999999");
    }

    #[tokio::test]
    async fn skips_without_message_or_recipient() {
        let (api, channel) = channel();

        let none = channel
            .send(&User(Some("+40712345678")), &OrderShipped(None))
            .await
            .unwrap();
        assert!(none.is_none());

        let nobody = channel
            .send(&User(None), &OrderShipped(Some(SmsMessage::new("Hi"))))
            .await
            .unwrap();
        assert!(nobody.is_none());

        assert!(api.created.lock().unwrap().is_empty());
    }
}
