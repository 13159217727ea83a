//! The SMS gateway facade applications talk to.

use std::sync::Arc;

use async_trait::async_trait;
use calisero_core::{
    CaliseroApi, CaliseroError, DataResponse, Message, MessageList, UnmountedRoute, Verification,
    VerificationCheckRequest, WebhookRoute,
};
use tracing::{error, info};
use url::form_urlencoded;

use crate::params::{SendSmsParams, VerificationCheckParams, VerificationParams};

/// Settings the gateway needs beyond the API transport.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub account_id: Option<String>,
    /// Public base URL, used when the webhook route cannot be resolved
    pub app_url: String,
    pub webhook_enabled: bool,
    pub webhook_path: String,
    /// Appended to generated callback URLs as `token=`
    pub webhook_token: Option<String>,
    /// Channel name attached to log records
    pub log_channel: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            account_id: None,
            app_url: "http://localhost".to_string(),
            webhook_enabled: false,
            webhook_path: "calisero/webhook".to_string(),
            webhook_token: None,
            log_channel: "default".to_string(),
        }
    }
}

/// High-level SMS operations.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Send one SMS. Fails without calling the API when `to` or `text` is empty.
    async fn send_sms(&self, params: SendSmsParams)
    -> Result<DataResponse<Message>, CaliseroError>;

    /// Remaining credit of the configured account.
    async fn get_balance(&self) -> Result<f64, CaliseroError>;

    async fn get_message_status(&self, id: &str) -> Result<DataResponse<Message>, CaliseroError>;

    async fn send_verification(
        &self,
        params: VerificationParams,
    ) -> Result<DataResponse<Verification>, CaliseroError>;

    async fn check_verification(
        &self,
        params: VerificationCheckParams,
    ) -> Result<DataResponse<Verification>, CaliseroError>;

    async fn list_messages(&self, page: Option<u32>) -> Result<MessageList, CaliseroError>;

    async fn delete_message(&self, id: &str) -> Result<(), CaliseroError>;
}

/// [`SmsGateway`] backed by any [`CaliseroApi`].
pub struct Calisero<A: ?Sized> {
    api: Arc<A>,
    settings: GatewaySettings,
    route: Arc<dyn WebhookRoute>,
}

impl<A: CaliseroApi + ?Sized> Calisero<A> {
    pub fn new(api: Arc<A>, settings: GatewaySettings) -> Self {
        Self {
            api,
            settings,
            route: Arc::new(UnmountedRoute),
        }
    }

    /// Resolver for the public webhook URL.
    pub fn with_route(mut self, route: Arc<dyn WebhookRoute>) -> Self {
        self.route = route;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Callback URL for a message without an explicit one.
    pub fn webhook_callback_url(&self) -> Option<String> {
        let path = self.settings.webhook_path.trim();
        if !self.settings.webhook_enabled || path.is_empty() {
            return None;
        }

        let url = self.route.url().unwrap_or_else(|| {
            format!(
                "{}/{}",
                self.settings.app_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        });

        Some(match self.settings.webhook_token.as_deref() {
            Some(token) if !token.is_empty() => with_token(url, token),
            _ => url,
        })
    }
}

/// Append `token=<token>` unless the query already has a `token` key.
/// A fragment stays at the end.
fn with_token(url: String, token: &str) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url.as_str(), None),
    };
    let query = base.split_once('?').map(|(_, q)| q);
    if query.is_some_and(|q| form_urlencoded::parse(q.as_bytes()).any(|(key, _)| key == "token")) {
        return url;
    }

    let encoded: String = form_urlencoded::byte_serialize(token.as_bytes()).collect();
    let separator = match query {
        None => "?",
        Some(_) if base.ends_with('?') || base.ends_with('&') => "",
        Some(_) => "&",
    };
    let mut with_token = format!("{}{}token={}", base, separator, encoded);
    if let Some(fragment) = fragment {
        with_token.push('#');
        with_token.push_str(fragment);
    }
    with_token
}

#[async_trait]
impl<A: CaliseroApi + ?Sized> SmsGateway for Calisero<A> {
    async fn send_sms(
        &self,
        params: SendSmsParams,
    ) -> Result<DataResponse<Message>, CaliseroError> {
        if params.to.trim().is_empty() || params.text.trim().is_empty() {
            return Err(CaliseroError::invalid(
                "SMS requires a non-empty recipient (to) and body (text)",
            ));
        }

        let callback_url = match params.callback_url.clone() {
            Some(url) if !url.trim().is_empty() => Some(url),
            _ => self.webhook_callback_url(),
        };
        let request = params.into_request(callback_url);

        match self.api.create_message(&request).await {
            Ok(response) => {
                info!(
                    channel = %self.settings.log_channel,
                    to = %request.recipient,
                    from = request.sender.as_deref().unwrap_or_default(),
                    message_id = %response.data().id,
                    status = %response.data().status,
                    "SMS created successfully"
                );
                Ok(response)
            }
            Err(err) => {
                error!(
                    channel = %self.settings.log_channel,
                    to = %request.recipient,
                    from = request.sender.as_deref().unwrap_or_default(),
                    error = %err,
                    "Failed to create SMS"
                );
                Err(err)
            }
        }
    }

    async fn get_balance(&self) -> Result<f64, CaliseroError> {
        let account_id = self
            .settings
            .account_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                CaliseroError::Configuration("Account ID not configured (account_id)".into())
            })?;

        let account = self.api.get_account(account_id).await?;
        Ok(account.data().credit)
    }

    async fn get_message_status(&self, id: &str) -> Result<DataResponse<Message>, CaliseroError> {
        self.api.get_message(id).await
    }

    async fn send_verification(
        &self,
        params: VerificationParams,
    ) -> Result<DataResponse<Verification>, CaliseroError> {
        self.api.create_verification(&params.into_request()).await
    }

    async fn check_verification(
        &self,
        params: VerificationCheckParams,
    ) -> Result<DataResponse<Verification>, CaliseroError> {
        self.api
            .validate_verification(&VerificationCheckRequest {
                phone: params.to,
                code: params.code,
            })
            .await
    }

    async fn list_messages(&self, page: Option<u32>) -> Result<MessageList, CaliseroError> {
        self.api.list_messages(page).await
    }

    async fn delete_message(&self, id: &str) -> Result<(), CaliseroError> {
        self.api.delete_message(id).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use calisero_core::{Account, CreateMessageRequest, CreateVerificationRequest};
    use std::sync::Mutex;

    /// In-memory API recording every call.
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub created: Mutex<Vec<CreateMessageRequest>>,
        pub verifications: Mutex<Vec<CreateVerificationRequest>>,
        pub accounts: Mutex<Vec<String>>,
        pub fail_with: Mutex<Option<CaliseroError>>,
        pub credit: f64,
    }

    impl FakeApi {
        pub(crate) fn failing(err: CaliseroError) -> Self {
            Self {
                fail_with: Mutex::new(Some(err)),
                ..Default::default()
            }
        }

        fn take_failure(&self) -> Result<(), CaliseroError> {
            match self.fail_with.lock().unwrap().take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        pub(crate) fn message(id: &str, req: Option<&CreateMessageRequest>) -> Message {
            Message {
                id: id.to_string(),
                recipient: req.map(|r| r.recipient.clone()).unwrap_or("+40712345678".into()),
                body: req.map(|r| r.body.clone()).unwrap_or("Hello".into()),
                parts: 1,
                created_at: Some("2025-09-19T11:59:42Z".into()),
                status: "scheduled".into(),
                sender: req.and_then(|r| r.sender.clone()),
                callback_url: req.and_then(|r| r.callback_url.clone()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl CaliseroApi for FakeApi {
        async fn create_message(
            &self,
            req: &CreateMessageRequest,
        ) -> Result<DataResponse<Message>, CaliseroError> {
            self.take_failure()?;
            self.created.lock().unwrap().push(req.clone());
            Ok(DataResponse::new(Self::message("msg-1", Some(req))))
        }

        async fn get_message(&self, id: &str) -> Result<DataResponse<Message>, CaliseroError> {
            self.take_failure()?;
            Ok(DataResponse::new(Self::message(id, None)))
        }

        async fn list_messages(&self, page: Option<u32>) -> Result<MessageList, CaliseroError> {
            self.take_failure()?;
            let id = format!("page-{}", page.unwrap_or(1));
            Ok(MessageList {
                data: vec![Self::message(&id, None)],
                meta: None,
            })
        }

        async fn delete_message(&self, _id: &str) -> Result<(), CaliseroError> {
            self.take_failure()
        }

        async fn get_account(&self, id: &str) -> Result<DataResponse<Account>, CaliseroError> {
            self.take_failure()?;
            self.accounts.lock().unwrap().push(id.to_string());
            Ok(DataResponse::new(Account {
                id: Some(id.to_string()),
                credit: self.credit,
                status: Some("active".into()),
            }))
        }

        async fn create_verification(
            &self,
            req: &CreateVerificationRequest,
        ) -> Result<DataResponse<Verification>, CaliseroError> {
            self.take_failure()?;
            self.verifications.lock().unwrap().push(req.clone());
            Ok(DataResponse::new(Verification {
                id: "ver-1".into(),
                phone: req.phone.clone(),
                status: "unverified".into(),
                brand: req.brand.clone(),
                template: req.template.clone(),
                expires_at: Some("2025-09-19T12:05:00Z".into()),
                ..Default::default()
            }))
        }

        async fn validate_verification(
            &self,
            req: &VerificationCheckRequest,
        ) -> Result<DataResponse<Verification>, CaliseroError> {
            self.take_failure()?;
            let status = if req.code == "123456" { "verified" } else { "unverified" };
            Ok(DataResponse::new(Verification {
                id: "ver-1".into(),
                phone: req.phone.clone(),
                status: status.into(),
                ..Default::default()
            }))
        }
    }

    struct FixedRoute(&'static str);

    impl WebhookRoute for FixedRoute {
        fn url(&self) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    fn enabled(token: Option<&str>) -> GatewaySettings {
        GatewaySettings {
            app_url: "https://app.test/".into(),
            webhook_enabled: true,
            webhook_token: token.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_recipient_or_body_never_reaches_the_api() {
        let api = Arc::new(FakeApi::default());
        let gateway = Calisero::new(api.clone(), GatewaySettings::default());

        for params in [
            SendSmsParams::new("", "Hello"),
            SendSmsParams::new("+40712345678", ""),
            SendSmsParams::new("  ", "  "),
        ] {
            let err = gateway.send_sms(params).await.unwrap_err();
            assert!(matches!(err, CaliseroError::Validation { .. }));
        }
        assert!(api.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn callback_url_comes_from_the_route() {
        let api = Arc::new(FakeApi::default());
        let gateway = Calisero::new(api.clone(), enabled(None))
            .with_route(Arc::new(FixedRoute("https://hooks.test/calisero/webhook")));

        gateway
            .send_sms(SendSmsParams::new("+40712345678", "Hello").from("Shop"))
            .await
            .unwrap();

        let created = api.created.lock().unwrap();
        assert_eq!(
            created[0].callback_url.as_deref(),
            Some("https://hooks.test/calisero/webhook")
        );
        assert_eq!(created[0].sender.as_deref(), Some("Shop"));
    }

    #[tokio::test]
    async fn callback_url_falls_back_to_app_url() {
        let api = Arc::new(FakeApi::default());
        let gateway = Calisero::new(api.clone(), enabled(Some("s3cr et")));

        gateway
            .send_sms(SendSmsParams::new("+40712345678", "Hello"))
            .await
            .unwrap();

        assert_eq!(
            api.created.lock().unwrap()[0].callback_url.as_deref(),
            Some("https://app.test/calisero/webhook?token=s3cr+et")
        );
    }

    #[test]
    fn token_is_appended_exactly_once() {
        assert_eq!(with_token("https://a.test/hook".into(), "t"), "https://a.test/hook?token=t");
        assert_eq!(
            with_token("https://a.test/hook?x=1".into(), "t"),
            "https://a.test/hook?x=1&token=t"
        );
        assert_eq!(with_token("https://a.test/hook?".into(), "t"), "https://a.test/hook?token=t");
        assert_eq!(
            with_token("https://a.test/hook?x=1&".into(), "t"),
            "https://a.test/hook?x=1&token=t"
        );
        assert_eq!(
            with_token("https://a.test/hook?token=old".into(), "t"),
            "https://a.test/hook?token=old"
        );
        assert_eq!(
            with_token("https://a.test/hook#top".into(), "t"),
            "https://a.test/hook?token=t#top"
        );
        assert_eq!(
            with_token("https://a.test/hook?x=1#top".into(), "t"),
            "https://a.test/hook?x=1&token=t#top"
        );
        assert_eq!(
            with_token("https://a.test/hook#token=old".into(), "t"),
            "https://a.test/hook?token=t#token=old"
        );
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn send_path_logs_to_and_from() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let ok = Calisero::new(Arc::new(FakeApi::default()), GatewaySettings::default());
        ok.send_sms(SendSmsParams::new("+40712345678", "Hello").from("Shop"))
            .await
            .unwrap();
        let failing = Calisero::new(
            Arc::new(FakeApi::failing(CaliseroError::Http("reset".into()))),
            GatewaySettings::default(),
        );
        failing
            .send_sms(SendSmsParams::new("+40799999999", "Hello").from("Shop"))
            .await
            .unwrap_err();

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = logs.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("SMS created successfully"));
        assert!(lines[0].contains(r#""to":"+40712345678""#));
        assert!(lines[0].contains(r#""from":"Shop""#));
        assert!(lines[0].contains(r#""message_id":"msg-1""#));
        assert!(lines[0].contains(r#""channel":"default""#));
        assert!(lines[1].contains("Failed to create SMS"));
        assert!(lines[1].contains(r#""to":"+40799999999""#));
        assert!(lines[1].contains(r#""error":"http error: reset""#));
    }

    #[tokio::test]
    async fn explicit_callback_url_is_kept() {
        let api = Arc::new(FakeApi::default());
        let gateway = Calisero::new(api.clone(), enabled(Some("t")));

        gateway
            .send_sms(SendSmsParams::new("+40712345678", "Hello").callback_url("https://mine.test/cb"))
            .await
            .unwrap();

        assert_eq!(
            api.created.lock().unwrap()[0].callback_url.as_deref(),
            Some("https://mine.test/cb")
        );
    }

    #[tokio::test]
    async fn no_callback_when_webhook_disabled_or_pathless() {
        let api = Arc::new(FakeApi::default());
        let gateway = Calisero::new(api.clone(), GatewaySettings::default());
        gateway
            .send_sms(SendSmsParams::new("+40712345678", "Hello"))
            .await
            .unwrap();

        let pathless = Calisero::new(
            api.clone(),
            GatewaySettings {
                webhook_path: String::new(),
                ..enabled(None)
            },
        );
        pathless
            .send_sms(SendSmsParams::new("+40712345678", "Hello"))
            .await
            .unwrap();

        let created = api.created.lock().unwrap();
        assert!(created.iter().all(|r| r.callback_url.is_none()));
    }

    #[tokio::test]
    async fn api_errors_are_returned_unchanged() {
        let api = Arc::new(FakeApi::failing(CaliseroError::RateLimited {
            message: "Too many requests".into(),
            retry_after: Some(7),
        }));
        let gateway = Calisero::new(api, GatewaySettings::default());

        let err = gateway
            .send_sms(SendSmsParams::new("+40712345678", "Hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaliseroError::RateLimited { retry_after: Some(7), .. }));
    }

    #[tokio::test]
    async fn balance_needs_an_account() {
        let api = Arc::new(FakeApi {
            credit: 42.5,
            ..Default::default()
        });
        let missing = Calisero::new(api.clone(), GatewaySettings::default());
        assert!(matches!(
            missing.get_balance().await.unwrap_err(),
            CaliseroError::Configuration(_)
        ));

        let gateway = Calisero::new(
            api.clone(),
            GatewaySettings {
                account_id: Some("acc-9".into()),
                ..Default::default()
            },
        );
        assert_eq!(gateway.get_balance().await.unwrap(), 42.5);
        assert_eq!(api.accounts.lock().unwrap().as_slice(), ["acc-9".to_string()]);
    }

    #[tokio::test]
    async fn verification_params_are_translated() {
        let api = Arc::new(FakeApi::default());
        let gateway = Calisero::new(api.clone(), GatewaySettings::default());

        let sent = gateway
            .send_verification(VerificationParams {
                to: "+40712345678".into(),
                brand: Some("Shop".into()),
                expires_in: Some(5),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(sent.data().phone, "+40712345678");
        assert_eq!(api.verifications.lock().unwrap()[0].expires_in, Some(5));

        let checked = gateway
            .check_verification(VerificationCheckParams::new("+40712345678", "123456"))
            .await
            .unwrap();
        assert!(checked.data().is_verified());
    }

    #[tokio::test]
    async fn dyn_api_is_accepted() {
        let api: Arc<dyn CaliseroApi> = Arc::new(FakeApi::default());
        let gateway = Calisero::new(api, GatewaySettings::default());

        let list = gateway.list_messages(Some(2)).await.unwrap();
        assert_eq!(list.data[0].id, "page-2");
        gateway.delete_message("msg-1").await.unwrap();
        assert_eq!(gateway.get_message_status("msg-3").await.unwrap().data().id, "msg-3");
    }
}
