use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use calisero_core::{
    Account, CaliseroApi, CaliseroError, CreateMessageRequest, CreateVerificationRequest,
    DataResponse, FieldErrors, Message, MessageList, Verification, VerificationCheckRequest,
};
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URI: &str = "https://rest.calisero.ro/api/v1";

const REQUEST_ID_HEADER: &str = "x-request-id";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Transport settings for [`CaliseroClient`].
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// API base URL; override for testing/mocking.
    pub base_uri: String,
    /// Bearer token.
    pub api_key: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Extra attempts after the first one for transient failures.
    pub retries: u32,
    /// Delay before the first retry, doubled on each following one.
    pub retry_backoff: Duration,
}

impl ClientOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_uri: DEFAULT_BASE_URI.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(3),
            retries: 5,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

/// Calisero REST client.
#[derive(Clone, Debug)]
pub struct CaliseroClient {
    options: ClientOptions,
    base: Url,
    http: reqwest::Client,
}

impl CaliseroClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, CaliseroError> {
        Self::with_options(ClientOptions::new(api_key))
    }

    pub fn with_options(options: ClientOptions) -> Result<Self, CaliseroError> {
        if options.api_key.trim().is_empty() {
            return Err(CaliseroError::Configuration(
                "Calisero API key is not configured (api_key)".into(),
            ));
        }
        let base = Url::parse(&options.base_uri).map_err(|e| {
            CaliseroError::Configuration(format!("invalid base_uri {}: {}", options.base_uri, e))
        })?;
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(|e| CaliseroError::Configuration(format!("http client: {}", e)))?;
        Ok(Self {
            options,
            base,
            http,
        })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    fn url(&self, segments: &[&str]) -> Result<Url, CaliseroError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| CaliseroError::Configuration("base_uri cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn call<T: DeserializeOwned>(&self, call: Call<'_>) -> Result<T, CaliseroError> {
        let text = self.execute(call).await?;
        serde_json::from_str(&text).map_err(|e| CaliseroError::Decode(e.to_string()))
    }

    /// Runs a call, retrying transient failures when the call is safe to repeat.
    async fn execute(&self, call: Call<'_>) -> Result<String, CaliseroError> {
        let mut attempt = 0;
        loop {
            match self.send_once(&call).await {
                Ok(text) => return Ok(text),
                Err(e) if call.retryable && e.is_transient() && attempt < self.options.retries => {
                    let delay = self.backoff(attempt, &e);
                    warn!(
                        method = %call.method,
                        url = %call.url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying Calisero request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, call: &Call<'_>) -> Result<String, CaliseroError> {
        let mut req = self
            .http
            .request(call.method.clone(), call.url.clone())
            .bearer_auth(&self.options.api_key)
            .header(ACCEPT, "application/json");
        if let Some(body) = &call.body {
            req = req.json(body);
        }
        if let Some(key) = call.idempotency_key {
            req = req.header(IDEMPOTENCY_HEADER, key);
        }

        let res = req
            .send()
            .await
            .map_err(|e| CaliseroError::Http(e.to_string()))?;
        let status = res.status();
        let headers = res.headers().clone();
        let text = res
            .text()
            .await
            .map_err(|e| CaliseroError::Http(e.to_string()))?;
        debug!(method = %call.method, url = %call.url, status = status.as_u16(), "Calisero response");

        if status.is_success() {
            Ok(text)
        } else {
            Err(error_from_response(status, &headers, &text))
        }
    }

    fn backoff(&self, attempt: u32, error: &CaliseroError) -> Duration {
        if let CaliseroError::RateLimited {
            retry_after: Some(secs),
            ..
        } = error
        {
            return Duration::from_secs(*secs).min(MAX_BACKOFF);
        }
        self.options
            .retry_backoff
            .checked_mul(2u32.saturating_pow(attempt))
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

/// One logical API call.
struct Call<'a> {
    method: Method,
    url: Url,
    body: Option<serde_json::Value>,
    idempotency_key: Option<&'a str>,
    retryable: bool,
}

impl<'a> Call<'a> {
    fn new(method: Method, url: Url) -> Self {
        let retryable = matches!(method, Method::GET | Method::DELETE);
        Self {
            method,
            url,
            body: None,
            idempotency_key: None,
            retryable,
        }
    }

    fn json<B: serde::Serialize>(mut self, body: &B) -> Result<Self, CaliseroError> {
        self.body =
            Some(serde_json::to_value(body).map_err(|e| CaliseroError::invalid(e.to_string()))?);
        Ok(self)
    }

    /// A call carrying an idempotency key can be repeated safely.
    fn idempotency_key(mut self, key: Option<&'a str>) -> Self {
        if key.is_some() {
            self.idempotency_key = key;
            self.retryable = true;
        }
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: BTreeMap<String, serde_json::Value>,
}

/// Map a non-success answer onto the error taxonomy.
pub fn error_from_response(status: StatusCode, headers: &HeaderMap, body: &str) -> CaliseroError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .filter(|m| !m.is_empty())
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    match status.as_u16() {
        401 => CaliseroError::Unauthorized(message),
        403 => CaliseroError::Forbidden(message),
        404 => CaliseroError::NotFound(message),
        422 => CaliseroError::Validation {
            message,
            errors: field_errors(parsed.errors),
        },
        429 => CaliseroError::RateLimited {
            message,
            retry_after: header_str(RETRY_AFTER.as_str()).and_then(|v| v.trim().parse().ok()),
        },
        s @ 500..=599 => CaliseroError::Server { status: s, message },
        s => CaliseroError::Api {
            status: s,
            message,
            request_id: header_str(REQUEST_ID_HEADER),
        },
    }
}

fn field_errors(raw: BTreeMap<String, serde_json::Value>) -> FieldErrors {
    raw.into_iter()
        .map(|(field, value)| {
            let messages = match value {
                serde_json::Value::Array(items) => items
                    .into_iter()
                    .map(|v| match v {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
                serde_json::Value::String(s) => vec![s],
                other => vec![other.to_string()],
            };
            (field, messages)
        })
        .collect()
}

#[async_trait]
impl CaliseroApi for CaliseroClient {
    async fn create_message(
        &self,
        req: &CreateMessageRequest,
    ) -> Result<DataResponse<Message>, CaliseroError> {
        let call = Call::new(Method::POST, self.url(&["messages"])?)
            .json(req)?
            .idempotency_key(req.idempotency_key.as_deref());
        self.call(call).await
    }

    async fn get_message(&self, id: &str) -> Result<DataResponse<Message>, CaliseroError> {
        self.call(Call::new(Method::GET, self.url(&["messages", id])?))
            .await
    }

    async fn list_messages(&self, page: Option<u32>) -> Result<MessageList, CaliseroError> {
        let mut url = self.url(&["messages"])?;
        if let Some(page) = page {
            url.query_pairs_mut().append_pair("page", &page.to_string());
        }
        self.call(Call::new(Method::GET, url)).await
    }

    async fn delete_message(&self, id: &str) -> Result<(), CaliseroError> {
        self.execute(Call::new(Method::DELETE, self.url(&["messages", id])?))
            .await
            .map(|_| ())
    }

    async fn get_account(&self, id: &str) -> Result<DataResponse<Account>, CaliseroError> {
        self.call(Call::new(Method::GET, self.url(&["accounts", id])?))
            .await
    }

    async fn create_verification(
        &self,
        req: &CreateVerificationRequest,
    ) -> Result<DataResponse<Verification>, CaliseroError> {
        let call = Call::new(Method::POST, self.url(&["verifications"])?).json(req)?;
        self.call(call).await
    }

    async fn validate_verification(
        &self,
        req: &VerificationCheckRequest,
    ) -> Result<DataResponse<Verification>, CaliseroError> {
        let call = Call::new(Method::PUT, self.url(&["verifications", "validate"])?).json(req)?;
        self.call(call).await
    }
}
