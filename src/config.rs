use std::time::Duration;

use calisero_client::{ClientOptions, DEFAULT_BASE_URI};
use calisero_core::{CaliseroError, EventBus};
use calisero_webhook::{CreditThresholds, SignatureVerifier, TokenVerifier, WebhookProcessor};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer, Serialize};
use std::env;
use std::sync::Arc;

use crate::gateway::GatewaySettings;

/// Application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Calisero API base URL
    pub base_uri: String,
    /// API key from the Calisero dashboard
    pub api_key: Option<String>,
    /// Account used for balance queries
    pub account_id: Option<String>,
    /// Request timeout in seconds (default: 10)
    pub timeout: f64,
    /// Connect timeout in seconds (default: 3)
    pub connect_timeout: f64,
    /// Retries for transient API failures (default: 5)
    pub retries: u32,
    /// First retry delay in milliseconds, doubled per retry (default: 200)
    pub retry_backoff_ms: u64,
    /// Public base URL of this application, used to build callback URLs
    pub app_url: String,
    /// Delivery-report webhook configuration
    pub webhook: WebhookConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Credit monitoring thresholds
    pub credit: CreditConfig,
    /// Webhook listener configuration
    pub server: ServerConfig,
}

/// A verification step in front of the webhook handler.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebhookGuard {
    /// HMAC-SHA256 of the body in `X-Webhook-Signature`
    Signature,
    /// Shared token in the `token` query parameter
    Token,
}

/// Webhook configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebhookConfig {
    /// Whether the webhook is served and callback URLs are filled in (default: false)
    pub enabled: bool,
    /// Shared HMAC secret
    pub secret: Option<String>,
    /// Route path (default: calisero/webhook)
    pub path: String,
    /// Shared query-string token
    pub token: Option<String>,
    /// Guards applied to every request (default: [signature]).
    /// Accepts a list or a comma-separated string.
    #[serde(deserialize_with = "guard_list")]
    pub guards: Vec<WebhookGuard>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Channel name attached to gateway log records (default: default)
    pub channel: String,
    /// Log level (default: info)
    pub level: String,
    /// Log format: json or pretty (default: json)
    pub format: String,
}

/// Credit monitoring. Unset thresholds are disabled.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CreditConfig {
    #[serde(default, deserialize_with = "optional_threshold")]
    pub low_threshold: Option<f64>,
    #[serde(default, deserialize_with = "optional_threshold")]
    pub critical_threshold: Option<f64>,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            secret: None,
            path: "calisero/webhook".to_string(),
            token: None,
            guards: vec![WebhookGuard::Signature],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            channel: "default".to_string(),
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_uri: DEFAULT_BASE_URI.to_string(),
            api_key: None,
            account_id: None,
            timeout: 10.0,
            connect_timeout: 3.0,
            retries: 5,
            retry_backoff_ms: 200,
            app_url: "http://localhost".to_string(),
            webhook: WebhookConfig::default(),
            logging: LoggingConfig::default(),
            credit: CreditConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawThreshold {
    Number(f64),
    Text(String),
}

/// Accepts numbers and numeric strings; empty or non-numeric values disable the threshold.
fn optional_threshold<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawThreshold>::deserialize(deserializer)?;
    let value = match raw {
        Some(RawThreshold::Number(n)) => Some(n),
        Some(RawThreshold::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    };
    Ok(value.filter(|v| v.is_finite()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawGuards {
    List(Vec<WebhookGuard>),
    Text(String),
}

/// `["signature", "token"]` or `"signature,token"`.
fn guard_list<'de, D>(deserializer: D) -> Result<Vec<WebhookGuard>, D::Error>
where
    D: Deserializer<'de>,
{
    match RawGuards::deserialize(deserializer)? {
        RawGuards::List(guards) => Ok(guards),
        RawGuards::Text(text) => text
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "signature" => Ok(WebhookGuard::Signature),
                "token" => Ok(WebhookGuard::Token),
                other => Err(serde::de::Error::custom(format!(
                    "unknown webhook guard `{}`",
                    other
                ))),
            })
            .collect(),
    }
}

fn seconds(value: f64, fallback: Duration) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(fallback)
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(Config::try_from(&AppConfig::default())?)
            // Add configuration file based on environment
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local configuration file (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (CALISERO_API_KEY, CALISERO_WEBHOOK__SECRET, ...)
            .add_source(
                Environment::with_prefix("CALISERO")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        s.try_deserialize()
    }

    /// Transport settings for the API client. Fails without an API key.
    pub fn client_options(&self) -> Result<ClientOptions, CaliseroError> {
        let api_key = non_empty(&self.api_key).ok_or_else(|| {
            CaliseroError::Configuration("Calisero API key is not configured (api_key)".into())
        })?;
        let defaults = ClientOptions::new(api_key);
        Ok(ClientOptions {
            base_uri: self.base_uri.clone(),
            timeout: seconds(self.timeout, defaults.timeout),
            connect_timeout: seconds(self.connect_timeout, defaults.connect_timeout),
            retries: self.retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            ..defaults
        })
    }

    pub fn credit_thresholds(&self) -> CreditThresholds {
        CreditThresholds::new(self.credit.low_threshold, self.credit.critical_threshold)
    }

    /// Guards in the order they run. A configured token always adds the token guard,
    /// and the token guard runs before the signature guard.
    pub fn webhook_guards(&self) -> Vec<WebhookGuard> {
        let token = self.webhook.guards.contains(&WebhookGuard::Token)
            || non_empty(&self.webhook.token).is_some();
        let signature = self.webhook.guards.contains(&WebhookGuard::Signature);

        let mut guards = Vec::with_capacity(2);
        if token {
            guards.push(WebhookGuard::Token);
        }
        if signature {
            guards.push(WebhookGuard::Signature);
        }
        guards
    }

    /// Webhook processor publishing on `events`.
    pub fn webhook_processor(&self, events: EventBus) -> WebhookProcessor {
        self.webhook_guards().into_iter().fold(
            WebhookProcessor::new(events).with_thresholds(self.credit_thresholds()),
            |processor, guard| match guard {
                WebhookGuard::Token => processor.with_guard(Arc::new(TokenVerifier::new(
                    non_empty(&self.webhook.token),
                ))),
                WebhookGuard::Signature => processor.with_guard(Arc::new(
                    SignatureVerifier::new(non_empty(&self.webhook.secret)),
                )),
            },
        )
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            account_id: non_empty(&self.account_id),
            app_url: self.app_url.clone(),
            webhook_enabled: self.webhook.enabled,
            webhook_path: self.webhook.path.clone(),
            webhook_token: non_empty(&self.webhook.token),
            log_channel: self.logging.channel.clone(),
        }
    }
}
