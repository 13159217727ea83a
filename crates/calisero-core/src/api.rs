//! The Calisero REST contract: request/response shapes and the [`CaliseroApi`] trait
//! every transport implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::CaliseroError;

/// Envelope the API wraps single resources in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

/// Body of `POST /messages`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateMessageRequest {
    pub recipient: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_body: Option<String>,
    /// Minutes the message stays deliverable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    /// Sent as the `Idempotency-Key` header, never in the body.
    #[serde(skip)]
    pub idempotency_key: Option<String>,
}

/// A message as the API reports it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub recipient: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub parts: u32,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub sent_at: Option<String>,
    #[serde(default)]
    pub delivered_at: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
    pub status: String,
    #[serde(default)]
    pub sender: Option<String>,
}

/// Pagination block of list responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageMeta {
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub last_page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Response of `GET /messages`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessageList {
    pub data: Vec<Message>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Account {
    #[serde(default)]
    pub id: Option<String>,
    /// Remaining prepaid credit.
    pub credit: f64,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `POST /verifications`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateVerificationRequest {
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Message template, must contain `{code}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Minutes until the code expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u32>,
}

/// Body of `PUT /verifications/validate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationCheckRequest {
    pub phone: String,
    pub code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verification {
    #[serde(default)]
    pub id: String,
    pub phone: String,
    pub status: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub verified_at: Option<String>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub expired: bool,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        self.status == "verified"
    }
}

/// Operations of the Calisero REST API.
///
/// The gateway and commands only ever see this trait, so tests swap in fakes and
/// deployments can wrap the HTTP client.
#[async_trait]
pub trait CaliseroApi: Send + Sync {
    async fn create_message(
        &self,
        req: &CreateMessageRequest,
    ) -> Result<DataResponse<Message>, CaliseroError>;

    async fn get_message(&self, id: &str) -> Result<DataResponse<Message>, CaliseroError>;

    async fn list_messages(&self, page: Option<u32>) -> Result<MessageList, CaliseroError>;

    async fn delete_message(&self, id: &str) -> Result<(), CaliseroError>;

    async fn get_account(&self, id: &str) -> Result<DataResponse<Account>, CaliseroError>;

    async fn create_verification(
        &self,
        req: &CreateVerificationRequest,
    ) -> Result<DataResponse<Verification>, CaliseroError>;

    async fn validate_verification(
        &self,
        req: &VerificationCheckRequest,
    ) -> Result<DataResponse<Verification>, CaliseroError>;
}
