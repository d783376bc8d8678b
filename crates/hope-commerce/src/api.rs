//! Remote API access.
//!
//! The storefront talks to three endpoint groups (orders, inventory and
//! donations). Each is a gateway trait so flows can run against
//! [`ApiClient`] in production and an in-memory double in tests.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use hope_cache::IdempotencyKey;
use hope_data::{ClientRequestBuilder, FetchClient, FetchError, Response};

use crate::catalog::{InventoryItem, NewInventoryItem};
use crate::checkout::{Order, OrderRequest};
use crate::donations::{Donation, DonationRequest};

/// Header carrying the idempotency key on order submission.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Errors returned by the remote API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no error message"))]
    Rejected {
        status: u16,
        /// The body's `error` field.
        message: Option<String>,
        /// The body's `details` field, if any.
        details: Option<String>,
    },

    /// No response was obtained.
    #[error("Transport error: {0}")]
    Transport(#[from] FetchError),

    /// A 2xx response whose body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The server's message, or `generic`.
    pub fn user_message(&self, generic: &str) -> String {
        match self {
            ApiError::Rejected {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            _ => generic.to_string(),
        }
    }

    /// Whether the outcome of a keyed request is still unknown, so a retry
    /// must reuse the same idempotency key.
    ///
    /// Client errors are recorded by the server against the key, except for
    /// the ones raised before the key is looked at (401) or that are about
    /// pacing rather than the request (408, 429).
    pub fn keeps_idempotency_key(&self) -> bool {
        match self {
            ApiError::Rejected { status, .. } => {
                !(400..500).contains(status) || matches!(status, 401 | 408 | 429)
            }
            ApiError::Transport(_) | ApiError::Decode(_) => true,
        }
    }
}

/// Order submission.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn create_order(
        &self,
        order: &OrderRequest,
        key: &IdempotencyKey,
    ) -> Result<Order, ApiError>;
}

/// Product listing and creation.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn list_items(&self, category: Option<&str>) -> Result<Vec<InventoryItem>, ApiError>;

    async fn create_item(&self, item: &NewInventoryItem) -> Result<InventoryItem, ApiError>;
}

/// Donation submission.
#[async_trait]
pub trait DonationGateway: Send + Sync {
    async fn create_donation(&self, donation: &DonationRequest) -> Result<Donation, ApiError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

/// HTTP implementation of every gateway.
///
/// # Example
///
/// ```rust,ignore
/// let api = ApiClient::new(FetchClient::new().with_base_url("http://localhost:5000/api"))
///     .with_bearer_token(token);
/// let products = api.list_items(Some("food")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: FetchClient,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(http: FetchClient) -> Self {
        Self { http, token: None }
    }

    /// Attach `Authorization: Bearer <token>` to every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn authorize(&self, builder: ClientRequestBuilder) -> ClientRequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Map a raw response to the expected body or an [`ApiError`].
fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    if response.is_success() {
        return response
            .json()
            .map_err(|e| ApiError::Decode(e.to_string()));
    }

    let (message, details) = match response.json::<ErrorBody>() {
        Ok(body) => (
            body.error,
            body.details.map(|d| match d {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
        ),
        Err(_) => (None, None),
    };
    Err(ApiError::Rejected {
        status: response.status,
        message,
        details,
    })
}

#[async_trait]
impl OrderGateway for ApiClient {
    async fn create_order(
        &self,
        order: &OrderRequest,
        key: &IdempotencyKey,
    ) -> Result<Order, ApiError> {
        let response = self
            .authorize(self.http.post("/orders"))
            .header(IDEMPOTENCY_HEADER, key.as_str())
            .json(order)?
            .send()
            .await?;
        decode(response)
    }
}

#[async_trait]
impl CatalogGateway for ApiClient {
    async fn list_items(&self, category: Option<&str>) -> Result<Vec<InventoryItem>, ApiError> {
        let mut builder = self.authorize(self.http.get("/inventory/items"));
        if let Some(category) = category {
            builder = builder.query("category", category);
        }
        decode(builder.send().await?)
    }

    async fn create_item(&self, item: &NewInventoryItem) -> Result<InventoryItem, ApiError> {
        let response = self
            .authorize(self.http.post("/inventory/items"))
            .json(item)?
            .send()
            .await?;
        decode(response)
    }
}

#[async_trait]
impl DonationGateway for ApiClient {
    async fn create_donation(&self, donation: &DonationRequest) -> Result<Donation, ApiError> {
        let response = self
            .authorize(self.http.post("/donations"))
            .json(donation)?
            .send()
            .await?;
        decode(response)
    }
}
