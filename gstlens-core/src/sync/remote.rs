use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

use crate::error::RemoteError;
use crate::sync::types::{PullResponse, PushRecord, PushResponse, RemoteInvoice};

/// The remote sync authority, as seen by the engine.
///
/// A trait seam so the engine can be exercised against an in-process fake;
/// production wiring uses [`HttpInvoiceRemote`].
#[async_trait]
pub trait InvoiceRemote: Send + Sync {
    /// Submits one batch of locally changed invoices. The response carries
    /// one cloud id per submitted record, in request order.
    async fn push_invoices(&self, batch: &[PushRecord]) -> Result<Vec<String>, RemoteError>;

    /// Fetches every remote record updated strictly after `last_sync_time_ms`.
    /// The boundary semantics are owned by the remote; the response set is
    /// trusted as authoritative for the window.
    async fn pull_invoices(&self, last_sync_time_ms: i64)
        -> Result<Vec<RemoteInvoice>, RemoteError>;
}

/// HTTP implementation of [`InvoiceRemote`] against the sync API.
///
/// Attaches a caller-supplied bearer token when configured; acquiring and
/// refreshing that token is the surrounding application's job.
#[derive(Debug, Clone)]
pub struct HttpInvoiceRemote {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpInvoiceRemote {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        HttpInvoiceRemote {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl InvoiceRemote for HttpInvoiceRemote {
    async fn push_invoices(&self, batch: &[PushRecord]) -> Result<Vec<String>, RemoteError> {
        let url = format!("{}/sync/invoices", self.base_url);
        debug!("POST {} ({} records)", url, batch.len());

        let response = self
            .authorize(self.client.post(&url).json(batch))
            .send()
            .await?;

        let body: PushResponse = handle_response(response).await?.json().await?;

        Ok(body.cloud_ids)
    }

    async fn pull_invoices(
        &self,
        last_sync_time_ms: i64,
    ) -> Result<Vec<RemoteInvoice>, RemoteError> {
        let url = format!(
            "{}/sync/invoices?last_sync_time={}",
            self.base_url, last_sync_time_ms
        );
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(&url)).send().await?;

        let body: PullResponse = handle_response(response).await?.json().await?;

        Ok(body.invoices)
    }
}

/// Classifies a non-success response before the caller reads the body.
///
/// The API reports failures as `{"detail": "..."}`. HTTP 402, or a detail
/// mentioning a subscription, is the entitlement case; everything else
/// surfaces as a generic HTTP failure for retry-later messaging.
async fn handle_response(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<Value>()
        .await
        .ok()
        .and_then(|body| body.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| "Request failed".to_string());

    if status.as_u16() == 402 || message.to_lowercase().contains("subscription") {
        return Err(RemoteError::EntitlementRequired);
    }

    Err(RemoteError::Http {
        status: status.as_u16(),
        message,
    })
}
