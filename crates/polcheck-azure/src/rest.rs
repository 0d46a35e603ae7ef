use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use tracing::debug;

use crate::error::AzureError;
use crate::token::TokenProvider;

/// One management-API call: method, URL, timeout and the statuses that
/// count as success. Built per call and never shared.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method:       Method,
    pub url:          String,
    /// Whole-request timeout, in seconds.
    pub timeout_secs: u64,
    pub accepted:     &'static [u16],
}

impl RequestSpec {
    pub fn post(url: impl Into<String>, timeout_secs: u64, accepted: &'static [u16]) -> Self {
        Self { method: Method::POST, url: url.into(), timeout_secs, accepted }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn accepts(&self, status: u16) -> bool {
        self.accepted.contains(&status)
    }
}

/// Issues single bearer-authenticated requests against the management API.
///
/// No retries happen here; callers decide what a failure means.
#[derive(Clone)]
pub struct RestExecutor {
    client: reqwest::Client,
    token:  Arc<dyn TokenProvider>,
}

impl RestExecutor {
    pub fn new(token: Arc<dyn TokenProvider>) -> Self {
        Self { client: reqwest::Client::new(), token }
    }

    /// Send the request and return the full response body.
    ///
    /// A status outside `spec.accepted` yields [`AzureError::UnexpectedStatus`],
    /// which still carries the body.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<Bytes, AzureError> {
        let token = self.token.token().await?;

        debug!(method = %spec.method, url = %spec.url, timeout_secs = spec.timeout_secs, "Azure ARM request");
        let resp = self
            .client
            .request(spec.method.clone(), &spec.url)
            .bearer_auth(&token)
            .timeout(spec.timeout())
            .send()
            .await
            .map_err(|e| AzureError::transport(&spec.url, e))?;

        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| AzureError::transport(&spec.url, e))?;
        debug!(url = %spec.url, status, bytes = body.len(), "Azure ARM response");

        if !spec.accepts(status) {
            return Err(AzureError::UnexpectedStatus {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(body)
    }
}
