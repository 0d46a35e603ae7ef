use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::AzureError;
use crate::{Endpoints, MANAGEMENT_URL};

/// Fixed timeout for the token exchange.
const TOKEN_TIMEOUT: Duration = Duration::from_secs(5);

/// A cached token is only handed out if it outlives "now" by this many seconds.
const REFRESH_MARGIN_SECS: i64 = 60;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

// ── Token provider ────────────────────────────────────────────────────────────

/// Source of bearer tokens for ARM requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, AzureError>;
}

// ── Static (tests) ────────────────────────────────────────────────────────────

pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, AzureError> {
        Ok(self.0.clone())
    }
}

// ── Client credentials ────────────────────────────────────────────────────────

/// Service principal credentials for the client-credentials grant.
#[derive(Clone)]
pub struct ClientCredentials {
    pub tenant_id:     String,
    pub client_id:     String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
struct CachedToken {
    value:      String,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| at > now + TimeDelta::seconds(REFRESH_MARGIN_SECS))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_on:   ExpiresOn,
}

/// `expires_on` is documented as a string-encoded integer; some endpoints
/// send a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExpiresOn {
    Text(String),
    Number(i64),
}

impl ExpiresOn {
    fn unix_seconds(&self) -> Option<i64> {
        match self {
            ExpiresOn::Text(s) => s.trim().parse().ok(),
            ExpiresOn::Number(n) => Some(*n),
        }
    }
}

/// Acquires management-API tokens via the OAuth2 client-credentials grant
/// and caches the result until one minute before it expires.
///
/// Shared between concurrent callers behind an `Arc`. The cache lock is not
/// held during the exchange, so two callers racing on an expired token may
/// both refresh; the later write wins.
pub struct ClientCredentialsTokenProvider {
    credentials: ClientCredentials,
    login_base:  String,
    resource:    String,
    client:      reqwest::Client,
    cache:       Mutex<CachedToken>,
}

impl ClientCredentialsTokenProvider {
    pub fn with_endpoints(credentials: ClientCredentials, endpoints: &Endpoints) -> Self {
        Self {
            credentials,
            login_base: endpoints.login.trim_end_matches('/').to_string(),
            resource:   MANAGEMENT_URL.to_string(),
            client:     reqwest::Client::new(),
            cache:      Mutex::new(CachedToken::default()),
        }
    }

    #[cfg(test)]
    pub(crate) async fn seed(&self, value: &str, expires_at: DateTime<Utc>) {
        *self.cache.lock().await = CachedToken {
            value:      value.to_string(),
            expires_at: Some(expires_at),
        };
    }

    fn token_url(&self) -> String {
        format!("{}/{}/oauth2/token", self.login_base, self.credentials.tenant_id)
    }

    async fn refresh(&self) -> Result<CachedToken, AzureError> {
        let url = self.token_url();
        let basic = BASE64_STANDARD.encode(format!(
            "{}:{}",
            self.credentials.client_id, self.credentials.client_secret
        ));
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("resource", self.resource.as_str()),
        ];

        debug!(url = %url, "requesting management API token");
        let mut req = self
            .client
            .post(&url)
            .timeout(TOKEN_TIMEOUT)
            .header(AUTHORIZATION, format!("Basic {}", basic))
            .form(&params)
            .build()
            .map_err(|e| AzureError::transport(&url, e))?;
        // `form` sets the content type without a charset.
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        let resp = self
            .client
            .execute(req)
            .await
            .map_err(|e| AzureError::transport(&url, e))?;

        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(|e| AzureError::transport(&url, e))?;

        if status != 200 && status != 201 {
            return Err(AzureError::UnexpectedStatus {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let parsed: TokenResponse =
            serde_json::from_slice(&body).map_err(|e| AzureError::decode(e, &body))?;
        let expires_at = parsed
            .expires_on
            .unix_seconds()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| AzureError::decode("expires_on is not a Unix timestamp", &body))?;

        debug!(%expires_at, "management API token refreshed");
        Ok(CachedToken { value: parsed.access_token, expires_at: Some(expires_at) })
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsTokenProvider {
    async fn token(&self) -> Result<String, AzureError> {
        {
            let guard = self.cache.lock().await;
            if guard.is_fresh(Utc::now()) {
                return Ok(guard.value.clone());
            }
        }

        let fresh = self.refresh().await?;
        let value = fresh.value.clone();
        *self.cache.lock().await = fresh;
        Ok(value)
    }
}
