pub mod error;
pub mod policy;
pub mod rest;
pub mod token;

pub use error::AzureError;
pub use policy::{PolicyEvaluator, PolicyInsightsClient, PollPolicy};
pub use rest::{RequestSpec, RestExecutor};
pub use token::{ClientCredentials, ClientCredentialsTokenProvider, StaticToken, TokenProvider};

/// Public Azure management endpoint; also the `resource` requested for tokens.
pub const MANAGEMENT_URL: &str = "https://management.azure.com";

/// Azure AD (v1) login endpoint used for the client-credentials exchange.
pub const LOGIN_URL: &str = "https://login.microsoftonline.com";

// ── Base URLs (overridden in tests) ───────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub management: String,
    pub login:      String,
}
