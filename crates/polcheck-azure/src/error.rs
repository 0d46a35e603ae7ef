use thiserror::Error;

#[derive(Debug, Error)]
pub enum AzureError {
    #[error("send request to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response status was not in the accepted set. The body is kept
    /// for diagnostics.
    #[error("unexpected HTTP status code {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("decode response body: {message}: {body}")]
    Decode { message: String, body: String },

    #[error("compliance state still pending after {attempts} attempts")]
    Timeout { attempts: u32 },
}

impl AzureError {
    pub(crate) fn transport(url: &str, source: reqwest::Error) -> Self {
        AzureError::Transport { url: url.to_string(), source }
    }

    pub(crate) fn decode(message: impl std::fmt::Display, body: &[u8]) -> Self {
        AzureError::Decode {
            message: message.to_string(),
            body:    String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// HTTP status carried by the error, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            AzureError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
