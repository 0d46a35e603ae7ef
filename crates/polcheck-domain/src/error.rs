use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid resource id '{0}': expected /subscriptions/{{s}}/resourceGroups/{{g}}/...")]
    InvalidResourceId(String),

    #[error("invalid test case name: {0}")]
    InvalidCaseName(String),

    #[error("unknown policy effect '{0}' (expected allow, audit or deny)")]
    UnknownEffect(String),
}
