use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("yaml parse error in {path}: {source}")]
    YamlParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid suite {path}: {message}")]
    Invalid { path: String, message: String },

    #[error("missing credential: set {0}")]
    MissingCredential(&'static str),

    #[error("domain error: {0}")]
    Domain(#[from] polcheck_domain::DomainError),
}
