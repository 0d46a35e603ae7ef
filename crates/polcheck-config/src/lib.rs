mod raw;
mod loader;
pub mod credentials;
pub mod error;
pub mod suite;

pub use credentials::ArmCredentials;
pub use error::ConfigError;
pub use loader::{load_suite, parse_suite};
pub use suite::{PollSettings, SuiteConfig};
