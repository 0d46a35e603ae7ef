use std::path::Path;

use async_trait::async_trait;

use crate::error::ProvisionError;

/// Drives an infrastructure-as-code tool against a module directory.
///
/// The tool's own state machine is opaque; each call maps to one CLI
/// invocation and either succeeds or reports why it did not.
#[async_trait]
pub trait Provisioner: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn init(&self, dir: &Path) -> Result<(), ProvisionError>;

    async fn apply(&self, dir: &Path) -> Result<(), ProvisionError>;

    async fn destroy(&self, dir: &Path) -> Result<(), ProvisionError>;

    /// Read a single string output from the module's state.
    async fn output(&self, dir: &Path, name: &str) -> Result<String, ProvisionError>;

    /// `init` followed by `apply`.
    async fn init_and_apply(&self, dir: &Path) -> Result<(), ProvisionError> {
        self.init(dir).await?;
        self.apply(dir).await
    }
}
