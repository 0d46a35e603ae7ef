pub mod error;
pub mod provisioner;
pub mod terraform;

pub use error::ProvisionError;
pub use provisioner::Provisioner;
pub use terraform::{RunOutput, TerraformRunner};
