use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("no test cases selected")]
    NoCases,

    #[error("baseline provisioning failed: {0}")]
    Baseline(#[source] polcheck_provision::ProvisionError),
}
