//! Clinical input loader port.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::ClinicalInput;

/// Locations of the inputs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    pub data: PathBuf,
    pub template: PathBuf,
    pub sample_report: Option<PathBuf>,
}

#[async_trait]
pub trait ClinicalInputLoader: Send + Sync {
    async fn load(&self, source: &InputSource) -> DomainResult<ClinicalInput>;
}
