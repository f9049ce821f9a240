//! Artifact renderer port - hands finished artifacts to an output format.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Artifact;

#[async_trait]
pub trait ArtifactRenderer: Send + Sync {
    /// Render one artifact for the given study and return where it went.
    async fn render(&self, study_id: &str, artifact: &Artifact) -> DomainResult<PathBuf>;
}
