//! Writes artifacts as markdown files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Artifact, ArtifactKind};
use crate::domain::ports::ArtifactRenderer;

/// Renders into `output_dir` as `CSR_<study>_v<n>.md`,
/// `CSR_<study>_review_v<n>.md` and `CSR_<study>_compliance_v<n>.md`.
#[derive(Debug, Clone)]
pub struct FileArtifactRenderer {
    output_dir: PathBuf,
}

impl FileArtifactRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn file_name(study_id: &str, artifact: &Artifact) -> String {
        let study = sanitize(study_id);
        let label = artifact.label();
        match artifact.kind {
            ArtifactKind::Draft => format!("CSR_{study}_{label}.md"),
            ArtifactKind::Review => format!("CSR_{study}_review_{label}.md"),
            ArtifactKind::Compliance => format!("CSR_{study}_compliance_{label}.md"),
        }
    }
}

/// Keep study ids usable as a file name component.
fn sanitize(study_id: &str) -> String {
    let cleaned: String = study_id
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "TBD".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl ArtifactRenderer for FileArtifactRenderer {
    async fn render(&self, study_id: &str, artifact: &Artifact) -> DomainResult<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(Self::file_name(study_id, artifact));
        tokio::fs::write(&path, &artifact.content).await?;
        debug!(path = %path.display(), kind = %artifact.kind, version = artifact.version, "rendered artifact");
        Ok(path)
    }
}
