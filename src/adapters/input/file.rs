//! Loads a clinical record and report template from disk.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ClinicalInput;
use crate::domain::ports::{ClinicalInputLoader, InputSource};

/// Reads the JSON record, a plain-text template, and an optional sample report.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileInputLoader;

impl FileInputLoader {
    pub fn new() -> Self {
        Self
    }
}

async fn read_text(path: &std::path::Path, what: &str) -> DomainResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DomainError::Io(format!("cannot read {what} {}: {e}", path.display())))
}

#[async_trait]
impl ClinicalInputLoader for FileInputLoader {
    async fn load(&self, source: &InputSource) -> DomainResult<ClinicalInput> {
        let raw = read_text(&source.data, "clinical data").await?;
        let record: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
            DomainError::ValidationFailed(format!("{} is not valid JSON: {e}", source.data.display()))
        })?;

        let template = read_text(&source.template, "template").await?;
        if template.trim().is_empty() {
            return Err(DomainError::ValidationFailed(format!(
                "template {} is empty",
                source.template.display()
            )));
        }

        let mut input = ClinicalInput::new(record, template)
            .with_template_ref(source.template.display().to_string());
        if let Some(sample) = &source.sample_report {
            input = input.with_sample_report(read_text(sample, "sample report").await?);
        }

        debug!(nct_id = ?input.nct_id(), template = %input.template_ref, "loaded clinical input");
        Ok(input)
    }
}
