//! Split combined ClinicalTrials.gov exports into one record per study.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};

/// Totals for one split invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    pub files_processed: usize,
    pub studies_written: usize,
    pub studies_skipped: usize,
    pub written: Vec<PathBuf>,
}

/// Read every `*.json` under `input` (a file or directory) and write each entry
/// of its `studies` array to `<output_dir>/<nctId>.json`.
///
/// Files without a `studies` array and studies without an NCT id are skipped
/// with a warning.
pub async fn split_studies(input: &Path, output_dir: &Path) -> DomainResult<SplitSummary> {
    let files = collect_json_files(input).await?;
    if files.is_empty() {
        warn!(path = %input.display(), "no JSON files found");
        return Ok(SplitSummary::default());
    }

    tokio::fs::create_dir_all(output_dir).await?;
    let mut summary = SplitSummary::default();

    for file in files {
        debug!(file = %file.display(), "processing combined export");
        let raw = tokio::fs::read_to_string(&file).await?;
        let data: serde_json::Value = serde_json::from_str(&raw)?;
        summary.files_processed += 1;

        let Some(studies) = data.get("studies").and_then(serde_json::Value::as_array) else {
            warn!(file = %file.display(), "no 'studies' array, skipping file");
            continue;
        };

        for study in studies {
            let Some(nct_id) = study
                .pointer("/protocolSection/identificationModule/nctId")
                .and_then(serde_json::Value::as_str)
            else {
                warn!(file = %file.display(), "study missing nctId, skipping");
                summary.studies_skipped += 1;
                continue;
            };

            if !is_safe_file_stem(nct_id) {
                warn!(nct_id, "nctId is not a valid file name, skipping");
                summary.studies_skipped += 1;
                continue;
            }

            let target = output_dir.join(format!("{nct_id}.json"));
            tokio::fs::write(&target, serde_json::to_string_pretty(study)?).await?;
            summary.studies_written += 1;
            summary.written.push(target);
        }
    }

    info!(
        files = summary.files_processed,
        written = summary.studies_written,
        skipped = summary.studies_skipped,
        "studies split"
    );
    Ok(summary)
}

async fn collect_json_files(input: &Path) -> DomainResult<Vec<PathBuf>> {
    let metadata = tokio::fs::metadata(input).await.map_err(|e| {
        DomainError::Io(format!("{}: {e}", input.display()))
    })?;
    if metadata.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(input).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_safe_file_stem(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
