//! Implementation of the `medscribe runs` commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;

use super::open_storage;
use super::run::{iteration_table, IterationRow};
use crate::cli::display::{colorize_status, list_table, render_list, score_cell};
use crate::cli::output::{output, short_id, truncate, CommandOutput};
use crate::domain::models::{version_label, Artifact, ArtifactKind, RunSnapshot, RunStatus, VersionMeta};
use crate::domain::ports::RunFilter;
use crate::infrastructure::config::ConfigLoader;
use crate::services::RunInspector;

#[derive(Args, Debug)]
pub struct RunsArgs {
    #[command(subcommand)]
    pub command: RunsCommands,
}

#[derive(Subcommand, Debug)]
pub enum RunsCommands {
    /// List recorded runs
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<String>,
        /// Filter by study id
        #[arg(long)]
        study: Option<String>,
        /// Maximum number of runs to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Show run details
    Show {
        /// Run ID (full or prefix)
        id: String,
    },
    /// Show the iteration trace of a run
    Trace {
        /// Run ID (full or prefix)
        id: String,
    },
    /// List every stored artifact version of a run
    Versions {
        /// Run ID (full or prefix)
        id: String,
    },
    /// Print one artifact
    Artifact {
        /// Run ID (full or prefix)
        id: String,
        /// Artifact kind: draft, review or compliance
        #[arg(long, default_value = "draft")]
        kind: String,
        /// Version number (defaults to the latest)
        #[arg(long)]
        version: Option<u32>,
    },
}

#[derive(Debug, Serialize)]
pub struct RunListOutput {
    pub runs: Vec<RunSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub id: String,
    pub study_id: String,
    pub status: String,
    pub iterations: usize,
    pub final_confidence: Option<f64>,
    pub final_draft_version: Option<u32>,
    pub started_at: String,
}

impl From<&RunSnapshot> for RunSummary {
    fn from(snapshot: &RunSnapshot) -> Self {
        Self {
            id: snapshot.run_id.to_string(),
            study_id: snapshot.study_id().to_string(),
            status: snapshot.status.to_string(),
            iterations: snapshot.trace.len(),
            final_confidence: snapshot.trace.last_score().map(|s| s.confidence),
            final_draft_version: snapshot.final_draft_version(),
            started_at: snapshot.started_at.to_rfc3339(),
        }
    }
}

impl CommandOutput for RunListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "study", "status", "iters", "confidence", "draft", "started"]);
        for run in &self.runs {
            table.add_row(vec![
                Cell::new(short_id(&run.id)),
                Cell::new(truncate(&run.study_id, 16)),
                Cell::new(colorize_status(&run.status)),
                Cell::new(run.iterations),
                run.final_confidence.map_or_else(|| Cell::new("-"), score_cell),
                Cell::new(run.final_draft_version.map_or_else(|| "-".to_string(), version_label)),
                Cell::new(truncate(&run.started_at, 19)),
            ]);
        }
        render_list("run", &table, self.total)
    }
}

#[derive(Debug, Serialize)]
pub struct RunDetailOutput {
    #[serde(flatten)]
    pub summary: RunSummary,
    pub phase: String,
    pub target_confidence: f64,
    pub max_iterations: u32,
    pub provider: String,
    pub revisions: usize,
    pub finished_at: Option<String>,
    pub failure: Option<String>,
    pub failed_agent: Option<String>,
}

impl CommandOutput for RunDetailOutput {
    fn to_human(&self) -> String {
        let s = &self.summary;
        let mut lines = vec![
            format!("Run: {}", s.id),
            format!("Study: {}", s.study_id),
            format!("Status: {}", colorize_status(&s.status)),
            format!("Phase: {}", self.phase),
            format!("Provider: {}", self.provider),
            format!(
                "Target: {:.1} within {} iteration(s)",
                self.target_confidence, self.max_iterations
            ),
            format!("Evaluation rounds: {} ({} revision(s))", s.iterations, self.revisions),
        ];
        if let Some(confidence) = s.final_confidence {
            lines.push(format!("Last confidence: {confidence:.1}"));
        }
        if let Some(version) = s.final_draft_version {
            lines.push(format!("Final draft: v{version}"));
        }
        lines.push(format!("Started: {}", s.started_at));
        if let Some(finished) = &self.finished_at {
            lines.push(format!("Finished: {finished}"));
        }
        if let Some(reason) = &self.failure {
            match &self.failed_agent {
                Some(agent) => lines.push(format!("Failure ({agent}): {reason}")),
                None => lines.push(format!("Failure: {reason}")),
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct TraceOutput {
    pub run_id: String,
    pub iterations: Vec<IterationRow>,
}

impl CommandOutput for TraceOutput {
    fn to_human(&self) -> String {
        if self.iterations.is_empty() {
            return format!("Run {} has no evaluation rounds.", short_id(&self.run_id));
        }
        iteration_table(&self.iterations).to_string()
    }
}

#[derive(Debug, Serialize)]
pub struct VersionsOutput {
    pub run_id: String,
    pub versions: Vec<VersionMeta>,
}

impl CommandOutput for VersionsOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["kind", "version", "produced by", "created"]);
        for meta in &self.versions {
            table.add_row(vec![
                Cell::new(meta.kind),
                Cell::new(version_label(meta.version)),
                Cell::new(&meta.produced_by),
                Cell::new(meta.created_at.format("%Y-%m-%d %H:%M:%S")),
            ]);
        }
        render_list("version", &table, self.versions.len())
    }
}

#[derive(Debug, Serialize)]
pub struct ArtifactOutput {
    #[serde(flatten)]
    pub artifact: Artifact,
}

impl CommandOutput for ArtifactOutput {
    fn to_human(&self) -> String {
        format!(
            "# {} {} ({})\n\n{}",
            self.artifact.kind,
            self.artifact.label(),
            self.artifact.produced_by,
            self.artifact.content
        )
    }
}

pub async fn execute(args: RunsArgs, json_mode: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let storage = open_storage(&config).await?;
    let inspector = RunInspector::new(storage.store, storage.runs);

    match args.command {
        RunsCommands::List { status, study, limit } => {
            let status = status
                .map(|s| RunStatus::from_str(&s).with_context(|| format!("Unknown run status: {s}")))
                .transpose()?;
            let runs = inspector
                .list(RunFilter {
                    status,
                    study_id: study,
                    limit: Some(limit),
                })
                .await?;

            let out = RunListOutput {
                total: runs.len(),
                runs: runs.iter().map(RunSummary::from).collect(),
            };
            output(&out, json_mode);
        }
        RunsCommands::Show { id } => {
            let run_id = inspector.resolve(&id).await?;
            let snapshot = inspector.snapshot(run_id).await?;
            let out = RunDetailOutput {
                summary: RunSummary::from(&snapshot),
                phase: snapshot.phase.to_string(),
                target_confidence: snapshot.config.target_confidence,
                max_iterations: snapshot.config.max_iterations,
                provider: snapshot.config.model_selection.provider.clone(),
                revisions: snapshot.trace.revision_count(),
                finished_at: snapshot.finished_at.map(|t| t.to_rfc3339()),
                failure: snapshot.failure.as_ref().map(|f| f.reason.clone()),
                failed_agent: snapshot
                    .failure
                    .as_ref()
                    .and_then(|f| f.agent)
                    .map(|a| a.to_string()),
            };
            output(&out, json_mode);
        }
        RunsCommands::Trace { id } => {
            let run_id = inspector.resolve(&id).await?;
            let trace = inspector.session(run_id).await?.trace().await;
            let out = TraceOutput {
                run_id: run_id.to_string(),
                iterations: trace.entries().iter().map(IterationRow::from).collect(),
            };
            output(&out, json_mode);
        }
        RunsCommands::Versions { id } => {
            let run_id = inspector.resolve(&id).await?;
            let out = VersionsOutput {
                run_id: run_id.to_string(),
                versions: inspector.versions(run_id).await?,
            };
            output(&out, json_mode);
        }
        RunsCommands::Artifact { id, kind, version } => {
            let run_id = inspector.resolve(&id).await?;
            let kind = ArtifactKind::from_str(&kind)
                .with_context(|| format!("Unknown artifact kind: {kind} (expected draft, review or compliance)"))?;
            let artifact = inspector.artifact(run_id, kind, version).await?;
            output(&ArtifactOutput { artifact }, json_mode);
        }
    }

    Ok(())
}
