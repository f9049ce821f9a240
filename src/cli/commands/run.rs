//! Implementation of the `medscribe run` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;
use tracing::warn;

use super::open_storage;
use crate::adapters::events::TracingEventSink;
use crate::adapters::input::FileInputLoader;
use crate::adapters::llm::ModelRegistry;
use crate::adapters::render::FileArtifactRenderer;
use crate::cli::display::{colorize_status, list_table, score_cell};
use crate::cli::output::{create_spinner, output, CommandOutput};
use crate::domain::models::{version_label, Config, IterationEntry, RunStatus};
use crate::domain::ports::{ClinicalInputLoader, InputSource};
use crate::infrastructure::config::ConfigLoader;
use crate::services::{CompletedRun, PipelineRunner, RunHandle};

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Clinical data JSON file (defaults to inputs.data_path)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Report template file (defaults to inputs.template_path)
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Sample report used as a style reference
    #[arg(long)]
    pub sample: Option<PathBuf>,

    /// Target confidence (0-100)
    #[arg(long)]
    pub target: Option<f64>,

    /// Maximum number of evaluation rounds
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Model provider override (openai, anthropic, scripted)
    #[arg(long)]
    pub provider: Option<String>,

    /// Use scripted agents instead of a model provider
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(target) = self.target {
            config.pipeline.target_confidence = target;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.pipeline.max_iterations = max_iterations;
        }
        if let Some(provider) = &self.provider {
            config.pipeline.model_selection.provider.clone_from(provider);
        }
        if self.dry_run {
            config.pipeline.model_selection.provider = "scripted".to_string();
        }
    }

    /// Resolve input paths from flags, falling back to `inputs.*` in config.
    pub fn input_source(&self, config: &Config) -> Result<InputSource> {
        let data = self
            .data
            .clone()
            .or_else(|| config.inputs.data_path.as_ref().map(PathBuf::from))
            .context("No clinical data file given; pass --data or set inputs.data_path")?;
        let template = self
            .template
            .clone()
            .or_else(|| config.inputs.template_path.as_ref().map(PathBuf::from))
            .context("No report template given; pass --template or set inputs.template_path")?;
        let sample_report = self
            .sample
            .clone()
            .or_else(|| config.inputs.sample_report_path.as_ref().map(PathBuf::from));

        Ok(InputSource {
            data,
            template,
            sample_report,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct IterationRow {
    pub iteration: u32,
    pub draft_version: u32,
    pub reviewer_score: f64,
    pub compliance_score: f64,
    pub confidence: f64,
    pub decision: String,
    pub reviewer_attempts: u32,
    pub compliance_attempts: u32,
    pub revision_version: Option<u32>,
}

impl From<&IterationEntry> for IterationRow {
    fn from(entry: &IterationEntry) -> Self {
        Self {
            iteration: entry.iteration(),
            draft_version: entry.draft_version,
            reviewer_score: entry.score.reviewer_score,
            compliance_score: entry.score.compliance_score,
            confidence: entry.score.confidence,
            decision: entry.decision.to_string(),
            reviewer_attempts: entry.diagnostics.reviewer_attempts,
            compliance_attempts: entry.diagnostics.compliance_attempts,
            revision_version: entry.revision_version,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub run_id: String,
    pub study_id: String,
    pub status: String,
    pub target_confidence: f64,
    pub final_draft_version: Option<u32>,
    pub iterations: Vec<IterationRow>,
    pub failure: Option<String>,
    pub rendered: Vec<PathBuf>,
    pub elapsed_ms: Option<i64>,
}

impl From<&CompletedRun> for RunOutput {
    fn from(run: &CompletedRun) -> Self {
        let snapshot = &run.snapshot;
        Self {
            run_id: snapshot.run_id.to_string(),
            study_id: snapshot.study_id().to_string(),
            status: snapshot.status.to_string(),
            target_confidence: snapshot.config.target_confidence,
            final_draft_version: snapshot.final_draft_version(),
            iterations: snapshot.trace.entries().iter().map(IterationRow::from).collect(),
            failure: snapshot.failure.as_ref().map(|f| f.reason.clone()),
            rendered: run.rendered.clone(),
            elapsed_ms: snapshot.elapsed().map(|d| d.num_milliseconds()),
        }
    }
}

/// Shared by `run` and `runs trace`.
pub fn iteration_table(rows: &[IterationRow]) -> comfy_table::Table {
    let mut table = list_table(&[
        "iter",
        "draft",
        "reviewer",
        "compliance",
        "confidence",
        "decision",
        "attempts",
    ]);
    for row in rows {
        table.add_row(vec![
            Cell::new(row.iteration),
            Cell::new(version_label(row.draft_version)),
            score_cell(row.reviewer_score),
            score_cell(row.compliance_score),
            score_cell(row.confidence),
            Cell::new(&row.decision),
            Cell::new(format!("{}/{}", row.reviewer_attempts, row.compliance_attempts)),
        ]);
    }
    table
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Run {} for study {}", self.run_id, self.study_id),
            format!("Status: {}", colorize_status(&self.status)),
            format!("Target confidence: {:.1}", self.target_confidence),
        ];
        if let Some(version) = self.final_draft_version {
            lines.push(format!("Final draft: {}", version_label(version)));
        }
        if let Some(ms) = self.elapsed_ms {
            lines.push(format!("Elapsed: {:.1}s", ms as f64 / 1000.0));
        }
        if !self.iterations.is_empty() {
            lines.push(String::new());
            lines.push(iteration_table(&self.iterations).to_string());
        }
        if let Some(reason) = &self.failure {
            lines.push(format!("\nFailure: {reason}"));
        }
        if !self.rendered.is_empty() {
            lines.push(format!("\nWrote {} file(s):", self.rendered.len()));
            for path in &self.rendered {
                lines.push(format!("  - {}", path.display()));
            }
        }
        lines.join("\n")
    }
}

pub async fn execute(args: RunArgs, json_mode: bool) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    args.apply_to(&mut config);
    ConfigLoader::validate(&config)?;

    let source = args.input_source(&config)?;
    let input = FileInputLoader::new()
        .load(&source)
        .await
        .context("Failed to load clinical input")?;

    let agents = ModelRegistry::new(config.pipeline.model_selection.clone())
        .with_rate_limit(config.rate_limit.clone())
        .create_agent_set()
        .context("Failed to set up agents")?;

    let storage = open_storage(&config).await?;
    let runner = PipelineRunner::new(agents, storage.store, storage.runs)
        .with_event_sink(Arc::new(TracingEventSink))
        .with_renderer(Arc::new(FileArtifactRenderer::new(&config.storage.output_dir)));

    let handle = runner.start(config.pipeline.clone(), input);
    let completed = watch(handle, json_mode).await?;

    output(&RunOutput::from(&completed), json_mode);

    if let Some(err) = completed.persist_error {
        let run_id = completed.snapshot.run_id;
        return Err(anyhow::Error::new(err)).with_context(|| {
            format!("Run {run_id} finished but its snapshot was not saved; `runs show` will not find it")
        });
    }
    Ok(())
}

/// Poll the live session until the run finishes. Ctrl-C cancels the run.
async fn watch(handle: RunHandle, json_mode: bool) -> Result<CompletedRun> {
    let spinner = (!json_mode).then(|| create_spinner("starting"));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    let mut cancel_requested = false;

    while !handle.is_finished() {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(spinner) = &spinner {
                    spinner.set_message(progress_message(&handle).await);
                }
            }
            signal = &mut ctrl_c, if !cancel_requested => {
                cancel_requested = true;
                if let Err(err) = signal {
                    warn!(error = %err, "failed to listen for ctrl-c");
                } else {
                    warn!(run_id = %handle.session().id(), "cancellation requested");
                    handle.cancel();
                }
            }
        }
    }

    if let Some(spinner) = &spinner {
        spinner.finish_and_clear();
    }
    handle.wait().await
}

async fn progress_message(handle: &RunHandle) -> String {
    let session = handle.session();
    let status = session.current_status().await;
    if status != RunStatus::Running {
        return status.to_string();
    }
    let phase = session.phase().await;
    let trace = session.trace().await;
    match trace.last_score() {
        Some(score) => format!(
            "{phase}: iteration {}, last confidence {:.1}",
            trace.next_iteration(),
            score.confidence
        ),
        None => format!("{phase}: iteration {}", trace.next_iteration()),
    }
}
