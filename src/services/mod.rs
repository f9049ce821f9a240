//! Application services: the convergence loop and everything that drives it.

pub mod cancellation;
pub mod convergence_loop;
pub mod pipeline_runner;
pub mod retry;
pub mod run_inspector;
pub mod run_session;
pub mod score_aggregator;
pub mod study_splitter;

pub use cancellation::{cancellation_pair, CancellationHandle, CancellationToken};
pub use convergence_loop::{ConvergenceLoop, RunOutcome};
pub use pipeline_runner::{CompletedRun, PipelineRunner, RunHandle};
pub use retry::{Attempted, RetryNotice, RetryPolicy};
pub use run_inspector::RunInspector;
pub use run_session::RunSession;
pub use score_aggregator::ScoreAggregator;
pub use study_splitter::{split_studies, SplitSummary};
