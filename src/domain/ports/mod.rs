//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that adapters implement:
//! - AgentInvoker: one generative pipeline step
//! - LanguageModel: raw text generation backends
//! - VersionStore: immutable artifact versions
//! - RunRepository: persisted run snapshots
//! - EventSink, ArtifactRenderer, ClinicalInputLoader: edges of the pipeline

pub mod agent_invoker;
pub mod event_sink;
pub mod input_loader;
pub mod language_model;
pub mod renderer;
pub mod run_repository;
pub mod version_store;

pub use agent_invoker::{expect_document, expect_evaluation, expect_insights, AgentInvoker, AgentSet};
pub use event_sink::{EventSink, NullEventSink};
pub use input_loader::{ClinicalInputLoader, InputSource};
pub use language_model::{
    parse_score_marker, GenerationError, LanguageModel, PromptContext, COMPLETENESS_MARKER,
    COMPLIANCE_MARKER,
};
pub use renderer::ArtifactRenderer;
pub use run_repository::{RunFilter, RunRepository};
pub use version_store::VersionStore;
