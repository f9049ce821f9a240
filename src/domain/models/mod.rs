pub mod agent;
pub mod artifact;
pub mod config;
pub mod events;
pub mod score;
pub mod session;
pub mod trace;

pub use agent::{
    AgentContext, AgentOutput, AgentRole, ClinicalInput, Evaluation, KnowledgeInsights,
};
pub use artifact::{version_label, Artifact, ArtifactKind, RunId, VersionMeta};
pub use config::{
    CombinerConfig, Config, DatabaseConfig, InputConfig, LoggingConfig, ModelSelection,
    PipelineConfig, RateLimitConfig, RetryConfig, StorageBackend, StorageConfig,
};
pub use events::{EventPayload, PipelineEvent};
pub use score::{Decision, ScoreRecord};
pub use session::{FailureReport, FinalArtifacts, LoopPhase, RunSnapshot, RunStatus};
pub use trace::{IterationEntry, IterationTrace, RetryDiagnostics};
