//! Agent invokers: scripted replay and language-model backed.

pub mod prompted;
pub mod prompts;
pub mod scripted;

pub use prompted::PromptedAgent;
pub use scripted::{dry_run_agent_set, ScriptStep, ScriptedAgent};
