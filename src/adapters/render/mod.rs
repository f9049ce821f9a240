//! Artifact renderers.

pub mod file;

pub use file::FileArtifactRenderer;
