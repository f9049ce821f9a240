//! Domain layer for the medscribe report pipeline
//!
//! Core models, port traits and error types. Nothing in here depends on a
//! concrete model provider, database or terminal.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, PipelineError};
