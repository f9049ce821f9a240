//! Adapters implementing the domain ports.

pub mod agents;
pub mod events;
pub mod input;
pub mod llm;
pub mod memory;
pub mod render;
pub mod sqlite;
