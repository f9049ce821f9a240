//! Event sinks for pipeline progress.

pub mod broadcast;
pub mod tracing_sink;

pub use broadcast::BroadcastEventSink;
pub use tracing_sink::TracingEventSink;
