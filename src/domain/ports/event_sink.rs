//! Event sink port - optional progress observer.

use async_trait::async_trait;

use crate::domain::models::PipelineEvent;

/// Receives pipeline events. Publishing never fails the run.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: PipelineEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

#[async_trait]
impl EventSink for NullEventSink {
    async fn publish(&self, _event: PipelineEvent) {}
}
