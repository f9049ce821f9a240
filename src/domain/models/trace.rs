//! Append-only record of every evaluation round in a run.

use serde::{Deserialize, Serialize};

use super::score::{Decision, ScoreRecord};
use crate::domain::errors::{DomainError, DomainResult};

/// Attempts each retried agent needed in one iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryDiagnostics {
    pub reviewer_attempts: u32,
    pub compliance_attempts: u32,
    /// Zero when the iteration did not revise.
    pub reviser_attempts: u32,
}

/// One evaluation round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationEntry {
    pub draft_version: u32,
    pub score: ScoreRecord,
    pub review_version: u32,
    pub compliance_version: u32,
    pub decision: Decision,
    /// Draft version produced by the reviser, set once after the revision lands.
    pub revision_version: Option<u32>,
    pub diagnostics: RetryDiagnostics,
}

impl IterationEntry {
    pub fn iteration(&self) -> u32 {
        self.score.iteration
    }
}

/// Ordered, append-only sequence of [`IterationEntry`] values.
///
/// Apart from [`IterationTrace::record_revision`], which fills the revision
/// slot of an entry exactly once, nothing already appended is ever changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationTrace {
    entries: Vec<IterationEntry>,
}

impl IterationTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the entry for the next iteration.
    pub fn append(&mut self, entry: IterationEntry) -> DomainResult<()> {
        let expected = self.next_iteration();
        if entry.iteration() != expected {
            return Err(DomainError::ValidationFailed(format!(
                "trace expects iteration {expected}, got {}",
                entry.iteration()
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Record the revision produced at the end of `iteration`.
    pub fn record_revision(&mut self, iteration: u32, version: u32, attempts: u32) -> DomainResult<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.iteration() == iteration)
            .ok_or_else(|| {
                DomainError::ValidationFailed(format!("no trace entry for iteration {iteration}"))
            })?;

        if entry.revision_version.is_some() {
            return Err(DomainError::ValidationFailed(format!(
                "revision for iteration {iteration} already recorded"
            )));
        }
        if entry.decision != Decision::ContinueWithRevision {
            return Err(DomainError::ValidationFailed(format!(
                "iteration {iteration} decided {} and takes no revision",
                entry.decision
            )));
        }

        entry.revision_version = Some(version);
        entry.diagnostics.reviser_attempts = attempts;
        Ok(())
    }

    pub fn next_iteration(&self) -> u32 {
        u32::try_from(self.entries.len()).unwrap_or(u32::MAX)
    }

    pub fn entries(&self) -> &[IterationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&IterationEntry> {
        self.entries.last()
    }

    pub fn last_score(&self) -> Option<ScoreRecord> {
        self.entries.last().map(|e| e.score)
    }

    pub fn revision_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.revision_version.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(iteration: u32, decision: Decision) -> IterationEntry {
        IterationEntry {
            draft_version: iteration,
            score: ScoreRecord {
                iteration,
                reviewer_score: 50.0,
                compliance_score: 50.0,
                confidence: 50.0,
                passed: false,
            },
            review_version: iteration,
            compliance_version: iteration,
            decision,
            revision_version: None,
            diagnostics: RetryDiagnostics {
                reviewer_attempts: 1,
                compliance_attempts: 1,
                reviser_attempts: 0,
            },
        }
    }

    #[test]
    fn test_append_requires_next_iteration() {
        let mut trace = IterationTrace::new();
        trace.append(entry(0, Decision::ContinueWithRevision)).unwrap();
        assert!(trace.append(entry(2, Decision::StopExhausted)).is_err());
        trace.append(entry(1, Decision::StopExhausted)).unwrap();
        assert_eq!(trace.len(), 2);
    }

    #[test]
    fn test_revision_recorded_once() {
        let mut trace = IterationTrace::new();
        trace.append(entry(0, Decision::ContinueWithRevision)).unwrap();

        trace.record_revision(0, 1, 2).unwrap();
        assert!(trace.record_revision(0, 2, 1).is_err());

        let first = &trace.entries()[0];
        assert_eq!(first.revision_version, Some(1));
        assert_eq!(first.diagnostics.reviser_attempts, 2);
        assert_eq!(trace.revision_count(), 1);
    }

    #[test]
    fn test_stop_entry_rejects_revision() {
        let mut trace = IterationTrace::new();
        trace.append(entry(0, Decision::StopConverged)).unwrap();
        assert!(trace.record_revision(0, 1, 1).is_err());
    }
}
