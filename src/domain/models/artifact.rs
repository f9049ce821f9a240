//! Versioned artifacts produced by the pipeline agents.
//!
//! An [`Artifact`] is an immutable snapshot. Revising a draft never edits the
//! existing value; it produces a new artifact whose version is the previous
//! one plus one. Versions are counted per `(run, kind)` and start at 0.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one pipeline run (and of its [`RunSession`](crate::services::RunSession)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a run id from its hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an artifact is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A report draft (v0 from the composer, v1.. from the reviser).
    Draft,
    /// Completeness review report for the draft of the same version.
    Review,
    /// Regulatory compliance report for the draft of the same version.
    Compliance,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [Self::Draft, Self::Review, Self::Compliance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Review => "review",
            Self::Compliance => "compliance",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "review" => Some(Self::Review),
            "compliance" => Some(Self::Compliance),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format the externally visible label for a version (`v0`, `v1`, ...).
///
/// Renderers and operators rely on this exact spelling.
pub fn version_label(version: u32) -> String {
    format!("v{version}")
}

/// An immutable document snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Run this artifact belongs to.
    pub run_id: RunId,
    /// Kind of artifact.
    pub kind: ArtifactKind,
    /// Version within `(run_id, kind)`, gapless from 0.
    pub version: u32,
    /// Document text.
    pub content: String,
    /// Identifier of the agent that produced the content.
    pub produced_by: String,
    /// When the artifact was created.
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Create the first artifact of a kind (version 0).
    pub fn initial(
        run_id: RunId,
        kind: ArtifactKind,
        content: impl Into<String>,
        produced_by: impl Into<String>,
    ) -> Self {
        Self::at_version(run_id, kind, 0, content, produced_by)
    }

    /// Create an artifact at an explicit version.
    pub fn at_version(
        run_id: RunId,
        kind: ArtifactKind,
        version: u32,
        content: impl Into<String>,
        produced_by: impl Into<String>,
    ) -> Self {
        Self {
            run_id,
            kind,
            version,
            content: content.into(),
            produced_by: produced_by.into(),
            created_at: Utc::now(),
        }
    }

    /// Produce the next version of this artifact with new content.
    pub fn revise(&self, content: impl Into<String>, produced_by: impl Into<String>) -> Self {
        Self::at_version(self.run_id, self.kind, self.version + 1, content, produced_by)
    }

    /// The `vN` label of this artifact.
    pub fn label(&self) -> String {
        version_label(self.version)
    }

    /// Listing metadata for this artifact.
    pub fn meta(&self) -> VersionMeta {
        VersionMeta {
            run_id: self.run_id,
            kind: self.kind,
            version: self.version,
            produced_by: self.produced_by.clone(),
            created_at: self.created_at,
        }
    }
}

/// Metadata row describing one stored artifact version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMeta {
    pub run_id: RunId,
    pub kind: ArtifactKind,
    pub version: u32,
    pub produced_by: String,
    pub created_at: DateTime<Utc>,
}
