use serde::{Deserialize, Serialize};

/// Scores computed for one evaluation round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// 0-based loop iteration.
    pub iteration: u32,
    pub reviewer_score: f64,
    pub compliance_score: f64,
    /// Combined confidence, 0-100.
    pub confidence: f64,
    /// `confidence >= target_confidence`.
    pub passed: bool,
}

/// Outcome of the stopping policy for one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Confidence reached the target.
    StopConverged,
    /// The iteration budget is spent.
    StopExhausted,
    /// Revise the draft and evaluate again.
    ContinueWithRevision,
}

impl Decision {
    pub fn is_stop(&self) -> bool {
        !matches!(self, Self::ContinueWithRevision)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StopConverged => "stop_converged",
            Self::StopExhausted => "stop_exhausted",
            Self::ContinueWithRevision => "continue",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
