//! Agent roles and the tagged context/output values exchanged with them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The five fixed roles of the report pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Extracts structured study facts from the raw clinical record.
    Knowledge,
    /// Writes the initial report draft.
    Composer,
    /// Scores the draft for completeness.
    Reviewer,
    /// Scores the draft for regulatory (ICH E3) compliance.
    Compliance,
    /// Produces a revised draft from the two evaluation reports.
    Reviser,
}

impl AgentRole {
    pub const ALL: [AgentRole; 5] = [
        Self::Knowledge,
        Self::Composer,
        Self::Reviewer,
        Self::Compliance,
        Self::Reviser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Knowledge => "knowledge",
            Self::Composer => "composer",
            Self::Reviewer => "reviewer",
            Self::Compliance => "compliance",
            Self::Reviser => "reviser",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "knowledge" => Some(Self::Knowledge),
            "composer" => Some(Self::Composer),
            "reviewer" => Some(Self::Reviewer),
            "compliance" => Some(Self::Compliance),
            "reviser" => Some(Self::Reviser),
            _ => None,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw input for one run: the clinical record plus the report template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalInput {
    /// Opaque clinical trial record (typically ClinicalTrials.gov JSON).
    pub record: serde_json::Value,
    /// Report template text the composer fills in.
    pub template: String,
    /// Where the template came from (path or name), for traceability.
    pub template_ref: String,
    /// Optional sample report used as a style reference.
    pub sample_report: Option<String>,
}

impl ClinicalInput {
    pub fn new(record: serde_json::Value, template: impl Into<String>) -> Self {
        Self {
            record,
            template: template.into(),
            template_ref: "inline".to_string(),
            sample_report: None,
        }
    }

    pub fn with_template_ref(mut self, template_ref: impl Into<String>) -> Self {
        self.template_ref = template_ref.into();
        self
    }

    pub fn with_sample_report(mut self, sample: impl Into<String>) -> Self {
        self.sample_report = Some(sample.into());
        self
    }

    /// NCT identifier found in the record, if any.
    pub fn nct_id(&self) -> Option<&str> {
        self.record
            .pointer("/protocolSection/identificationModule/nctId")
            .or_else(|| self.record.get("nct_id"))
            .and_then(serde_json::Value::as_str)
    }
}

/// Structured facts extracted once per run by the knowledge agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeInsights {
    /// Study identifier; `TBD` when the record does not carry one.
    pub study_id: String,
    /// Extracted text keyed by report section, in template order.
    pub content_by_section: BTreeMap<String, String>,
    /// Verbatim model output the insights were parsed from.
    pub raw: String,
}

impl KnowledgeInsights {
    pub const UNKNOWN_STUDY: &'static str = "TBD";

    pub fn study_id_or_unknown(&self) -> &str {
        if self.study_id.trim().is_empty() {
            Self::UNKNOWN_STUDY
        } else {
            &self.study_id
        }
    }
}

/// A scored evaluation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub report: String,
    /// Score in 0-100.
    pub score: f64,
}

/// Input handed to an agent, tagged by role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum AgentContext {
    Knowledge {
        input: ClinicalInput,
    },
    Composer {
        insights: KnowledgeInsights,
        template: String,
        sample_report: Option<String>,
    },
    Reviewer {
        draft: String,
        insights: KnowledgeInsights,
    },
    Compliance {
        draft: String,
    },
    Reviser {
        draft: String,
        review: String,
        compliance: String,
        insights: KnowledgeInsights,
    },
}

impl AgentContext {
    /// The role this context is addressed to.
    pub fn role(&self) -> AgentRole {
        match self {
            Self::Knowledge { .. } => AgentRole::Knowledge,
            Self::Composer { .. } => AgentRole::Composer,
            Self::Reviewer { .. } => AgentRole::Reviewer,
            Self::Compliance { .. } => AgentRole::Compliance,
            Self::Reviser { .. } => AgentRole::Reviser,
        }
    }
}

/// Output returned by an agent, tagged by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentOutput {
    Insights(KnowledgeInsights),
    Document { text: String },
    Evaluation(Evaluation),
}

impl AgentOutput {
    pub fn document(text: impl Into<String>) -> Self {
        Self::Document { text: text.into() }
    }

    pub fn evaluation(report: impl Into<String>, score: f64) -> Self {
        Self::Evaluation(Evaluation {
            report: report.into(),
            score,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Insights(_) => "insights",
            Self::Document { .. } => "document",
            Self::Evaluation(_) => "evaluation",
        }
    }

    /// Whether this output shape is what `role` is expected to return.
    pub fn matches_role(&self, role: AgentRole) -> bool {
        matches!(
            (role, self),
            (AgentRole::Knowledge, Self::Insights(_))
                | (AgentRole::Composer | AgentRole::Reviser, Self::Document { .. })
                | (AgentRole::Reviewer | AgentRole::Compliance, Self::Evaluation(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_shape_per_role() {
        let doc = AgentOutput::document("text");
        let eval = AgentOutput::evaluation("report", 70.0);

        assert!(doc.matches_role(AgentRole::Composer));
        assert!(doc.matches_role(AgentRole::Reviser));
        assert!(!doc.matches_role(AgentRole::Reviewer));
        assert!(eval.matches_role(AgentRole::Compliance));
        assert!(!eval.matches_role(AgentRole::Knowledge));
    }

    #[test]
    fn test_nct_id_lookup() {
        let input = ClinicalInput::new(
            json!({"protocolSection": {"identificationModule": {"nctId": "NCT01234567"}}}),
            "template",
        );
        assert_eq!(input.nct_id(), Some("NCT01234567"));

        let bare = ClinicalInput::new(json!({"title": "x"}), "template");
        assert_eq!(bare.nct_id(), None);
    }

    #[test]
    fn test_unknown_study_id() {
        let insights = KnowledgeInsights::default();
        assert_eq!(insights.study_id_or_unknown(), "TBD");
    }
}
