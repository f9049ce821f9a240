//! Instruction text for the LLM-backed agents.

use std::fmt::Write as _;

use crate::domain::models::KnowledgeInsights;
use crate::domain::ports::{COMPLETENESS_MARKER, COMPLIANCE_MARKER};

/// ICH E3 sections the compliance agent checks a report against.
pub const ICH_E3_SECTIONS: [&str; 15] = [
    "Title Page",
    "Synopsis",
    "Table of Contents",
    "List of Abbreviations",
    "Ethics",
    "Investigators and Study Administrative Structure",
    "Introduction",
    "Study Objectives",
    "Investigational Plan",
    "Study Patients",
    "Efficacy Evaluation",
    "Safety Evaluation",
    "Discussion and Overall Conclusions",
    "References",
    "Appendices",
];

pub fn knowledge_instructions(template: &str) -> String {
    format!(
        "You are a clinical documentation assistant.\n\n\
         You are provided clinical study data in JSON format.\n\n\
         Using the clinical study data and the CSR template below, extract and organize \
         relevant content for ALL sections implied by the template.\n\n\
         Return a JSON object with exactly these fields:\n\
         - nct_id: the NCT ID from the clinical study data\n\
         - content_by_section: an object mapping section names to their extracted plain-text content\n\n\
         Do NOT invent numerical results; if information is missing, write 'TBD'.\n\n\
         CSR Template\n------------\n{template}\n"
    )
}

pub fn composer_instructions(template: &str) -> String {
    format!(
        "You are a medical writer generating a Clinical Study Report (CSR).\n\n\
         You receive structured content extracted from clinical study data.\n\n\
         Using the template below, compose a clean, well-structured CSR in markdown. \
         Follow the template headings strictly and use the extracted content where relevant. \
         Return only the report text.\n\n\
         CSR Template\n------------\n{template}\n"
    )
}

pub fn composer_input(insights: &KnowledgeInsights, sample_report: Option<&str>) -> String {
    let mut input = format!("Study: {}\n\n", insights.study_id_or_unknown());
    for (section, content) in &insights.content_by_section {
        let _ = write!(input, "## {section}\n{content}\n\n");
    }
    if let Some(sample) = sample_report {
        let _ = write!(
            input,
            "Sample report (style reference only, do not copy its data)\n------------\n{sample}\n"
        );
    }
    input
}

pub fn reviewer_instructions() -> String {
    format!(
        "You are a clinical documentation reviewer. Evaluate the completeness of the \
         Clinical Study Report (CSR) section by section.\n\n\
         Your output MUST contain:\n\
         1) A table listing each major CSR section and its completeness score (0-100).\n\
         2) A narrative rationale for each section score.\n\
         3) A summary of the main gaps.\n\
         4) An overall completeness score (0-100) on a separate line formatted EXACTLY as:\n\
         {COMPLETENESS_MARKER}: <number>\n\n\
         Do not invent clinical results; only judge structure, clarity, and coverage.\n"
    )
}

pub fn compliance_instructions() -> String {
    let checklist = ICH_E3_SECTIONS
        .iter()
        .enumerate()
        .fold(String::new(), |mut acc, (i, section)| {
            let _ = writeln!(acc, "{}. {section}", i + 1);
            acc
        });

    format!(
        "You are a regulatory compliance expert evaluating a Clinical Study Report (CSR) \
         against ICH E3 and common agency expectations.\n\n\
         Your output MUST contain:\n\
         1) Section-by-section assessment of regulatory compliance (compliant/partially/non-compliant).\n\
         2) Rationale for each assessment.\n\
         3) A summary of key deficiencies and recommended actions.\n\
         4) An overall compliance score (0-100) on a separate line formatted EXACTLY as:\n\
         {COMPLIANCE_MARKER}: <number>\n\n\
         Do not invent clinical results; only assess structure, content completeness, \
         and regulatory expectations.\n\n\
         ICH E3 section checklist:\n{checklist}"
    )
}

pub fn reviser_instructions() -> String {
    "You are a senior medical writer revising a Clinical Study Report (CSR) based on \
     a completeness review report and a regulatory compliance report.\n\n\
     Produce an improved CSR in markdown that addresses completeness gaps and compliance \
     issues, improves clarity and structure, and retains all sections and data not \
     flagged as needing change.\n\n\
     Do NOT invent new numerical results or patients; refine only the narrative, \
     structure, and coverage. Return only the revised report text.\n"
        .to_string()
}

pub fn reviser_input(draft: &str, review: &str, compliance: &str) -> String {
    format!(
        "Current CSR\n-----------\n{draft}\n\n\
         Completeness review\n-------------------\n{review}\n\n\
         Compliance review\n-----------------\n{compliance}\n"
    )
}
