//! Prompt text for the suggestion side channel.
//!
//! The pipeline only supplies plain text here: the hazard and the two newline-joined label blocks.
//! Whatever the completion service answers is shown verbatim and never parsed.

use crate::BowtieInput;
use serde::Serialize;

pub const SYSTEM_PROMPT: &str = "You are a process safety engineer experienced in bowtie risk analysis. \
Answer concisely using short bulleted lists.";

/// A rendered request for additional threats, consequences and controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionPrompt {
    pub system: String,
    pub user: String,
}

impl SuggestionPrompt {
    pub fn new(hazard: &str, input: &BowtieInput) -> Self {
        Self::from_blocks(hazard, &input.threats_text(), &input.consequences_text())
    }

    pub fn from_blocks(hazard: &str, threats: &str, consequences: &str) -> Self {
        let hazard = hazard.split_whitespace().collect::<Vec<_>>().join(" ");
        let threats = or_none(threats);
        let consequences = or_none(consequences);
        let user = format!(
            "Top event: {hazard}\n\
\n\
Known threats:\n{threats}\n\
\n\
Known consequences:\n{consequences}\n\
\n\
Suggest:\n\
1. Additional threats that could lead to the top event.\n\
2. Additional consequences that could follow from the top event.\n\
3. Preventive controls (barriers between threats and the top event).\n\
4. Mitigative controls (barriers between the top event and its consequences).\n"
        );
        Self {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}

fn or_none(block: &str) -> &str {
    if block.trim().is_empty() {
        "(none listed)"
    } else {
        block
    }
}
