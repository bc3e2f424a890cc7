use crate::builder::normalize_label;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// The typed record a reader hands to the pipeline: two row-ordered label columns.
///
/// Construction normalizes every label (see [`normalize_label`]) and drops blank ones, mirroring how empty spreadsheet cells are
/// skipped rather than substituted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawInput")]
pub struct BowtieInput {
    threats: Vec<String>,
    consequences: Vec<String>,
}

#[derive(Deserialize)]
struct RawInput {
    #[serde(default)]
    threats: Vec<String>,
    #[serde(default)]
    consequences: Vec<String>,
}

impl From<RawInput> for BowtieInput {
    fn from(raw: RawInput) -> Self {
        Self::new(raw.threats, raw.consequences)
    }
}

fn clean<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    labels
        .into_iter()
        .map(|s| normalize_label(s.as_ref()))
        .filter(|label| !label.is_empty())
        .collect()
}

impl BowtieInput {
    pub fn new<T, C>(threats: T, consequences: C) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        Self {
            threats: clean(threats),
            consequences: clean(consequences),
        }
    }

    pub fn threats(&self) -> &[String] {
        &self.threats
    }

    pub fn consequences(&self) -> &[String] {
        &self.consequences
    }

    pub fn is_empty(&self) -> bool {
        self.threats.is_empty() && self.consequences.is_empty()
    }

    /// Newline-joined threat labels, as handed to the suggestion prompt.
    pub fn threats_text(&self) -> String {
        self.threats.join("\n")
    }

    /// Newline-joined consequence labels, as handed to the suggestion prompt.
    pub fn consequences_text(&self) -> String {
        self.consequences.join("\n")
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidInput {
            message: e.to_string(),
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::InvalidInput {
            message: e.to_string(),
        })
    }
}
