//! Substitution pairs and their per-step outcomes
//!
//! A substitution is a fixed (old text, new text) pair matched literally
//! against the buffer. There is no pattern syntax: every byte of `old` must
//! appear verbatim.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal (old, new) text pair with a stable name for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub old: String,
    pub new: String,
}

impl Substitution {
    pub fn new(
        name: impl Into<String>,
        old: impl Into<String>,
        new: impl Into<String>,
    ) -> Result<Self> {
        let substitution = Self {
            name: name.into(),
            description: None,
            old: old.into(),
            new: new.into(),
        };
        substitution.validate()?;
        Ok(substitution)
    }

    /// Reject pairs that could never produce a meaningful edit
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Substitution has an empty name");
        }
        if self.old.is_empty() {
            anyhow::bail!("Substitution '{}' has empty old text", self.name);
        }
        if self.old == self.new {
            anyhow::bail!("Substitution '{}' replaces text with itself", self.name);
        }
        Ok(())
    }

    /// True when the new text still contains the old text (e.g. appending a line)
    pub fn is_growing(&self) -> bool {
        self.new.contains(self.old.as_str())
    }
}

/// How many eligible occurrences a step replaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacePolicy {
    /// Only the first eligible occurrence
    First,
    /// Every eligible occurrence, left to right, non-overlapping
    #[default]
    All,
}

impl ReplacePolicy {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "first" => Ok(Self::First),
            "all" => Ok(Self::All),
            other => anyhow::bail!("Invalid policy: {} (must be 'first' or 'all')", other),
        }
    }
}

impl fmt::Display for ReplacePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Line terminator of a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    Crlf,
}

impl LineEnding {
    /// Rewrite every line break in `text` to this ending
    pub fn apply(&self, text: &str) -> String {
        let lf = text.replace("\r\n", "\n");
        match self {
            Self::Lf => lf,
            Self::Crlf => lf.replace('\n', "\r\n"),
        }
    }
}

/// What a single step did to the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubstitutionOutcome {
    /// Old text was found and replaced
    Applied { occurrences: usize },
    /// Old text is gone but new text is already there
    AlreadyApplied,
    /// Neither text is present; buffer left unchanged
    NotFound,
}

impl SubstitutionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
