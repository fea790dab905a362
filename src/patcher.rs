//! Sequential literal text patcher
//!
//! Applies an ordered list of substitutions to an in-memory buffer, each step
//! seeing the result of the previous one, and records what every step did.

use crate::substitution::{LineEnding, ReplacePolicy, Substitution, SubstitutionOutcome};
use serde::Serialize;
use tracing::{debug, warn};

/// Outcome of one step, tagged with the substitution's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: SubstitutionOutcome,
}

/// Patched text plus one step report per substitution, in plan order
#[derive(Debug, Clone, Serialize)]
pub struct PatchReport {
    #[serde(skip)]
    pub output: String,
    pub steps: Vec<StepReport>,
}

impl PatchReport {
    pub fn applied_count(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_applied()).count()
    }

    pub fn already_applied_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.outcome == SubstitutionOutcome::AlreadyApplied)
            .count()
    }

    /// Names of steps whose old text was not found
    pub fn not_found(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.outcome.is_not_found())
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| !s.outcome.is_not_found())
    }
}

pub struct Patcher {
    substitutions: Vec<Substitution>,
    policy: ReplacePolicy,
}

impl Patcher {
    pub fn new(substitutions: Vec<Substitution>, policy: ReplacePolicy) -> Self {
        Self {
            substitutions,
            policy,
        }
    }

    pub fn policy(&self) -> ReplacePolicy {
        self.policy
    }

    /// Run every substitution against `input` in order
    ///
    /// Matching ignores the difference between `\n` and `\r\n`, so a plan
    /// written with `\n` also patches CRLF and mixed-ending pages.
    pub fn apply(&self, input: &str) -> PatchReport {
        let mut buffer = input.to_string();
        let mut steps = Vec::with_capacity(self.substitutions.len());

        for substitution in &self.substitutions {
            let (patched, outcome) = apply_one(&buffer, substitution, self.policy);

            match outcome {
                SubstitutionOutcome::Applied { occurrences } => {
                    debug!(step = %substitution.name, occurrences, "substitution applied");
                }
                SubstitutionOutcome::AlreadyApplied => {
                    debug!(step = %substitution.name, "substitution already applied");
                }
                SubstitutionOutcome::NotFound => {
                    warn!(step = %substitution.name, "substitution target not found");
                }
            }

            if let Some(patched) = patched {
                buffer = patched;
            }
            steps.push(StepReport {
                name: substitution.name.clone(),
                outcome,
            });
        }

        PatchReport {
            output: buffer,
            steps,
        }
    }
}

/// Apply a single substitution; `None` means the buffer is unchanged
///
/// Each inserted `new` text takes the line ending of the line its match
/// ends on. Bytes outside the matches are copied through untouched.
pub fn apply_one(
    buffer: &str,
    substitution: &Substitution,
    policy: ReplacePolicy,
) -> (Option<String>, SubstitutionOutcome) {
    let old = LineEnding::Lf.apply(&substitution.old);
    let new = LineEnding::Lf.apply(&substitution.new);
    if old.is_empty() {
        return (None, SubstitutionOutcome::NotFound);
    }

    let view = LfView::new(buffer);
    let matches = eligible_matches(&view.text, &old, &new, policy);

    if matches.is_empty() {
        let outcome = if view.text.contains(new.as_str()) {
            SubstitutionOutcome::AlreadyApplied
        } else {
            SubstitutionOutcome::NotFound
        };
        return (None, outcome);
    }

    let mut output = String::with_capacity(buffer.len() + new.len() * matches.len());
    let mut last_end = 0;
    for &pos in &matches {
        let end = pos + old.len();
        output.push_str(&buffer[last_end..view.original_offset(pos)]);
        output.push_str(&view.ending_at(end).apply(&new));
        last_end = view.original_offset(end);
    }
    output.push_str(&buffer[last_end..]);

    let occurrences = matches.len();
    (Some(output), SubstitutionOutcome::Applied { occurrences })
}

/// A buffer with every `\r\n` folded to `\n`
struct LfView {
    text: String,
    /// Offsets in `text` of the `\n`s that were `\r\n`, ascending
    crlf_breaks: Vec<usize>,
}

impl LfView {
    fn new(buffer: &str) -> Self {
        let mut text = String::with_capacity(buffer.len());
        let mut crlf_breaks = Vec::new();
        let mut rest = buffer;

        while let Some(index) = rest.find("\r\n") {
            text.push_str(&rest[..index]);
            crlf_breaks.push(text.len());
            text.push('\n');
            rest = &rest[index + 2..];
        }
        text.push_str(rest);

        Self { text, crlf_breaks }
    }

    /// Map an offset in `text` back to the original buffer
    fn original_offset(&self, pos: usize) -> usize {
        pos + self.crlf_breaks.partition_point(|&newline| newline < pos)
    }

    /// Line ending of the line that a match ending at `end` sits on
    fn ending_at(&self, end: usize) -> LineEnding {
        let newline = if self.text[..end].ends_with('\n') {
            Some(end - 1)
        } else {
            self.text[end..]
                .find('\n')
                .map(|i| end + i)
                .or_else(|| self.text[..end].rfind('\n'))
        };

        match newline {
            Some(newline) if self.crlf_breaks.binary_search(&newline).is_ok() => LineEnding::Crlf,
            _ => LineEnding::Lf,
        }
    }
}

/// Offsets of the occurrences of `old` that are not already part of an occurrence of `new`
///
/// When `new` contains `old`, a match sitting at one of those inner offsets
/// inside an existing `new` is the product of an earlier run and is skipped.
fn eligible_matches(text: &str, old: &str, new: &str, policy: ReplacePolicy) -> Vec<usize> {
    let inner_offsets: Vec<usize> = new.match_indices(old).map(|(offset, _)| offset).collect();
    let bytes = text.as_bytes();
    let mut positions = Vec::new();

    for (pos, _) in text.match_indices(old) {
        let already_patched = inner_offsets
            .iter()
            .any(|&offset| pos >= offset && bytes[pos - offset..].starts_with(new.as_bytes()));
        if already_patched {
            continue;
        }

        positions.push(pos);
        if policy == ReplacePolicy::First {
            break;
        }
    }

    positions
}
