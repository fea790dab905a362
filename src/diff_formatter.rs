use crate::backup_manager::BackupMetadata;
use crate::file_processor::FileDiff;
use crate::patcher::PatchReport;
use crate::plan::PatchPlan;
use crate::substitution::SubstitutionOutcome;
use colored::*;
use similar::{ChangeTag, TextDiff};
use std::io::IsTerminal;
use std::path::Path;

/// When to emit ANSI colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(Self::Auto),
            "always" => Some(Self::Always),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

pub struct DiffFormatter {
    use_color: bool,
}

impl DiffFormatter {
    pub fn new(choice: ColorChoice) -> Self {
        let use_color = match choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            // https://no-color.org/
            ColorChoice::Auto => {
                std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
            }
        };
        colored::control::set_override(use_color);
        Self { use_color }
    }

    pub fn plain() -> Self {
        Self { use_color: false }
    }

    /// One line per step plus a totals line
    pub fn format_report(&self, file_path: &Path, report: &PatchReport) -> String {
        let mut output = String::new();
        let file_name = file_path.display().to_string();
        output.push_str(&format!("{}\n", self.paint(&file_name, |s| s.bold().cyan())));

        for step in &report.steps {
            let line = match step.outcome {
                SubstitutionOutcome::Applied { occurrences } => {
                    let times = if occurrences == 1 {
                        "1 occurrence".to_string()
                    } else {
                        format!("{} occurrences", occurrences)
                    };
                    format!(
                        "  {} {} ({})",
                        self.paint("+", |s| s.green().bold()),
                        step.name,
                        times
                    )
                }
                SubstitutionOutcome::AlreadyApplied => format!(
                    "  {} {} (already applied)",
                    self.paint("=", |s| s.dimmed()),
                    step.name
                ),
                SubstitutionOutcome::NotFound => format!(
                    "  {} {} ({})",
                    self.paint("!", |s| s.red().bold()),
                    step.name,
                    self.paint("not found", |s| s.red())
                ),
            };
            output.push_str(&line);
            output.push('\n');
        }

        let missing = report.not_found().len();
        let missing = if missing > 0 {
            self.paint(&missing.to_string(), |s| s.red().bold())
        } else {
            missing.to_string()
        };
        output.push_str(&format!(
            "\nTotal: {} applied, {} already applied, {} not found\n",
            report.applied_count(),
            report.already_applied_count(),
            missing
        ));

        output
    }

    /// Unified line diff between original and patched text
    pub fn format_diff(&self, diff: &FileDiff, context_lines: usize) -> String {
        if !diff.has_changes() {
            return String::new();
        }

        let text_diff = TextDiff::from_lines(diff.original.as_str(), diff.patched());
        let mut output = String::new();

        for (index, group) in text_diff.grouped_ops(context_lines).iter().enumerate() {
            if index > 0 {
                output.push_str(&format!("{}\n", self.paint("...", |s| s.dimmed())));
            }
            for op in group {
                for change in text_diff.iter_changes(op) {
                    let line_number = change
                        .new_index()
                        .or(change.old_index())
                        .map(|i| i + 1)
                        .unwrap_or(0);
                    let content = change.value().trim_end_matches(['\r', '\n']);
                    let line = match change.tag() {
                        ChangeTag::Equal => {
                            format!("L{}:   {}", line_number, self.paint(content, |s| s.dimmed()))
                        }
                        ChangeTag::Delete => format!(
                            "L{}: {} {}",
                            line_number,
                            self.paint("-", |s| s.red().bold()),
                            self.paint(content, |s| s.red())
                        ),
                        ChangeTag::Insert => format!(
                            "L{}: {} {}",
                            line_number,
                            self.paint("+", |s| s.green().bold()),
                            self.paint(content, |s| s.green())
                        ),
                    };
                    output.push_str(&line);
                    output.push('\n');
                }
            }
        }

        output
    }

    pub fn format_dry_run_header(&self, plan: &str) -> String {
        if self.use_color {
            format!("{} {}\n\n", "Dry run:".bold().cyan(), plan.white().bold())
        } else {
            format!("Dry run: {}\n\n", plan)
        }
    }

    /// How many substitutions actually landed, and where
    pub fn format_summary(&self, diff: &FileDiff) -> String {
        let total = diff.report.steps.len();
        let applied = diff.report.applied_count();
        let path = diff.file_path.display();
        let message = if !diff.written {
            format!(
                "No changes written to {} ({} of {} substitutions applicable)",
                path, applied, total
            )
        } else {
            format!("Applied {} of {} substitutions to {}", applied, total, path)
        };

        if diff.report.is_complete() {
            format!("{}\n", self.paint(&message, |s| s.green().bold()))
        } else {
            format!("{}\n", self.paint(&message, |s| s.yellow().bold()))
        }
    }

    pub fn format_plan(&self, plan: &PatchPlan) -> String {
        let mut output = format!("Plan: {}\n", self.paint(&plan.name, |s| s.bold().white()));
        if let Some(target) = &plan.target {
            output.push_str(&format!("Target: {}\n", target.display()));
        }
        if let Some(policy) = plan.policy {
            output.push_str(&format!("Policy: {}\n", policy));
        }
        output.push('\n');

        for (index, substitution) in plan.substitutions.iter().enumerate() {
            output.push_str(&format!(
                "{}. {}\n",
                index + 1,
                self.paint(&substitution.name, |s| s.yellow())
            ));
            if let Some(description) = &substitution.description {
                output.push_str(&format!("   {}\n", description));
            }
            output.push_str(&format!(
                "   {} line(s) -> {} line(s)\n",
                substitution.old.lines().count(),
                substitution.new.lines().count()
            ));
        }

        output
    }

    pub fn format_history(&self, backups: &[BackupMetadata]) -> String {
        if backups.is_empty() {
            return "No backup history found.\n".to_string();
        }

        let mut output = self.paint("Operation History:\n\n", |s| s.bold().white());

        // Most recent first
        for backup in backups.iter().rev() {
            output.push_str(&format!("ID: {}\n", self.paint(&backup.id, |s| s.yellow())));
            let time = backup.timestamp.format("%Y-%m-%d %H:%M:%S");
            output.push_str(&format!("  Time: {}\n", time));
            output.push_str(&format!("  Plan: {}\n", self.paint(&backup.plan, |s| s.cyan())));
            for file in &backup.files {
                output.push_str(&format!("  File: {}\n", file.original_path.display()));
            }
            output.push('\n');
        }

        output
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.use_color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }
}
