//! Patch plans: named, ordered lists of substitutions
//!
//! Plans are TOML documents. The dashboard plan ships inside the binary;
//! custom plans can be loaded from disk with `--plan`.

use crate::patcher::Patcher;
use crate::substitution::{ReplacePolicy, Substitution};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const DASHBOARD_PLAN: &str = include_str!("plans/dashboard.toml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchPlan {
    pub name: String,

    /// File the plan is meant for, used when no file is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,

    /// Overrides the configured policy when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<ReplacePolicy>,

    #[serde(rename = "substitution", default)]
    pub substitutions: Vec<Substitution>,
}

impl PatchPlan {
    /// The built-in franchise dashboard plan
    pub fn dashboard() -> Result<Self> {
        Self::from_toml_str(DASHBOARD_PLAN).context("Built-in dashboard plan is invalid")
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let plan: PatchPlan = toml::from_str(content).context("Failed to parse patch plan")?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read patch plan: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid patch plan: {}", path.display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize patch plan")
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Patch plan has an empty name");
        }
        if self.substitutions.is_empty() {
            anyhow::bail!("Patch plan '{}' has no substitutions", self.name);
        }

        let mut seen = HashSet::new();
        for substitution in &self.substitutions {
            substitution.validate()?;
            if !seen.insert(substitution.name.as_str()) {
                anyhow::bail!(
                    "Patch plan '{}' has duplicate substitution name '{}'",
                    self.name,
                    substitution.name
                );
            }
        }

        Ok(())
    }

    /// Build a patcher; a policy from the command line beats the plan's,
    /// which beats the configured one
    pub fn patcher(&self, requested: Option<ReplacePolicy>, configured: ReplacePolicy) -> Patcher {
        let policy = requested.or(self.policy).unwrap_or(configured);
        Patcher::new(self.substitutions.clone(), policy)
    }

    /// Explicit file first, then the plan's target, then the configured one
    pub fn resolve_target(&self, explicit: Option<&Path>, configured: &Path) -> PathBuf {
        explicit
            .or(self.target.as_deref())
            .unwrap_or(configured)
            .to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SMALL_PLAN: &str = r#"
name = "small"

[[substitution]]
name = "first"
old = "a"
new = "b"

[[substitution]]
name = "second"
description = "two lines"
old = '''
x
y'''
new = '''
x
y
z'''
"#;

    #[test]
    fn test_dashboard_plan_has_six_substitutions() {
        let plan = PatchPlan::dashboard().unwrap();
        assert_eq!(plan.name, "dashboard");
        assert_eq!(plan.target, Some(PathBuf::from("public/dash.html")));
        assert_eq!(plan.policy, Some(ReplacePolicy::All));

        let names: Vec<&str> = plan.substitutions.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "employees-header",
                "admin-manage-button",
                "manager-manage-button",
                "hide-admin-employees",
                "expiry-date-timezone",
                "expiry-days-label",
            ]
        );
    }

    #[test]
    fn test_dashboard_plan_texts() {
        let plan = PatchPlan::dashboard().unwrap();
        let header = &plan.substitutions[0];
        assert!(header.old.starts_with("                <div class=\"p-4 border-b\">\n"));
        assert!(header.new.contains("id=\"manageUsersBtn\""));
        assert!(!header.old.ends_with('\n'));

        let admin = &plan.substitutions[1];
        assert!(admin.is_growing());
        let show_button = "document.getElementById('manageUsersBtn').classList.remove('hidden');";
        assert!(admin.new.ends_with(show_button));

        let date = &plan.substitutions[4];
        assert!(date.new.contains("product.expiry_date + 'T00:00:00-03:00'"));

        let days = &plan.substitutions[5];
        assert!(days.old.contains("(${daysUntilExpiry}d)"));
        assert!(days.new.contains("${daysUntilExpiry === 1 ? 'dia' : 'dias'}"));
    }

    #[test]
    fn test_parse_multiline_literal_strings() {
        let plan = PatchPlan::from_toml_str(SMALL_PLAN).unwrap();
        assert_eq!(plan.substitutions[1].old, "x\ny");
        assert_eq!(plan.substitutions[1].new, "x\ny\nz");
        assert_eq!(plan.substitutions[1].description.as_deref(), Some("two lines"));
        assert_eq!(plan.target, None);
        assert_eq!(plan.policy, None);
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let toml = r#"
name = "dup"
[[substitution]]
name = "same"
old = "a"
new = "b"
[[substitution]]
name = "same"
old = "c"
new = "d"
"#;
        let err = PatchPlan::from_toml_str(toml).unwrap_err();
        assert!(format!("{:#}", err).contains("duplicate substitution name 'same'"));
    }

    #[test]
    fn test_rejects_empty_plan() {
        let err = PatchPlan::from_toml_str("name = \"empty\"\n").unwrap_err();
        assert!(err.to_string().contains("no substitutions"));
    }

    #[test]
    fn test_rejects_empty_old_text() {
        let toml = "name = \"p\"\n[[substitution]]\nname = \"blank\"\nold = \"\"\nnew = \"x\"\n";
        let err = PatchPlan::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("empty old text"));
    }

    #[test]
    fn test_rejects_unknown_policy() {
        let toml = r#"
name = "p"
policy = "some"

[[substitution]]
name = "s"
old = "a"
new = "b"
"#;
        assert!(PatchPlan::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_export_and_reload_dashboard_plan() {
        let plan = PatchPlan::dashboard().unwrap();
        let exported = plan.to_toml_string().unwrap();
        let reloaded = PatchPlan::from_toml_str(&exported).unwrap();
        assert_eq!(reloaded, plan);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SMALL_PLAN.as_bytes()).unwrap();
        let plan = PatchPlan::load(file.path()).unwrap();
        assert_eq!(plan.name, "small");
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = PatchPlan::load(Path::new("/nonexistent/plan.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/plan.toml"));
    }

    #[test]
    fn test_policy_precedence() {
        let mut plan = PatchPlan::from_toml_str(SMALL_PLAN).unwrap();
        assert_eq!(plan.patcher(None, ReplacePolicy::First).policy(), ReplacePolicy::First);

        plan.policy = Some(ReplacePolicy::All);
        assert_eq!(plan.patcher(None, ReplacePolicy::First).policy(), ReplacePolicy::All);
        assert_eq!(
            plan.patcher(Some(ReplacePolicy::First), ReplacePolicy::All).policy(),
            ReplacePolicy::First
        );
    }

    #[test]
    fn test_resolve_target_precedence() {
        let configured = Path::new("configured.html");
        let mut plan = PatchPlan::from_toml_str(SMALL_PLAN).unwrap();
        assert_eq!(plan.resolve_target(None, configured), PathBuf::from("configured.html"));

        plan.target = Some(PathBuf::from("plan.html"));
        assert_eq!(plan.resolve_target(None, configured), PathBuf::from("plan.html"));
        assert_eq!(
            plan.resolve_target(Some(Path::new("cli.html")), configured),
            PathBuf::from("cli.html")
        );
    }
}
