//! End-to-end tests of the built-in dashboard plan against a page fixture

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use dashpatch::{
    BackupManager, FileProcessor, PatchPlan, Patcher, ReplacePolicy, Substitution,
    SubstitutionOutcome,
};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("missing fixture {}: {}", path.display(), e))
}

fn dashboard() -> PatchPlan {
    PatchPlan::dashboard().unwrap()
}

fn patcher() -> Patcher {
    dashboard().patcher(None, ReplacePolicy::All)
}

#[test]
fn fixture_contains_every_old_snippet_once() {
    let page = fixture("dash.html");
    for substitution in &dashboard().substitutions {
        assert_eq!(
            page.matches(substitution.old.as_str()).count(),
            1,
            "fixture should contain '{}' exactly once",
            substitution.name
        );
    }
}

#[test]
fn full_plan_produces_expected_page() {
    let report = patcher().apply(&fixture("dash.html"));

    assert_eq!(report.output, fixture("dash.patched.html"));
    assert_eq!(report.applied_count(), 6);
    for step in &report.steps {
        assert_eq!(step.outcome, SubstitutionOutcome::Applied { occurrences: 1 }, "{}", step.name);
    }
}

#[test]
fn patched_page_has_new_snippets_and_no_residual_old_ones() {
    let report = patcher().apply(&fixture("dash.html"));

    for substitution in &dashboard().substitutions {
        assert_eq!(
            report.output.matches(substitution.new.as_str()).count(),
            1,
            "'{}' new text should appear exactly once",
            substitution.name
        );
        if !substitution.is_growing() {
            assert!(
                !report.output.contains(substitution.old.as_str()),
                "'{}' old text should be gone",
                substitution.name
            );
        }
    }
}

#[test]
fn each_pair_applies_on_its_own() {
    let page = fixture("dash.html");

    for substitution in dashboard().substitutions {
        let single = Patcher::new(vec![substitution.clone()], ReplacePolicy::All);
        let report = single.apply(&page);

        assert_eq!(report.steps[0].outcome, SubstitutionOutcome::Applied { occurrences: 1 });
        assert!(report.output.contains(substitution.new.as_str()));
        assert_eq!(
            report.output.replacen(substitution.new.as_str(), substitution.old.as_str(), 1),
            page,
            "'{}' should only touch its own range",
            substitution.name
        );
    }
}

#[test]
fn missing_snippet_is_reported_and_buffer_untouched() {
    let page = fixture("dash.html");
    let plan = dashboard();
    let days = &plan.substitutions[5];
    let drifted = page.replace(days.old.as_str(), "<span>${daysUntilExpiry} days</span>");

    let single = Patcher::new(vec![days.clone()], ReplacePolicy::All);
    let report = single.apply(&drifted);

    assert_eq!(report.steps[0].outcome, SubstitutionOutcome::NotFound);
    assert_eq!(report.output, drifted);
}

#[test]
fn drifted_page_still_gets_the_other_five() {
    let page = fixture("dash.html");
    let plan = dashboard();
    let header = &plan.substitutions[0];
    let drifted = page.replace(header.old.as_str(), "<header>Equipe</header>");

    let report = patcher().apply(&drifted);

    assert_eq!(report.not_found(), vec!["employees-header"]);
    assert_eq!(report.applied_count(), 5);
}

#[test]
fn second_pass_is_a_no_op_for_every_pair() {
    let first = patcher().apply(&fixture("dash.html"));
    let second = patcher().apply(&first.output);

    assert_eq!(second.output, first.output);
    for step in &second.steps {
        assert_eq!(step.outcome, SubstitutionOutcome::AlreadyApplied, "{}", step.name);
    }
}

#[test]
fn admin_button_line_is_not_duplicated_on_rerun() {
    let first = patcher().apply(&fixture("dash.html"));
    let second = patcher().apply(&first.output);

    let line = "document.getElementById('manageUsersBtn').classList.remove('hidden');";
    // once for admins, once for managers
    assert_eq!(second.output.matches(line).count(), 2);
}

#[test]
fn crlf_page_is_patched_and_stays_crlf() {
    let crlf_page = fixture("dash.html").replace('\n', "\r\n");
    let report = patcher().apply(&crlf_page);

    assert_eq!(report.applied_count(), 6);
    assert_eq!(report.output, fixture("dash.patched.html").replace('\n', "\r\n"));
    assert!(!report.output.replace("\r\n", "").contains('\n'));
}

#[test]
fn page_with_one_crlf_line_still_gets_every_pair() {
    let mixed = fixture("dash.html").replacen('\n', "\r\n", 1);
    let report = patcher().apply(&mixed);

    assert!(report.is_complete(), "not found: {:?}", report.not_found());
    assert_eq!(report.applied_count(), 6);
    assert_eq!(report.output, fixture("dash.patched.html").replacen('\n', "\r\n", 1));
}

fn alternate_line_endings(text: &str) -> String {
    text.split_inclusive('\n')
        .enumerate()
        .map(|(index, line)| {
            if index % 2 == 0 {
                line.replacen('\n', "\r\n", 1)
            } else {
                line.to_string()
            }
        })
        .collect()
}

#[test]
fn alternating_line_endings_patch_like_lf() {
    let mixed = alternate_line_endings(&fixture("dash.html"));
    let first = patcher().apply(&mixed);

    assert_eq!(first.applied_count(), 6);
    assert_eq!(first.output.replace("\r\n", "\n"), fixture("dash.patched.html"));

    let second = patcher().apply(&first.output);
    assert_eq!(second.output, first.output);
    assert_eq!(second.already_applied_count(), 6);
}

#[test]
fn apply_to_file_writes_utf8_page_and_backup_restores_it() {
    let temp_dir = TempDir::new().unwrap();
    let page_path = temp_dir.path().join("dash.html");
    fs::write(&page_path, fixture("dash.html")).unwrap();

    let manager = BackupManager::with_directory(temp_dir.path().join("backups")).unwrap();
    let backup_id = manager
        .create_backup("dashboard", std::slice::from_ref(&page_path))
        .unwrap();

    let diff = FileProcessor::new(patcher()).apply_to_file(&page_path).unwrap();
    assert!(diff.written);
    assert_eq!(fs::read_to_string(&page_path).unwrap(), fixture("dash.patched.html"));
    assert!(fs::read_to_string(&page_path).unwrap().contains("Funcionários"));

    manager.restore_backup(&backup_id).unwrap();
    assert_eq!(fs::read_to_string(&page_path).unwrap(), fixture("dash.html"));
}

#[test]
fn strict_mode_leaves_drifted_file_alone() {
    let temp_dir = TempDir::new().unwrap();
    let page_path = temp_dir.path().join("dash.html");
    let drifted = fixture("dash.html").replace("Math.ceil", "Math.round");
    fs::write(&page_path, &drifted).unwrap();

    let result = FileProcessor::new(patcher()).strict(true).apply_to_file(&page_path);

    let err = result.unwrap_err();
    assert!(err.to_string().contains("expiry-date-timezone"));
    assert_eq!(fs::read_to_string(&page_path).unwrap(), drifted);
}

#[test]
fn custom_plan_file_drives_the_patcher() {
    let temp_dir = TempDir::new().unwrap();
    let plan_path = temp_dir.path().join("plan.toml");
    let plan_toml = r#"name = "title"
policy = "first"

[[substitution]]
name = "title"
old = "Painel"
new = "Dashboard"
"#;
    fs::write(&plan_path, plan_toml).unwrap();

    let plan = PatchPlan::load(&plan_path).unwrap();
    let report = plan.patcher(None, ReplacePolicy::All).apply("Painel / Painel");

    assert_eq!(report.output, "Dashboard / Painel");
    assert_eq!(plan.substitutions[0], Substitution::new("title", "Painel", "Dashboard").unwrap());
}
