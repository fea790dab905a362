use anyhow::{Context, Result};
use dashpatch::backup_manager::BackupManager;
use dashpatch::cli::{parse_args, ApplyOpts, Args};
use dashpatch::config::{self, Config};
use dashpatch::diff_formatter::DiffFormatter;
use dashpatch::file_processor::{FileDiff, FileProcessor};
use dashpatch::logger;
use dashpatch::patcher::PatchReport;
use dashpatch::plan::PatchPlan;
use std::fs;
use std::path::Path;
use std::process::{Command, ExitCode};

fn main() -> Result<ExitCode> {
    let args = parse_args();
    let config_path = config::config_file_path()?;
    let config = config::read_config_from(&config_path)?;

    let _log =
        logger::init_debug_logging(args.debug() || config.logging.debug, &config::config_dir()?)?;

    match args {
        Args::Apply(opts) => {
            config::check_config(&config, &config_path)?;
            apply(&opts, &config)
        }
        Args::Check { file, plan, json } => {
            config::check_config(&config, &config_path)?;
            check(file.as_deref(), plan.as_deref(), json, &config)
        }
        Args::Plan { plan, export } => {
            show_plan(plan.as_deref(), export, &config)?;
            Ok(ExitCode::SUCCESS)
        }
        Args::Rollback { id } => {
            rollback(id, &config)?;
            Ok(ExitCode::SUCCESS)
        }
        Args::History => {
            show_history(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        Args::Config { show } => {
            if show {
                show_config(&config, &config_path)?;
            } else {
                edit_config(&config_path)?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Success only when no substitution's target went missing
fn exit_status(report: &PatchReport) -> ExitCode {
    if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn load_plan(path: Option<&Path>) -> Result<PatchPlan> {
    match path {
        Some(path) => PatchPlan::load(path),
        None => PatchPlan::dashboard(),
    }
}

fn backup_manager(config: &Config) -> Result<BackupManager> {
    config::validate_backup_config(&config.backup)?;
    let manager = match &config.backup.backup_dir {
        Some(dir) => BackupManager::with_directory(dir)?,
        None => BackupManager::new()?,
    };
    Ok(manager.max_backups(config.backup.max_backups))
}

fn print_report(formatter: &DiffFormatter, diff: &FileDiff, json: bool) -> Result<()> {
    if json {
        let report = serde_json::json!({
            "file": diff.file_path.display().to_string(),
            "written": diff.written,
            "complete": diff.report.is_complete(),
            "steps": diff.report.steps,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print!("{}", formatter.format_report(&diff.file_path, &diff.report));
    }
    Ok(())
}

fn apply(opts: &ApplyOpts, config: &Config) -> Result<ExitCode> {
    let plan = load_plan(opts.plan.as_deref())?;
    let target = plan.resolve_target(opts.file.as_deref(), &config.patch.target);
    let strict = opts.strict || config.patch.strict;
    let context = opts.context_lines(config.output.context_lines);

    let processor =
        FileProcessor::new(plan.patcher(opts.policy, config.patch.policy)).strict(strict);
    let formatter = DiffFormatter::new(config.output.color_choice());

    let preview = processor.preview(&target)?;

    if opts.dry_run {
        if !opts.json {
            print!("{}", formatter.format_dry_run_header(&plan.name));
        }
        print_report(&formatter, &preview, opts.json)?;
        if !opts.json {
            print!("\n{}", formatter.format_diff(&preview, context));
        }
        return Ok(ExitCode::SUCCESS);
    }

    if strict && !preview.report.is_complete() {
        print_report(&formatter, &preview, opts.json)?;
        anyhow::bail!(
            "Strict mode: {} left unchanged, missing: {}",
            target.display(),
            preview.report.not_found().join(", ")
        );
    }

    let backup_id = if preview.has_changes() && config.backup.enabled && !opts.no_backup {
        let manager = backup_manager(config)?;
        Some(manager.create_backup(&plan.name, std::slice::from_ref(&target))?)
    } else {
        None
    };

    let diff = processor.commit(preview)?;

    print_report(&formatter, &diff, opts.json)?;
    if opts.json {
        return Ok(ExitCode::SUCCESS);
    }

    print!("\n{}", formatter.format_diff(&diff, context));
    for name in diff.report.not_found() {
        eprintln!(
            "Warning: '{}' not found in {}; page differs from the expected baseline",
            name,
            diff.file_path.display()
        );
    }
    print!("\n{}", formatter.format_summary(&diff));

    if let Some(id) = backup_id {
        println!("Backup ID: {}", id);
        println!("Rollback with: dashpatch rollback {}", id);
    }

    Ok(ExitCode::SUCCESS)
}

fn check(
    file: Option<&Path>,
    plan: Option<&Path>,
    json: bool,
    config: &Config,
) -> Result<ExitCode> {
    let plan = load_plan(plan)?;
    let target = plan.resolve_target(file, &config.patch.target);
    let processor = FileProcessor::new(plan.patcher(None, config.patch.policy));
    let formatter = DiffFormatter::new(config.output.color_choice());

    let diff = processor.preview(&target)?;
    print_report(&formatter, &diff, json)?;

    Ok(exit_status(&diff.report))
}

fn show_plan(plan: Option<&Path>, export: bool, config: &Config) -> Result<()> {
    let plan = load_plan(plan)?;

    if export {
        print!("{}", plan.to_toml_string()?);
    } else {
        let formatter = DiffFormatter::new(config.output.color_choice());
        print!("{}", formatter.format_plan(&plan));
    }

    Ok(())
}

fn rollback(id: Option<String>, config: &Config) -> Result<()> {
    let manager = backup_manager(config)?;

    let backup_id = match id {
        Some(id) => id,
        None => match manager.get_last_backup_id()? {
            Some(id) => {
                println!("Rolling back last patch: {}\n", id);
                id
            }
            None => anyhow::bail!("No backups found to rollback"),
        },
    };

    for path in manager.restore_backup(&backup_id)? {
        println!("Restored: {}", path.display());
    }
    println!("\nRollback complete");

    Ok(())
}

fn show_history(config: &Config) -> Result<()> {
    let manager = backup_manager(config)?;
    let backups = manager.list_backups()?;
    let formatter = DiffFormatter::new(config.output.color_choice());

    print!("{}", formatter.format_history(&backups));

    Ok(())
}

fn show_config(config: &Config, config_path: &Path) -> Result<()> {
    println!("# {}\n", config_path.display());
    print!(
        "{}",
        toml::to_string_pretty(config).context("Failed to serialize config")?
    );
    if let Err(e) = config::check_config(config, config_path) {
        eprintln!("\nWarning: {:#}\nRun 'dashpatch config' to fix it", e);
    }
    Ok(())
}

/// Edit a copy of the config and only replace the real file if the copy validates
fn edit_config(config_path: &Path) -> Result<()> {
    let editor = config::find_editor()?;

    let scratch = tempfile::Builder::new()
        .prefix("dashpatch-config-")
        .suffix(".toml")
        .tempfile()
        .context("Failed to create scratch file for editing")?;
    fs::copy(config_path, scratch.path())
        .with_context(|| format!("Failed to copy config file: {}", config_path.display()))?;

    let status = Command::new(&editor.program)
        .args(&editor.args)
        .arg(scratch.path())
        .status()
        .with_context(|| format!("Failed to launch editor: {}", editor.program.display()))?;

    if !status.success() {
        anyhow::bail!("Editor exited with {}; config not updated", status);
    }

    let edited = fs::read_to_string(scratch.path()).context("Failed to read edited config")?;
    if let Err(e) = config::check_config_str(&edited) {
        anyhow::bail!("{:#}\nConfig not updated: {}", e, config_path.display());
    }

    fs::write(config_path, edited)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
    println!("Config updated: {}", config_path.display());

    Ok(())
}
