//! Configuration management for dashpatch
//!
//! dashpatch stores configuration in ~/.dashpatch/config.toml

use crate::backup_manager::DEFAULT_MAX_BACKUPS;
use crate::diff_formatter::ColorChoice;
use crate::substitution::ReplacePolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TARGET: &str = "public/dash.html";

const DEFAULT_CONFIG: &str = r#"# dashpatch Configuration File
#
# Values set here can be overridden by command-line flags.
# Run 'dashpatch config' to edit this file.

[patch]
# Page patched when no file is given and the plan names no target
target = "public/dash.html"

# "all" replaces every occurrence of a substitution's old text,
# "first" only the first one
policy = "all"

# Refuse to write the page unless every substitution is found
strict = false

[backup]
# Copy the page to ~/.dashpatch/backups/ before writing it
enabled = true

# Number of backups to keep (1-1000)
max_backups = 50

# Custom backup directory (optional)
#backup_dir = "/mnt/backups/dashpatch"

[output]
# Unchanged lines shown around each change (max 20)
context_lines = 3

# "auto", "always" or "never"
color = "auto"

[logging]
# Write a debug log to ~/.dashpatch/dashpatch.log
debug = false
"#;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub patch: PatchConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchConfig {
    #[serde(default = "default_target")]
    pub target: PathBuf,

    #[serde(default)]
    pub policy: ReplacePolicy,

    #[serde(default)]
    pub strict: bool,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            policy: ReplacePolicy::All,
            strict: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_backups: DEFAULT_MAX_BACKUPS,
            backup_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
            color: default_color(),
        }
    }
}

impl OutputConfig {
    pub fn color_choice(&self) -> ColorChoice {
        ColorChoice::parse(&self.color).unwrap_or(ColorChoice::Auto)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub debug: bool,
}

fn default_target() -> PathBuf {
    PathBuf::from(DEFAULT_TARGET)
}

fn default_true() -> bool {
    true
}

fn default_max_backups() -> usize {
    DEFAULT_MAX_BACKUPS
}

fn default_context_lines() -> usize {
    3
}

fn default_color() -> String {
    "auto".to_string()
}

/// ~/.dashpatch, created on first use
pub fn config_dir() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;

    let config_dir = home_dir.join(".dashpatch");
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;

    Ok(config_dir)
}

pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Read configuration from `path` without range checks
///
/// A missing file is created with defaults. A malformed file is replaced by
/// the defaults.
pub fn read_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        save_default_config(path)?;
    }

    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = match toml::from_str(&config_str) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: malformed config {} replaced with defaults: {}",
                path.display(),
                e
            );
            save_default_config(path)?;
            return Ok(Config::default());
        }
    };

    Ok(config)
}

/// Check every value of a config read from `path`
pub fn check_config(config: &Config, path: &Path) -> Result<()> {
    validate_config(config).with_context(|| format!("Invalid config file: {}", path.display()))
}

pub fn save_default_config(path: &Path) -> Result<()> {
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write default config file: {}", path.display()))
}

/// Parse and validate config text without loading it
pub fn check_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config")?;
    validate_config(&config)?;
    Ok(config)
}

/// Editor program plus any arguments given in $VISUAL / $EDITOR
#[derive(Debug, Clone, PartialEq)]
pub struct EditorCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

const FALLBACK_EDITORS: &[&str] = &["nano", "vim", "vi"];

/// Pick an editor: $VISUAL, then $EDITOR, then the first fallback on PATH
pub fn find_editor() -> Result<EditorCommand> {
    let from_env = ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty());

    if let Some(value) = from_env {
        return parse_editor_command(&value);
    }

    FALLBACK_EDITORS
        .iter()
        .find_map(|name| which::which(name).ok())
        .map(|program| EditorCommand {
            program,
            args: Vec::new(),
        })
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No editor found. Set $EDITOR or install one of: {}",
                FALLBACK_EDITORS.join(", ")
            )
        })
}

/// Split an editor command like "code --wait" and resolve it on PATH
pub fn parse_editor_command(value: &str) -> Result<EditorCommand> {
    let mut parts = value.split_whitespace();
    let name = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("Editor command is empty"))?;
    let program = which::which(name).with_context(|| format!("Editor not found: {}", name))?;

    Ok(EditorCommand {
        program,
        args: parts.map(str::to_string).collect(),
    })
}

pub fn validate_config(config: &Config) -> Result<()> {
    if config.patch.target.as_os_str().is_empty() {
        anyhow::bail!("Invalid target: must not be empty");
    }

    validate_backup_config(&config.backup)?;

    if config.output.context_lines > 20 {
        anyhow::bail!("Invalid context_lines: {} (max 20)", config.output.context_lines);
    }

    if ColorChoice::parse(&config.output.color).is_none() {
        anyhow::bail!(
            "Invalid color: {} (must be 'auto', 'always', or 'never')",
            config.output.color
        );
    }

    Ok(())
}

/// Checks only the `[backup]` section, for commands that touch nothing else
pub fn validate_backup_config(backup: &BackupConfig) -> Result<()> {
    if backup.max_backups == 0 || backup.max_backups > 1000 {
        anyhow::bail!("Invalid max_backups: {} (must be 1-1000)", backup.max_backups);
    }
    Ok(())
}
