use crate::error_helpers;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_BACKUPS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Name of the patch plan that was about to run
    pub plan: String,
    pub files: Vec<FileBackup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBackup {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
}

pub struct BackupManager {
    backups_dir: PathBuf,
    max_backups: usize,
}

impl BackupManager {
    /// Backups under ~/.dashpatch/backups
    pub fn new() -> Result<Self> {
        let home_dir =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
        Self::with_directory(home_dir.join(".dashpatch").join("backups"))
    }

    pub fn with_directory(dir: impl Into<PathBuf>) -> Result<Self> {
        let backups_dir = dir.into();

        fs::create_dir_all(&backups_dir)
            .map_err(|e| anyhow::anyhow!(error_helpers::dir_create_error(&backups_dir, &e)))?;

        Ok(Self {
            backups_dir,
            max_backups: DEFAULT_MAX_BACKUPS,
        })
    }

    pub fn max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups.max(1);
        self
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    pub fn create_backup(&self, plan: &str, files: &[PathBuf]) -> Result<String> {
        // Millisecond timestamp first so IDs sort chronologically
        let id = format!(
            "{}-{}",
            Utc::now().format("%Y%m%d-%H%M%S%3f"),
            Uuid::new_v4().to_string().split_at(8).0
        );
        let backup_dir = self.backups_dir.join(&id);

        fs::create_dir_all(&backup_dir).with_context(|| {
            format!(
                "Failed to create backup directory: {}",
                backup_dir.display()
            )
        })?;

        let mut file_backups = Vec::new();

        for file_path in files {
            if !file_path.exists() {
                continue;
            }

            let file_name = file_path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", file_path.display()))?;
            let backup_path = backup_dir.join(file_name);

            fs::copy(file_path, &backup_path)
                .with_context(|| format!("Failed to backup file: {}", file_path.display()))?;

            // Store absolute paths so rollback works from any directory
            let original_path = fs::canonicalize(file_path).unwrap_or_else(|_| file_path.clone());

            file_backups.push(FileBackup {
                original_path,
                backup_path,
            });
        }

        let metadata = BackupMetadata {
            id: id.clone(),
            timestamp: Utc::now(),
            plan: plan.to_string(),
            files: file_backups,
        };

        let metadata_path = backup_dir.join("operation.json");
        let metadata_json =
            serde_json::to_string_pretty(&metadata).context("Failed to serialize metadata")?;

        fs::write(&metadata_path, metadata_json)
            .with_context(|| format!("Failed to write metadata: {}", metadata_path.display()))?;

        info!(backup = %id, files = metadata.files.len(), "backup created");

        self.cleanup_old_backups()?;

        Ok(id)
    }

    /// Copy every backed-up file over its original, then drop the backup
    pub fn restore_backup(&self, id: &str) -> Result<Vec<PathBuf>> {
        let backup_dir = self.backups_dir.join(id);
        let metadata_path = backup_dir.join("operation.json");

        if !backup_dir.exists() {
            anyhow::bail!("Backup not found: {}", id);
        }

        let metadata_json = fs::read_to_string(&metadata_path)
            .with_context(|| format!("Failed to read metadata: {}", metadata_path.display()))?;
        let metadata = Self::parse_backup_metadata(&metadata_json)?;

        let mut restored = Vec::new();
        for file_backup in &metadata.files {
            if !file_backup.backup_path.exists() {
                warn!(path = %file_backup.backup_path.display(), "backup file missing");
                continue;
            }

            fs::copy(&file_backup.backup_path, &file_backup.original_path).with_context(|| {
                format!(
                    "Failed to restore file: {}",
                    file_backup.original_path.display()
                )
            })?;
            restored.push(file_backup.original_path.clone());
        }

        fs::remove_dir_all(&backup_dir).with_context(|| {
            format!(
                "Failed to remove backup directory: {}",
                backup_dir.display()
            )
        })?;

        info!(backup = %id, files = restored.len(), "backup restored");

        Ok(restored)
    }

    pub fn get_last_backup_id(&self) -> Result<Option<String>> {
        let backups = self.list_backups()?;
        Ok(backups.last().map(|b| b.id.clone()))
    }

    /// All readable backups, oldest first
    pub fn list_backups(&self) -> Result<Vec<BackupMetadata>> {
        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backups_dir).with_context(|| {
            format!(
                "Failed to read backups directory: {}",
                self.backups_dir.display()
            )
        })? {
            let entry = entry?;
            let metadata_path = entry.path().join("operation.json");

            if !metadata_path.exists() {
                continue;
            }

            let metadata_json = fs::read_to_string(&metadata_path)?;
            match Self::parse_backup_metadata(&metadata_json) {
                Ok(metadata) => backups.push(metadata),
                Err(e) => debug!(
                    path = %metadata_path.display(),
                    error = %e,
                    "skipping unreadable backup"
                ),
            }
        }

        // Equal timestamps are rare; the ID keeps the order stable
        backups.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(backups)
    }

    pub fn parse_backup_metadata(json: &str) -> Result<BackupMetadata> {
        serde_json::from_str(json).context("Failed to parse backup metadata")
    }

    /// Keep only the N most recent backups; returns how many were removed
    pub fn prune_backups(&self, keep_count: usize) -> Result<usize> {
        let backups = self.list_backups()?;

        if backups.len() <= keep_count {
            return Ok(0);
        }

        let to_remove = backups.len() - keep_count;
        for backup in backups.iter().take(to_remove) {
            let backup_dir = self.backups_dir.join(&backup.id);
            fs::remove_dir_all(&backup_dir)
                .with_context(|| format!("Failed to remove backup: {}", backup_dir.display()))?;
        }

        debug!(removed = to_remove, "old backups pruned");
        Ok(to_remove)
    }

    fn cleanup_old_backups(&self) -> Result<()> {
        self.prune_backups(self.max_backups).map(|_| ())
    }
}
