use crate::error_helpers;
use crate::patcher::{PatchReport, Patcher};
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Original and patched text of one file, with the step report
#[derive(Debug)]
pub struct FileDiff {
    pub file_path: PathBuf,
    pub original: String,
    pub report: PatchReport,
    pub written: bool,
}

impl FileDiff {
    pub fn patched(&self) -> &str {
        &self.report.output
    }

    pub fn has_changes(&self) -> bool {
        self.original != self.report.output
    }
}

pub struct FileProcessor {
    patcher: Patcher,
    strict: bool,
}

impl FileProcessor {
    pub fn new(patcher: Patcher) -> Self {
        Self {
            patcher,
            strict: false,
        }
    }

    /// Refuse to write anything when a substitution target is missing
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Patch the file in memory without touching the disk
    pub fn preview(&self, file_path: &Path) -> Result<FileDiff> {
        let original = read_text(file_path)?;
        let report = self.patcher.apply(&original);

        Ok(FileDiff {
            file_path: file_path.to_path_buf(),
            original,
            report,
            written: false,
        })
    }

    /// Patch the file and write it back if anything changed
    pub fn apply_to_file(&self, file_path: &Path) -> Result<FileDiff> {
        let diff = self.preview(file_path)?;
        self.commit(diff)
    }

    /// Write a previewed patch to its file
    ///
    /// The written bytes are exactly the preview's patched text. Fails without
    /// writing if the file no longer holds the text the preview was made from.
    pub fn commit(&self, mut diff: FileDiff) -> Result<FileDiff> {
        let file_path = diff.file_path.clone();

        if self.strict && !diff.report.is_complete() {
            anyhow::bail!(
                "Not writing {}: substitution target not found for {}",
                file_path.display(),
                diff.report.not_found().join(", ")
            );
        }

        if !diff.has_changes() {
            info!(file = %file_path.display(), "no changes to write");
            return Ok(diff);
        }

        if read_text(&file_path)? != diff.original {
            anyhow::bail!(
                "{} changed on disk after it was read; run the patch again",
                file_path.display()
            );
        }

        write_atomic(&file_path, diff.patched())?;
        diff.written = true;
        info!(
            file = %file_path.display(),
            applied = diff.report.applied_count(),
            "patched file written"
        );

        Ok(diff)
    }
}

/// Read the whole file as UTF-8, with actionable messages for common failures
pub fn read_text(file_path: &Path) -> Result<String> {
    let bytes = match fs::read(file_path) {
        Ok(bytes) => bytes,
        Err(e) if error_helpers::is_not_found(&e) => {
            anyhow::bail!(error_helpers::not_found_error(file_path, "reading the file to patch"))
        }
        Err(e) if error_helpers::is_permission_denied(&e) => {
            anyhow::bail!(error_helpers::permission_error(file_path, "reading"))
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to read file: {}", file_path.display()));
        }
    };

    String::from_utf8(bytes)
        .with_context(|| format!("File is not valid UTF-8: {}", file_path.display()))
}

/// Write via a temp file in the same directory, then rename over the target
///
/// Keeps the target's permissions; a crash mid-write leaves the original intact.
pub fn write_atomic(file_path: &Path, content: &str) -> Result<()> {
    let parent = file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;

    temp_file
        .write_all(content.as_bytes())
        .with_context(|| "Failed to write temp file")?;
    temp_file.flush().with_context(|| "Failed to flush temp file")?;

    if let Ok(metadata) = fs::metadata(file_path) {
        fs::set_permissions(temp_file.path(), metadata.permissions())
            .with_context(|| format!("Failed to copy permissions of {}", file_path.display()))?;
    }

    temp_file.persist(file_path).map_err(|e| {
        if error_helpers::is_permission_denied(&e.error) {
            anyhow::anyhow!(error_helpers::permission_error(file_path, "writing"))
        } else {
            anyhow::Error::new(e.error)
                .context(format!("Failed to persist temp file to {}", file_path.display()))
        }
    })?;

    Ok(())
}
