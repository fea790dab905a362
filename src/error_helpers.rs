//! Actionable messages for the I/O failures users actually hit

use std::io;
use std::path::Path;

pub fn is_permission_denied(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::PermissionDenied
}

pub fn is_not_found(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
}

/// Message for a permission failure while reading or writing the target
pub fn permission_error(path: &Path, operation: &str) -> String {
    let parent_dir = path
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string());

    format!(
        "Permission denied when {} '{}'\n\n\
         Possible fixes:\n\
         1. Check file permissions: ls -l '{}'\n\
         2. Writing needs a temp file next to the target: chmod u+w '{}'\n\
         3. If the page is served from a deploy directory, patch a checkout instead",
        operation,
        path.display(),
        path.display(),
        parent_dir
    )
}

/// Message for a missing target file
pub fn not_found_error(path: &Path, context: &str) -> String {
    format!(
        "File not found: '{}'\n\n\
         Context: {}\n\n\
         Possible fixes:\n\
         1. Pass the page explicitly: dashpatch apply path/to/dash.html\n\
         2. Set [patch] target in the config file (dashpatch config)\n\
         3. Run from the project root so relative targets resolve",
        path.display(),
        context
    )
}

/// Message for a backup directory that could not be created
pub fn dir_create_error(path: &Path, underlying_err: &io::Error) -> String {
    let base = format!("Failed to create directory: '{}'", path.display());

    if is_permission_denied(underlying_err) {
        format!(
            "{}\n\n\
             Cause: Permission denied\n\n\
             Possible fixes:\n\
             1. Check write permissions on: '{}'\n\
             2. Set [backup] backup_dir in the config file to a writable location\n\
             3. Skip the backup with --no-backup --force",
            base,
            path.parent()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| ".".to_string())
        )
    } else {
        format!("{}\n\nUnderlying error: {}", base, underlying_err)
    }
}
