//! dashpatch: verified literal patches for the franchise dashboard page
//!
//! The library holds the patching core and its supporting pieces; the
//! binary at src/main.rs wires them to the command line.

pub mod backup_manager;
pub mod cli;
pub mod config;
pub mod diff_formatter;
pub mod error_helpers;
pub mod file_processor;
pub mod logger;
pub mod patcher;
pub mod plan;
pub mod substitution;

// Re-export commonly used types for convenience
pub use backup_manager::{BackupManager, BackupMetadata, FileBackup};
pub use file_processor::{FileDiff, FileProcessor};
pub use patcher::{PatchReport, Patcher, StepReport};
pub use plan::PatchPlan;
pub use substitution::{LineEnding, ReplacePolicy, Substitution, SubstitutionOutcome};
