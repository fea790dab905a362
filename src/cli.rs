use crate::substitution::ReplacePolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dashpatch")]
#[command(about = "Apply verified literal patches to the franchise dashboard page")]
#[command(long_about = "dashpatch applies an ordered list of literal text substitutions to the
franchise dashboard page (dash.html).

Every substitution reports what it did: applied, already applied, or not
found. Nothing fails silently. The page is backed up before it is written
and can be restored with 'dashpatch rollback'.

BUILT-IN PLAN (dashboard):
  1. employees-header        Add the manage-users button to the employees panel
  2. admin-manage-button     Show the button for admins
  3. manager-manage-button   Show the button for franchise managers
  4. hide-admin-employees    Hide admin accounts from non-admin viewers
  5. expiry-date-timezone    Parse expiry dates in Sao Paulo time (UTC-3)
  6. expiry-days-label       Print 'dia'/'dias' instead of 'd'

EXAMPLES:
  dashpatch                              Patch public/dash.html
  dashpatch apply web/public/dash.html   Patch a specific page
  dashpatch apply --dry-run              Preview the diff only
  dashpatch apply --strict               Write nothing unless all targets are found
  dashpatch check                        Report which substitutions would apply
  dashpatch plan --export > my.toml      Start a custom plan
  dashpatch apply --plan my.toml         Run a custom plan
  dashpatch rollback                     Undo the last patch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(flatten)]
    apply: ApplyOpts,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ApplyOpts {
    /// Page to patch (default: plan target, then config [patch] target)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Patch plan file (default: built-in dashboard plan)
    #[arg(short = 'p', long, value_name = "PLAN")]
    pub plan: Option<PathBuf>,

    /// Show the diff without writing the page
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Refuse to write unless every substitution is found
    #[arg(short = 's', long)]
    pub strict: bool,

    /// Replace "first" or "all" occurrences of each old text
    #[arg(long, value_name = "POLICY", value_parser = ReplacePolicy::parse)]
    pub policy: Option<ReplacePolicy>,

    /// Number of context lines around each change
    #[arg(short = 'n', long, value_name = "NUM", conflicts_with = "no_context")]
    pub context: Option<usize>,

    /// Show only changed lines
    #[arg(long = "no-context")]
    pub no_context: bool,

    /// Skip creating a backup (requires --force)
    #[arg(long = "no-backup", requires = "force")]
    pub no_backup: bool,

    /// Confirm dangerous operations (required for --no-backup)
    #[arg(long = "force", requires = "no_backup")]
    pub force: bool,

    /// Print the step report as JSON
    #[arg(long)]
    pub json: bool,

    /// Write a debug log to ~/.dashpatch/dashpatch.log
    #[arg(long)]
    pub debug: bool,
}

impl ApplyOpts {
    /// Context lines from flags, falling back to the configured value
    pub fn context_lines(&self, configured: usize) -> usize {
        if self.no_context {
            0
        } else {
            self.context.unwrap_or(configured)
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Patch the page (the default when no subcommand is given)
    Apply {
        #[command(flatten)]
        opts: ApplyOpts,
    },

    /// Report what each substitution would do, without writing
    #[command(long_about = "Preview the plan against the page and report each substitution.

Exits with status 1 if any substitution's old text is missing and its new
text is not already present, i.e. the page has drifted from the expected
baseline.

EXAMPLES:
  dashpatch check
  dashpatch check web/public/dash.html --plan my.toml")]
    Check {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        #[arg(short = 'p', long, value_name = "PLAN")]
        plan: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Show or export a patch plan
    Plan {
        #[arg(short = 'p', long, value_name = "PLAN")]
        plan: Option<PathBuf>,

        /// Print the plan as TOML instead of a summary
        #[arg(long)]
        export: bool,
    },

    /// Restore the page from a backup
    #[command(long_about = "Restore files from a backup.

If no backup ID is specified, rolls back the most recent patch.
Use 'dashpatch history' to see all available backups.

EXAMPLES:
  dashpatch rollback
  dashpatch rollback 20261019-101500123-abcd1234")]
    Rollback {
        #[arg(value_name = "ID")]
        id: Option<String>,
    },

    /// List backups, most recent first
    History,

    /// Edit or show the configuration file
    Config {
        /// Show current configuration without editing
        #[arg(long = "show")]
        show: bool,
    },
}

#[derive(Debug)]
pub enum Args {
    Apply(ApplyOpts),
    Check {
        file: Option<PathBuf>,
        plan: Option<PathBuf>,
        json: bool,
    },
    Plan {
        plan: Option<PathBuf>,
        export: bool,
    },
    Rollback {
        id: Option<String>,
    },
    History,
    Config {
        show: bool,
    },
}

impl Args {
    /// True when `--debug` was passed
    pub fn debug(&self) -> bool {
        matches!(self, Args::Apply(opts) if opts.debug)
    }
}

pub fn parse_args() -> Args {
    from_cli(Cli::parse())
}

fn from_cli(cli: Cli) -> Args {
    match cli.command {
        Some(Commands::Apply { opts }) => Args::Apply(opts),
        Some(Commands::Check { file, plan, json }) => Args::Check { file, plan, json },
        Some(Commands::Plan { plan, export }) => Args::Plan { plan, export },
        Some(Commands::Rollback { id }) => Args::Rollback { id },
        Some(Commands::History) => Args::History,
        Some(Commands::Config { show }) => Args::Config { show },
        None => Args::Apply(cli.apply),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        from_cli(Cli::try_parse_from(args).unwrap())
    }

    #[test]
    fn test_bare_invocation_applies() {
        match parse(&["dashpatch"]) {
            Args::Apply(opts) => {
                assert!(opts.file.is_none());
                assert!(!opts.dry_run);
                assert_eq!(opts.context_lines(3), 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_apply_subcommand_with_flags() {
        let args = parse(&[
            "dashpatch",
            "apply",
            "web/dash.html",
            "--dry-run",
            "--strict",
            "-n",
            "1",
            "--policy",
            "first",
        ]);
        match args {
            Args::Apply(opts) => {
                assert_eq!(opts.file, Some(PathBuf::from("web/dash.html")));
                assert_eq!(opts.policy, Some(ReplacePolicy::First));
                assert!(opts.dry_run);
                assert!(opts.strict);
                assert_eq!(opts.context_lines(3), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_policy_rejected() {
        assert!(Cli::try_parse_from(["dashpatch", "--policy", "some"]).is_err());
    }

    #[test]
    fn test_no_context_wins() {
        match parse(&["dashpatch", "--no-context"]) {
            Args::Apply(opts) => assert_eq!(opts.context_lines(3), 0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_no_backup_requires_force() {
        assert!(Cli::try_parse_from(["dashpatch", "--no-backup"]).is_err());
        match parse(&["dashpatch", "--no-backup", "--force"]) {
            Args::Apply(opts) => assert!(opts.no_backup && opts.force),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_debug_flag() {
        assert!(parse(&["dashpatch", "--debug"]).debug());
        assert!(parse(&["dashpatch", "apply", "--debug"]).debug());
        assert!(!parse(&["dashpatch"]).debug());
        assert!(!parse(&["dashpatch", "history"]).debug());
    }

    #[test]
    fn test_subcommands() {
        assert!(matches!(parse(&["dashpatch", "history"]), Args::History));
        assert!(matches!(parse(&["dashpatch", "rollback"]), Args::Rollback { id: None }));
        assert!(matches!(
            parse(&["dashpatch", "plan", "--export"]),
            Args::Plan {
                plan: None,
                export: true
            }
        ));
        assert!(matches!(
            parse(&["dashpatch", "check", "--json"]),
            Args::Check {
                file: None,
                json: true,
                ..
            }
        ));
        assert!(matches!(parse(&["dashpatch", "config", "--show"]), Args::Config { show: true }));
    }
}
