//! Command wiring for the `gdpr-sanitizer` binary.
//!
//! The binary delegates to these functions so the whole flow (load, validate,
//! confirm, rewrite, save) can be exercised in tests without spawning a
//! process or reading a terminal.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Parser;
use synthetic_data::FakeProvider;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::{
    InputError, NotFoundPolicy, RunOptions, RunPlan, RunResult, SanitizationEngine, SanitizeError,
    SanitizerHooks,
};
use crate::outbound::{SnapshotFileError, TracingProgress, load_snapshot, save_snapshot};

mod config;
mod report;

pub use config::SanitizerSettings;
pub use report::{render_table, success_message};

/// Question asked before anything is rewritten.
pub const CONFIRMATION_PROMPT: &str = "Rewrite all user data?";

/// `gdpr-sanitizer` command arguments.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "gdpr-sanitizer",
    about = "Replace personal data in users and comments with synthetic values",
    version
)]
pub struct CliArgs {
    /// Unexpected positional arguments; accepted and warned about.
    #[arg(hide = true)]
    pub extra: Vec<String>,
    /// Comma-separated user ids, logins or emails to leave untouched.
    #[arg(long, value_name = "ids")]
    pub keep: Option<String>,
    /// Warn about users to keep that do not exist instead of aborting.
    /// Also enabled by `GDPR_SANITIZER_SKIP_NOT_FOUND`.
    #[arg(long = "skip-not-found")]
    pub skip_not_found: bool,
    /// Limit the run to one site of a multi-site export.
    #[arg(long, value_name = "site_id")]
    pub site: Option<String>,
    /// Skip the confirmation prompt.
    #[arg(short = 'y', long)]
    pub yes: bool,
    /// JSON site snapshot to rewrite. Overrides `GDPR_SANITIZER_STORE_PATH`.
    #[arg(long = "store", value_name = "path")]
    pub store: Option<PathBuf>,
    /// Seed for reproducible synthetic values. Overrides `GDPR_SANITIZER_SEED`.
    #[arg(long, value_name = "seed")]
    pub seed: Option<u64>,
}

/// Arguments merged with settings, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Snapshot file to rewrite in place.
    pub store_path: Utf8PathBuf,
    /// Seed for the value provider; drawn from entropy when absent.
    pub seed: Option<u64>,
    /// Raw run options passed to [`RunPlan::prepare`].
    pub options: RunOptions,
    /// Whether the confirmation prompt is skipped.
    pub assume_yes: bool,
    /// Positional arguments that were ignored.
    pub ignored: Vec<String>,
}

impl Invocation {
    /// Merge `args` over `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError`] when no store path is configured or the path is
    /// not valid UTF-8.
    pub fn resolve(args: CliArgs, settings: &SanitizerSettings) -> Result<Self, CliError> {
        let raw_path = args
            .store
            .or_else(|| settings.store_path.clone())
            .ok_or(CliError::MissingStorePath)?;
        let store_path =
            Utf8PathBuf::from_path_buf(raw_path).map_err(|path| CliError::NonUtf8Path {
                path: path.display().to_string(),
            })?;
        let keep = args.keep.filter(|spec| !spec.trim().is_empty());
        let policy = if args.skip_not_found || settings.skip_not_found {
            NotFoundPolicy::Lenient
        } else {
            NotFoundPolicy::Strict
        };

        Ok(Self {
            store_path,
            seed: args.seed.or(settings.seed),
            options: RunOptions {
                keep,
                policy,
                site: args.site,
            },
            assume_yes: args.yes,
            ignored: args.extra,
        })
    }
}

/// How a command ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Every record in scope was processed.
    Completed(RunResult),
    /// The operator declined the confirmation prompt; nothing changed.
    Aborted,
}

/// Errors surfaced by the command flow.
#[derive(Debug, Error)]
pub enum CliError {
    /// Neither `--store` nor the settings name a snapshot.
    #[error("missing snapshot path: pass --store or set GDPR_SANITIZER_STORE_PATH")]
    MissingStorePath,
    /// The snapshot path is not valid UTF-8.
    #[error("snapshot path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the path.
        path: String,
    },
    /// The snapshot could not be loaded or saved.
    #[error(transparent)]
    Snapshot(#[from] SnapshotFileError),
    /// Input validation failed before any change.
    #[error(transparent)]
    Input(#[from] InputError),
    /// The run aborted part-way.
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),
    /// The confirmation answer could not be read.
    #[error("failed to read confirmation: {0}")]
    Prompt(#[from] io::Error),
}

/// Run the sanitizer against the snapshot named by `invocation`.
///
/// Inputs are validated before `confirm` is asked. The snapshot is written
/// back after the run, including when the run aborts part-way, so the file
/// always reflects what was rewritten.
///
/// # Errors
///
/// Returns [`CliError`] for invalid input, snapshot I/O failures and
/// aborted runs.
pub fn run_command<F>(invocation: &Invocation, confirm: F) -> Result<CommandOutcome, CliError>
where
    F: FnOnce(&str) -> io::Result<bool>,
{
    run_command_with_hooks(invocation, SanitizerHooks::new(), confirm)
}

/// [`run_command`] with extension hooks registered on the engine.
///
/// # Errors
///
/// See [`run_command`].
pub fn run_command_with_hooks<F>(
    invocation: &Invocation,
    hooks: SanitizerHooks,
    confirm: F,
) -> Result<CommandOutcome, CliError>
where
    F: FnOnce(&str) -> io::Result<bool>,
{
    if !invocation.ignored.is_empty() {
        warn!(arguments = ?invocation.ignored, "unknown argument");
    }

    let store = Arc::new(load_snapshot(&invocation.store_path)?);
    let plan = RunPlan::prepare(&*store, &invocation.options)?;

    if !invocation.assume_yes && !confirm(CONFIRMATION_PROMPT)? {
        info!("aborted by operator");
        return Ok(CommandOutcome::Aborted);
    }

    let provider = match invocation.seed {
        Some(seed) => {
            info!(seed, "using seeded value provider");
            FakeProvider::seeded(seed)
        }
        None => FakeProvider::from_entropy(),
    };
    let mut engine = SanitizationEngine::new(Arc::clone(&store), Box::new(provider))
        .with_hooks(hooks)
        .with_progress(Box::new(TracingProgress::new()));

    let result = match engine.run(&plan) {
        Ok(result) => result,
        Err(err) => {
            if let Err(save_err) = save_snapshot(&invocation.store_path, &store) {
                error!(error = %save_err, "failed to save partially rewritten snapshot");
            }
            return Err(err.into());
        }
    };
    save_snapshot(&invocation.store_path, &store)?;

    Ok(CommandOutcome::Completed(result))
}
