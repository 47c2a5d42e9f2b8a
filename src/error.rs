use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the linking core, ordered roughly by severity.
///
/// The CLI maps any of these to a non-zero exit; the deployer captures
/// per-module errors and keeps going, except for a backup conflict under
/// force-no, which aborts the whole batch.
#[derive(Debug, Error)]
pub enum NdmgrError {
    #[error("no home directory available for path expansion")]
    NoHomeDirectory,

    #[error("target {0} does not exist, is not a directory, or is not writable")]
    TargetUnusable(PathBuf),

    #[error("existing entry at {0} conflicts with the link")]
    ConflictDetected(PathBuf),

    #[error("a backup already exists at {0}")]
    BackupConflict(PathBuf),

    #[error("cannot read source {path}: {source}")]
    SourceUnreadable { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, NdmgrError>;
