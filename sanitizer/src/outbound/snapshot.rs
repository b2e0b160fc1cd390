//! JSON snapshot files holding a whole site export.
//!
//! Files are opened relative to their parent directory with `cap-std`, so a
//! snapshot path can never escape the directory it names.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs::Dir};
use thiserror::Error;
use tracing::info;

use super::atomic_io::replace_file;
use super::memory::{InMemoryRecordStore, SnapshotError, StoreSnapshot};

/// Errors raised while reading or writing a snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotFileError {
    /// The path does not name a file.
    #[error("snapshot path must name a file: {path}")]
    NotAFile {
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// The file or its directory could not be read.
    #[error("failed to read snapshot {path}: {message}")]
    Read {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        message: String,
    },
    /// The file is not a valid snapshot document.
    #[error("failed to parse snapshot {path}: {message}")]
    Parse {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// Parser diagnostic.
        message: String,
    },
    /// The snapshot parsed but is inconsistent.
    #[error("invalid snapshot {path}: {source}")]
    Invalid {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// Consistency failure.
        #[source]
        source: SnapshotError,
    },
    /// The file could not be written.
    #[error("failed to write snapshot {path}: {message}")]
    Write {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// Underlying I/O or encoding error.
        message: String,
    },
}

/// Load a snapshot file into an in-memory store.
///
/// # Errors
///
/// Returns [`SnapshotFileError`] when the file cannot be read, parsed or
/// validated.
pub fn load_snapshot(path: &Utf8Path) -> Result<InMemoryRecordStore, SnapshotFileError> {
    let (dir, file_name) = open_parent(path, |message| SnapshotFileError::Read {
        path: path.to_path_buf(),
        message,
    })?;
    let contents = dir
        .read_to_string(file_name)
        .map_err(|err| SnapshotFileError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    let snapshot: StoreSnapshot =
        serde_json::from_str(&contents).map_err(|err| SnapshotFileError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    let users = snapshot.users.len();
    let sites = snapshot.sites.len();
    let store =
        InMemoryRecordStore::from_snapshot(snapshot).map_err(|source| SnapshotFileError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;

    info!(path = %path, users, sites, "snapshot loaded");
    Ok(store)
}

/// Write the store's records back to `path`, replacing the file atomically.
///
/// # Errors
///
/// Returns [`SnapshotFileError::Write`] when the file cannot be written.
pub fn save_snapshot(
    path: &Utf8Path,
    store: &InMemoryRecordStore,
) -> Result<(), SnapshotFileError> {
    let write_error = |message: String| SnapshotFileError::Write {
        path: path.to_path_buf(),
        message,
    };
    let (dir, file_name) = open_parent(path, write_error)?;
    let mut contents = serde_json::to_string_pretty(&store.to_snapshot())
        .map_err(|err| write_error(err.to_string()))?;
    contents.push('\n');
    replace_file(&dir, file_name, contents.as_bytes()).map_err(|err| write_error(err.to_string()))?;

    info!(path = %path, "snapshot saved");
    Ok(())
}

fn open_parent<F>(path: &Utf8Path, on_error: F) -> Result<(Dir, &str), SnapshotFileError>
where
    F: Fn(String) -> SnapshotFileError,
{
    let file_name = path.file_name().ok_or_else(|| SnapshotFileError::NotAFile {
        path: path.to_path_buf(),
    })?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|err| on_error(format!("open directory {parent}: {err}")))?;
    Ok((dir, file_name))
}
