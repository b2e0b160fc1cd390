//! Replace a file in one step so readers never see a half-written snapshot.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use cap_std::fs::{Dir, OpenOptions};

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `contents` to `file_name` inside `dir` via a staging file and a
/// rename. The staging file is removed when any step fails.
pub(crate) fn replace_file(dir: &Dir, file_name: &str, contents: &[u8]) -> io::Result<()> {
    let staging = format!(
        ".{file_name}.{}.{}.partial",
        std::process::id(),
        STAGING_COUNTER.fetch_add(1, Ordering::Relaxed)
    );

    let written =
        write_staging(dir, &staging, contents).and_then(|()| swap_in(dir, &staging, file_name));
    if written.is_err() {
        // The staging file may not exist if creation failed.
        drop(dir.remove_file(&staging));
        return written;
    }

    if let Ok(handle) = dir.open(".") {
        drop(handle.sync_all());
    }
    Ok(())
}

fn write_staging(dir: &Dir, staging: &str, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    let mut file = dir.open_with(staging, &options)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(windows)]
fn swap_in(dir: &Dir, staging: &str, target: &str) -> io::Result<()> {
    match dir.remove_file(target) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err),
        _ => {}
    }
    dir.rename(staging, dir, target)
}

#[cfg(not(windows))]
fn swap_in(dir: &Dir, staging: &str, target: &str) -> io::Result<()> {
    dir.rename(staging, dir, target)
}
