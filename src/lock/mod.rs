//! Process-wide single-run mutual exclusion.
//!
//! Both tools take an OS advisory exclusive lock on a well-known file before
//! any work. Contention means a concurrent run already owns the work and is
//! reported as [`LockError::Contended`], distinct from acquisition failures.
//! The guard releases the lock and removes the file on every exit path.

mod errors;

pub use errors::{LockError, LockResult};

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::warn;

/// Scoped holder of the advisory run lock.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take the exclusive lock, creating the lock file if needed.
    pub fn acquire(path: &Path) -> LockResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| LockError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| LockError::Io { path: path.to_path_buf(), source })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { file, path: path.to_path_buf() }),
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                Err(LockError::Contended { path: path.to_path_buf() })
            }
            Err(source) => Err(LockError::Io { path: path.to_path_buf(), source }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            warn!(path = %self.path.display(), %err, "failed to release run lock");
        }
        // Best effort: the lock itself is already released.
        let _ = fs::remove_file(&self.path);
    }
}
