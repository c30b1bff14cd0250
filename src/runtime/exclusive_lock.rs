use super::RuntimeError;
use fs2::FileExt;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A held cross-process advisory lock. Released when dropped.
#[derive(Debug)]
pub struct ExclusiveLock {
    file: File,
    path: PathBuf,
}

impl ExclusiveLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ExclusiveLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to release lock");
        }
    }
}

#[derive(Debug)]
pub enum LockAttempt {
    Acquired(ExclusiveLock),
    /// Another holder owns the lock right now.
    Busy,
}

/// Non-blocking attempt to take the exclusive lock on `path`, creating the
/// file if needed. The file itself is left in place on release.
pub fn try_acquire_exclusive_lock(path: &Path) -> Result<LockAttempt, RuntimeError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| RuntimeError::CreateDir {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|source| RuntimeError::OpenLock {
            path: path.display().to_string(),
            source,
        })?;

    match FileExt::try_lock_exclusive(&file) {
        Ok(()) => Ok(LockAttempt::Acquired(ExclusiveLock {
            file,
            path: path.to_path_buf(),
        })),
        Err(err) if is_contended(&err) => Ok(LockAttempt::Busy),
        Err(source) => Err(RuntimeError::Lock {
            path: path.display().to_string(),
            source,
        }),
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
