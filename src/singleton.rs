//! Run lock so that two runs never interleave snapshot reads and writes.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File};
use std::path::Path;

const LOCK_FILE: &str = "eventsync.lock";

/// A lock guard that releases the lock when dropped
pub struct LockGuard {
    _file: File,
}

/// Acquire an exclusive lock in `data_dir`, failing if another run holds it
pub fn acquire_lock(data_dir: &Path) -> Result<LockGuard> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let path = data_dir.join(LOCK_FILE);
    let file = File::create(&path).context("Failed to create lock file")?;

    file.try_lock_exclusive().map_err(|_| {
        anyhow::anyhow!(
            "Another eventsync run is in progress.\n\
            If you believe this is an error, remove: {}",
            path.display()
        )
    })?;

    Ok(LockGuard { _file: file })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_lock_fails_until_released() {
        let dir = tempfile::tempdir().unwrap();

        let guard = acquire_lock(dir.path()).unwrap();
        assert!(acquire_lock(dir.path()).is_err());

        drop(guard);
        assert!(acquire_lock(dir.path()).is_ok());
    }
}
