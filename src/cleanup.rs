//! Base-directory cleanup for calculation artifacts.
//!
//! Long pipelines leave engine inputs, logs, checkpoints, structure files,
//! and scheduler logs behind. [`clean_base_dir`] removes them so a base
//! directory can be reprocessed from scratch. The primordial `init.xyz` is
//! never touched, and neither are subdirectories.
//!
//! Cleanup only runs when explicitly requested. In a multi-process batch
//! launch it must be invoked from a single coordinating process (e.g. rank
//! zero); the function itself takes no lock, so concurrent callers on the
//! same directory would race on deletion.

use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extensions removed by cleanup.
const CLEAN_EXTENSIONS: &[&str] = &["com", "log", "ase", "xyz", "chk"];

/// Prefix of scheduler log files removed by cleanup.
const SCHEDULER_LOG_PREFIX: &str = "lsf";

/// The primordial input file, never deleted.
pub const PRIMORDIAL_INPUT: &str = "init.xyz";

/// Errors raised during cleanup.
#[derive(Error, Debug)]
pub enum CleanupError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The base path is not a directory
    #[error("invalid base directory: {0}")]
    InvalidPath(String),
}

/// Removes calculation artifacts from a base directory.
///
/// Deletes `*.com`, `*.log`, `*.ase`, `*.xyz`, `*.chk`, and `lsf*` files,
/// keeping `init.xyz`. Returns the paths that were removed.
pub fn clean_base_dir(base: &Path) -> Result<Vec<PathBuf>, CleanupError> {
    if !base.is_dir() {
        return Err(CleanupError::InvalidPath(base.display().to_string()));
    }
    info!("cleaning up {}", base.display());

    let mut removed = Vec::new();
    for entry in fs::read_dir(base)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name == PRIMORDIAL_INPUT || !matches_cleanup_pattern(name) {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            // The sweep continues past files that cannot be removed.
            Err(e) => warn!("could not remove {}: {}", path.display(), e),
        }
    }

    info!("removed {} file(s)", removed.len());
    Ok(removed)
}

fn matches_cleanup_pattern(name: &str) -> bool {
    if name.starts_with(SCHEDULER_LOG_PREFIX) {
        return true;
    }
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| CLEAN_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_artifacts_and_keeps_init() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "init.xyz",
            "opt.chk",
            "opt.log",
            "opt.xyz",
            "td-1.xyz",
            "gs.com",
            "lsf.o12345",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let removed = clean_base_dir(dir.path()).unwrap();
        assert_eq!(removed.len(), 6);
        assert!(dir.path().join("init.xyz").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert!(!dir.path().join("opt.chk").exists());
        assert!(!dir.path().join("lsf.o12345").exists());
    }

    #[test]
    fn spares_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("backup.xyz")).unwrap();
        let removed = clean_base_dir(dir.path()).unwrap();
        assert!(removed.is_empty());
        assert!(dir.path().join("backup.xyz").is_dir());
    }

    #[test]
    fn rejects_non_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            clean_base_dir(&file),
            Err(CleanupError::InvalidPath(_))
        ));
    }
}
