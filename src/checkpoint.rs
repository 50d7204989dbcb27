//! Checkpoint forwarding between dependent stages.
//!
//! The ground-state and time-dependent stages reuse the converged
//! wavefunction of the optimization stage by starting from a copy of its
//! checkpoint file. The copy happens exactly once per stage invocation,
//! before the stage keywords are merged, so keywords like `geom=allcheck`
//! find the checkpoint in place when the engine starts.

use log::info;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while forwarding a checkpoint file.
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// The dependency stage has not produced its checkpoint yet
    #[error("checkpoint source {path} is missing; run stage `{stage}` first")]
    MissingSource {
        /// Expected path of the source checkpoint
        path: String,
        /// Stage that should have produced it
        stage: String,
    },
    /// Copying the checkpoint failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Copies `<from>.chk` to `<to>.chk` inside the base directory.
///
/// Returns the number of bytes copied.
pub fn copy_checkpoint(base: &Path, from: &str, to: &str) -> Result<u64, CheckpointError> {
    let source = base.join(format!("{}.chk", from));
    let target = base.join(format!("{}.chk", to));

    if !source.is_file() {
        return Err(CheckpointError::MissingSource {
            path: source.display().to_string(),
            stage: from.to_string(),
        });
    }

    let bytes = fs::copy(&source, &target)?;
    info!(
        "copied checkpoint {} -> {} ({} bytes)",
        source.display(),
        target.display(),
        bytes
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_existing_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("opt.chk"), b"wavefunction").unwrap();

        let bytes = copy_checkpoint(dir.path(), "opt", "gs").unwrap();
        assert_eq!(bytes, 12);
        assert_eq!(
            fs::read(dir.path().join("gs.chk")).unwrap(),
            b"wavefunction"
        );
    }

    #[test]
    fn missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = copy_checkpoint(dir.path(), "opt", "gs").unwrap_err();
        assert!(matches!(err, CheckpointError::MissingSource { .. }));
        assert!(!dir.path().join("gs.chk").exists());
    }
}
