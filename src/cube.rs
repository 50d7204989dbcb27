//! Orbital cube file generation from checkpoint files.
//!
//! Post-processing step for visualizing frontier orbitals: converts a
//! stage's binary checkpoint to a formatted checkpoint with `formchk`, then
//! renders an orbital cube file with `cubegen`. Both tools ship with the
//! engine distribution and run synchronously, like the engine itself.
//!
//! The conversion is idempotent in the same way the orchestrator is: an
//! existing `.fchk` is taken as proof that the conversion already ran, and
//! the external tools are not invoked again.

use log::info;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Errors raised during cube generation.
#[derive(Error, Debug)]
pub enum CubeError {
    /// The stage checkpoint does not exist
    #[error("no checkpoint file at {0}; the stage may not have converged")]
    MissingCheckpoint(String),
    /// `formchk` returned a non-zero exit code
    #[error("formchk failed converting {0}")]
    FormchkFailed(String),
    /// `cubegen` returned a non-zero exit code
    #[error("cubegen failed for {0}")]
    CubegenFailed(String),
    /// Launching an external tool failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Orbital selector for cube generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orbital {
    /// Highest occupied molecular orbital
    Homo,
    /// Lowest unoccupied molecular orbital
    Lumo,
}

impl Orbital {
    fn cubegen_keyword(self) -> &'static str {
        match self {
            Orbital::Homo => "MO=Homo",
            Orbital::Lumo => "MO=Lumo",
        }
    }

    fn file_stem(self) -> &'static str {
        match self {
            Orbital::Homo => "homo",
            Orbital::Lumo => "lumo",
        }
    }
}

/// Generates an orbital cube file from a stage checkpoint.
///
/// Runs `formchk <stage>.chk <stage>.fchk` (skipped when the `.fchk`
/// already exists) followed by `cubegen 1 MO=... <stage>.fchk <orbital>.cube -2`
/// for a fine grid. Returns the cube file path.
pub fn convert_cube(base: &Path, stage: &str, orbital: Orbital) -> Result<PathBuf, CubeError> {
    let chk = base.join(format!("{}.chk", stage));
    let fchk = base.join(format!("{}.fchk", stage));
    let cube = base.join(format!("{}.cube", orbital.file_stem()));

    if !chk.is_file() {
        return Err(CubeError::MissingCheckpoint(chk.display().to_string()));
    }

    if !fchk.is_file() {
        info!("converting {} -> {}", chk.display(), fchk.display());
        let status = Command::new("formchk").arg(&chk).arg(&fchk).status()?;
        if !status.success() {
            return Err(CubeError::FormchkFailed(chk.display().to_string()));
        }
    }

    info!("generating {}", cube.display());
    let status = Command::new("cubegen")
        .arg("1")
        .arg(orbital.cubegen_keyword())
        .arg(&fchk)
        .arg(&cube)
        .arg("-2")
        .status()?;
    if !status.success() {
        return Err(CubeError::CubegenFailed(fchk.display().to_string()));
    }

    Ok(cube)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_checkpoint_is_rejected_before_any_tool_runs() {
        let dir = tempfile::tempdir().unwrap();
        let err = convert_cube(dir.path(), "gs", Orbital::Homo).unwrap_err();
        assert!(matches!(err, CubeError::MissingCheckpoint(_)));
        assert!(!dir.path().join("gs.fchk").exists());
    }

    #[test]
    fn orbital_keywords() {
        assert_eq!(Orbital::Homo.cubegen_keyword(), "MO=Homo");
        assert_eq!(Orbital::Lumo.file_stem(), "lumo");
    }
}
