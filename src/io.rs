//! XYZ file I/O.
//!
//! Structure artifacts produced and consumed by the pipeline (`init.xyz`,
//! `opt.xyz`, `gs.xyz`, `td-{root}.xyz`) are plain XYZ files: an atom count
//! line, a comment line, then one `Element x y z` line per atom with
//! coordinates in Angstroms.

use crate::geometry::Geometry;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading or writing structure files.
#[derive(Error, Debug)]
pub enum IoError {
    /// File system or I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// XYZ content did not match the expected format
    #[error("malformed XYZ file {path}: {reason}")]
    MalformedXyz {
        /// Path of the offending file
        path: String,
        /// What was wrong with it
        reason: String,
    },
}

/// Result type for structure I/O operations
pub type Result<T> = std::result::Result<T, IoError>;

/// Reads a molecular structure from an XYZ file.
///
/// Only the declared number of atoms is read; trailing frames of a
/// multi-frame trajectory are ignored.
pub fn read_xyz(path: &Path) -> Result<Geometry> {
    let content = fs::read_to_string(path)?;
    let malformed = |reason: &str| IoError::MalformedXyz {
        path: path.display().to_string(),
        reason: reason.to_string(),
    };

    let mut lines = content.lines();
    let num_atoms: usize = lines
        .next()
        .ok_or_else(|| malformed("empty file"))?
        .trim()
        .parse()
        .map_err(|_| malformed("first line is not an atom count"))?;
    // Comment line
    lines
        .next()
        .ok_or_else(|| malformed("missing comment line"))?;

    let mut elements = Vec::with_capacity(num_atoms);
    let mut coords = Vec::with_capacity(num_atoms * 3);
    for _ in 0..num_atoms {
        let line = lines
            .next()
            .ok_or_else(|| malformed("fewer atom lines than declared"))?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(malformed("atom line has fewer than 4 fields"));
        }
        elements.push(parts[0].to_string());
        for part in &parts[1..4] {
            coords.push(
                part.parse::<f64>()
                    .map_err(|_| malformed("coordinate is not a number"))?,
            );
        }
    }

    Ok(Geometry::new(elements, coords))
}

/// Writes a molecular structure to an XYZ file.
///
/// # Examples
///
/// ```no_run
/// use g09run::geometry::Geometry;
/// use g09run::io::write_xyz;
/// use std::path::Path;
///
/// let geom = Geometry::new(vec!["H".to_string()], vec![0.0, 0.0, 0.0]);
/// write_xyz(&geom, Path::new("molecule.xyz"))?;
/// # Ok::<(), g09run::io::IoError>(())
/// ```
pub fn write_xyz(geom: &Geometry, path: &Path) -> Result<()> {
    let mut content = format!("{}\n\n", geom.num_atoms);
    for i in 0..geom.num_atoms {
        let coords = geom.get_atom_coords(i);
        content.push_str(&format!(
            "{}  {:.8}  {:.8}  {:.8}\n",
            geom.elements[i], coords[0], coords[1], coords[2]
        ));
    }
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("co.xyz");
        let geom = Geometry::new(
            vec!["C".to_string(), "O".to_string()],
            vec![0.0, 0.0, 0.0, 1.128, 0.0, 0.0],
        );
        write_xyz(&geom, &path).unwrap();
        let back = read_xyz(&path).unwrap();
        assert_eq!(back, geom);
    }

    #[test]
    fn rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.xyz");
        fs::write(&path, "3\ncomment\nH 0.0 0.0 0.0\n").unwrap();
        let err = read_xyz(&path).unwrap_err();
        assert!(matches!(err, IoError::MalformedXyz { .. }));
    }
}
