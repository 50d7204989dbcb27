//! Gaussian log parsing.
//!
//! Two extractions are needed by the pipeline:
//!
//! - [`final_structure`]: the last `Input orientation:` / `Standard
//!   orientation:` block of the log, which becomes the stage's output
//!   structure artifact.
//! - [`extract_homo_lumo`]: the frontier orbital eigenvalues from the
//!   population analysis section, used for post-processing of ground-state
//!   and TD runs.
//!
//! Both fail with [`ParseError`] when the expected section is absent, which
//! is the usual sign of a calculation that died before producing results.
//!
//! # Eigenvalue layout
//!
//! Gaussian prints eigenvalues in fixed 10-character columns behind the
//! `Alpha  occ. eigenvalues --` / `Alpha virt. eigenvalues --` markers,
//! wrapping to as many lines as needed:
//!
//! ```text
//!  Alpha  occ. eigenvalues --  -10.20123  -0.75432  -0.52310  -0.43891
//!  Alpha virt. eigenvalues --    0.12345   0.23456   0.34567
//! ```
//!
//! The values of all matching lines are concatenated and split on the
//! 10-character boundary, so negative values that run into their neighbor
//! without whitespace are still read correctly.

use crate::config::HARTREE_TO_EV;
use crate::geometry::{atomic_number_to_symbol, Geometry};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while parsing a Gaussian log file.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Log file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Log file does not exist
    #[error("no log file at {0}")]
    MissingLog(String),
    /// No orientation block found in the log
    #[error("no final structure found in {0}; the calculation may have failed early")]
    NoStructure(String),
    /// No population analysis section found in the log
    #[error("no population analysis section in {0}; the population calculation may be bad")]
    MissingPopulation(String),
    /// Population section present but eigenvalue lines absent
    #[error("no orbital eigenvalue lines in {0}")]
    MissingEigenvalues(String),
    /// An eigenvalue column did not parse as a number
    #[error("bad eigenvalue field `{0}`")]
    BadEigenvalue(String),
}

/// Result type for log parsing operations
type Result<T> = std::result::Result<T, ParseError>;

lazy_static! {
    // Robust floating-point regex: handles 1.23, -0.032, 1.2e-4, .123, etc.
    static ref FLOAT_RE: String = r"[-+]?(?:\d+\.\d*|\.\d+)(?:[eE][-+]?\d+)?".to_string();

    // Orientation table row: " 1 8 0 -0.032351 0.050284 0.089439"
    static ref GEOM_RE: Regex = Regex::new(&format!(
        r"^\s*\d+\s+(\d+)\s+\d+\s+({0})\s+({0})\s+({0})",
        *FLOAT_RE
    )).unwrap();

    // Population analysis section: banner line framed by stars, up to the
    // molecular orbital coefficient table.
    static ref POPULATION_RE: Regex = Regex::new(
        r"(?s)\*{30,}\s+Population analysis.+\*{30,}(.+)Molecular Orbital Coeff"
    ).unwrap();

    // Occupied / virtual eigenvalue lines inside the population section.
    static ref OCC_RE: Regex = Regex::new(
        r"(?m)Alpha\s+occ\.\s+eigenvalues --(.+)$"
    ).unwrap();
    static ref VIRT_RE: Regex = Regex::new(
        r"(?m)Alpha\s+virt\.\s+eigenvalues --(.+)$"
    ).unwrap();
}

/// Frontier orbital energies in electronvolts.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HomoLumo {
    /// Highest occupied molecular orbital energy (eV)
    pub homo: f64,
    /// Lowest unoccupied molecular orbital energy (eV)
    pub lumo: f64,
}

impl HomoLumo {
    /// The HOMO-LUMO gap in electronvolts.
    pub fn gap(&self) -> f64 {
        self.lumo - self.homo
    }
}

/// Extracts the last orientation block of a Gaussian log as a [`Geometry`].
pub fn final_structure(log_path: &Path) -> Result<Geometry> {
    if !log_path.is_file() {
        return Err(ParseError::MissingLog(log_path.display().to_string()));
    }
    let content = fs::read_to_string(log_path)?;

    let mut last: Option<Geometry> = None;
    let mut elements = Vec::new();
    let mut coords = Vec::new();
    let mut in_geom = false;

    for line in content.lines() {
        if line.contains("Input orientation:") || line.contains("Standard orientation:") {
            in_geom = true;
            elements.clear();
            coords.clear();
        } else if in_geom
            && (line.contains("Distance matrix") || line.contains("Rotational constants"))
        {
            in_geom = false;
            if !elements.is_empty() {
                last = Some(Geometry::new(
                    std::mem::take(&mut elements),
                    std::mem::take(&mut coords),
                ));
            }
        } else if in_geom {
            if let Some(caps) = GEOM_RE.captures(line) {
                let atomic_num: usize = caps[1].parse().unwrap_or(0);
                elements.push(atomic_number_to_symbol(atomic_num).to_string());
                coords.push(caps[2].parse().unwrap_or(0.0));
                coords.push(caps[3].parse().unwrap_or(0.0));
                coords.push(caps[4].parse().unwrap_or(0.0));
            }
        }
    }

    last.ok_or_else(|| ParseError::NoStructure(log_path.display().to_string()))
}

/// Extracts HOMO and LUMO energies from a Gaussian log, converted to eV.
///
/// The HOMO is the last occupied eigenvalue, the LUMO the first virtual
/// one, both taken from the population analysis section of the log.
pub fn extract_homo_lumo(log_path: &Path) -> Result<HomoLumo> {
    if !log_path.is_file() {
        return Err(ParseError::MissingLog(log_path.display().to_string()));
    }
    let content = fs::read_to_string(log_path)?;

    let section = POPULATION_RE
        .captures(&content)
        .map(|caps| caps.get(1).map_or("", |m| m.as_str()).to_string())
        .ok_or_else(|| ParseError::MissingPopulation(log_path.display().to_string()))?;

    let occupied = collect_eigenvalues(&OCC_RE, &section)?;
    let virtual_ = collect_eigenvalues(&VIRT_RE, &section)?;
    let (Some(homo), Some(lumo)) = (occupied.last(), virtual_.first()) else {
        return Err(ParseError::MissingEigenvalues(
            log_path.display().to_string(),
        ));
    };

    Ok(HomoLumo {
        homo: homo * HARTREE_TO_EV,
        lumo: lumo * HARTREE_TO_EV,
    })
}

/// Collects the eigenvalues behind every line matching `marker`.
///
/// Matching line remainders are concatenated and split on the fixed
/// 10-character column boundary.
fn collect_eigenvalues(marker: &Regex, section: &str) -> Result<Vec<f64>> {
    let joined: String = marker
        .captures_iter(section)
        .map(|caps| caps.get(1).map_or("", |m| m.as_str()))
        .collect();

    let mut values = Vec::new();
    for chunk in joined.as_bytes().chunks(10) {
        let field = std::str::from_utf8(chunk).unwrap_or("").trim();
        if field.is_empty() {
            continue;
        }
        values.push(
            field
                .parse::<f64>()
                .map_err(|_| ParseError::BadEigenvalue(field.to_string()))?,
        );
    }
    Ok(values)
}
