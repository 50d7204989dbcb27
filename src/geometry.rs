//! Molecular structure data for pipeline stages.
//!
//! This module provides the [`Geometry`] type used throughout the crate to
//! carry molecular structures between the XYZ reader, the engine input
//! writer, and the log parser. It uses a flat representation where
//! coordinates are stored as a single vector in the order
//! [x1, y1, z1, x2, y2, z2, ...].
//!
//! All coordinates are in Angstroms, which is the unit used by both the
//! `init.xyz` input files and the orientation blocks of Gaussian logs.

/// Element symbols indexed by atomic number (index 0 is the dummy "X").
///
/// Used when converting the integer atomic numbers printed in Gaussian
/// orientation blocks back to element symbols for XYZ output.
pub const ELEMENT_SYMBOLS: &[&str] = &[
    "X", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
    "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge",
    "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd",
    "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd",
    "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm",
    "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg",
    "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Returns the element symbol for an atomic number, or "X" if unknown.
pub fn atomic_number_to_symbol(num: usize) -> &'static str {
    ELEMENT_SYMBOLS.get(num).copied().unwrap_or("X")
}

/// A molecular geometry with element symbols and Cartesian coordinates.
///
/// # Examples
///
/// ```
/// use g09run::geometry::Geometry;
///
/// let elements = vec!["O".to_string(), "H".to_string(), "H".to_string()];
/// let coords = vec![
///     0.0, 0.0, 0.0,
///     0.757, 0.586, 0.0,
///     -0.757, 0.586, 0.0,
/// ];
/// let geometry = Geometry::new(elements, coords);
/// assert_eq!(geometry.num_atoms, 3);
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Geometry {
    /// Chemical element symbols for each atom in order
    pub elements: Vec<String>,
    /// Flattened Cartesian coordinates [x1, y1, z1, ...] in Angstroms
    pub coords: Vec<f64>,
    /// Number of atoms in the molecule
    pub num_atoms: usize,
}

impl Geometry {
    /// Create a new `Geometry` from an element list and a flat coordinate vector.
    ///
    /// # Panics
    ///
    /// Panics if `coords.len() != elements.len() * 3`.
    pub fn new(elements: Vec<String>, coords: Vec<f64>) -> Self {
        let num_atoms = elements.len();
        assert_eq!(coords.len(), num_atoms * 3);
        Self {
            elements,
            coords,
            num_atoms,
        }
    }

    /// Get the Cartesian coordinates [x, y, z] of one atom.
    pub fn get_atom_coords(&self, atom_idx: usize) -> [f64; 3] {
        let i = atom_idx * 3;
        [self.coords[i], self.coords[i + 1], self.coords[i + 2]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_lookup() {
        assert_eq!(atomic_number_to_symbol(1), "H");
        assert_eq!(atomic_number_to_symbol(6), "C");
        assert_eq!(atomic_number_to_symbol(118), "Og");
        assert_eq!(atomic_number_to_symbol(300), "X");
    }

    #[test]
    fn atom_coords() {
        let geom = Geometry::new(
            vec!["C".to_string(), "O".to_string()],
            vec![0.0, 0.0, 0.0, 1.128, 0.0, 0.0],
        );
        assert_eq!(geom.get_atom_coords(1), [1.128, 0.0, 0.0]);
    }
}
