use phf::phf_map;

/// Static properties of a chemical element as needed for structure parsing and
/// descriptor calculation.
#[derive(Debug, PartialEq)]
pub struct Element {
    pub symbol: &'static str,
    pub atomic_number: u8,
    /// Standard atomic weight in g/mol.
    pub mass: f64,
    /// Allowed valences for implicit hydrogen assignment, smallest first.
    /// Empty for elements outside the SMILES organic subset.
    pub valences: &'static [u8],
}

impl Element {
    /// Whether the element may appear outside square brackets in SMILES.
    pub fn is_organic_subset(&self) -> bool {
        !self.valences.is_empty()
    }

    pub fn is_carbon(&self) -> bool {
        self.atomic_number == 6
    }

    pub fn is_hydrogen(&self) -> bool {
        self.atomic_number == 1
    }

    pub fn is_halogen(&self) -> bool {
        matches!(self.atomic_number, 9 | 17 | 35 | 53)
    }
}

macro_rules! element {
    ($symbol:literal, $z:literal, $mass:literal) => {
        Element {
            symbol: $symbol,
            atomic_number: $z,
            mass: $mass,
            valences: &[],
        }
    };
    ($symbol:literal, $z:literal, $mass:literal, [$($v:literal),+]) => {
        Element {
            symbol: $symbol,
            atomic_number: $z,
            mass: $mass,
            valences: &[$($v),+],
        }
    };
}

static ELEMENTS: phf::Map<&'static str, Element> = phf_map! {
    "H" => element!("H", 1, 1.008),
    "He" => element!("He", 2, 4.003),
    "Li" => element!("Li", 3, 6.941),
    "Be" => element!("Be", 4, 9.012),
    "B" => element!("B", 5, 10.812, [3]),
    "C" => element!("C", 6, 12.011, [4]),
    "N" => element!("N", 7, 14.007, [3, 5]),
    "O" => element!("O", 8, 15.999, [2]),
    "F" => element!("F", 9, 18.998, [1]),
    "Ne" => element!("Ne", 10, 20.180),
    "Na" => element!("Na", 11, 22.990),
    "Mg" => element!("Mg", 12, 24.305),
    "Al" => element!("Al", 13, 26.982),
    "Si" => element!("Si", 14, 28.086),
    "P" => element!("P", 15, 30.974, [3, 5]),
    "S" => element!("S", 16, 32.067, [2, 4, 6]),
    "Cl" => element!("Cl", 17, 35.453, [1]),
    "Ar" => element!("Ar", 18, 39.948),
    "K" => element!("K", 19, 39.098),
    "Ca" => element!("Ca", 20, 40.078),
    "Ti" => element!("Ti", 22, 47.867),
    "V" => element!("V", 23, 50.942),
    "Cr" => element!("Cr", 24, 51.996),
    "Mn" => element!("Mn", 25, 54.938),
    "Fe" => element!("Fe", 26, 55.845),
    "Co" => element!("Co", 27, 58.933),
    "Ni" => element!("Ni", 28, 58.693),
    "Cu" => element!("Cu", 29, 63.546),
    "Zn" => element!("Zn", 30, 65.390),
    "Ga" => element!("Ga", 31, 69.723),
    "Ge" => element!("Ge", 32, 72.610),
    "As" => element!("As", 33, 74.922),
    "Se" => element!("Se", 34, 78.971),
    "Br" => element!("Br", 35, 79.904, [1]),
    "Kr" => element!("Kr", 36, 83.800),
    "Rb" => element!("Rb", 37, 85.468),
    "Sr" => element!("Sr", 38, 87.620),
    "Zr" => element!("Zr", 40, 91.224),
    "Mo" => element!("Mo", 42, 95.940),
    "Pd" => element!("Pd", 46, 106.420),
    "Ag" => element!("Ag", 47, 107.868),
    "Cd" => element!("Cd", 48, 112.411),
    "Sn" => element!("Sn", 50, 118.710),
    "Sb" => element!("Sb", 51, 121.760),
    "Te" => element!("Te", 52, 127.600),
    "I" => element!("I", 53, 126.904, [1]),
    "Xe" => element!("Xe", 54, 131.290),
    "Cs" => element!("Cs", 55, 132.905),
    "Ba" => element!("Ba", 56, 137.327),
    "La" => element!("La", 57, 138.906),
    "Gd" => element!("Gd", 64, 157.250),
    "W" => element!("W", 74, 183.840),
    "Pt" => element!("Pt", 78, 195.078),
    "Au" => element!("Au", 79, 196.967),
    "Hg" => element!("Hg", 80, 200.590),
    "Pb" => element!("Pb", 82, 207.200),
    "Bi" => element!("Bi", 83, 208.980),
};

/// Looks up an element by its case-sensitive symbol (e.g. `"Cl"`).
pub fn lookup(symbol: &str) -> Option<&'static Element> {
    ELEMENTS.get(symbol)
}

/// The element record for hydrogen.
pub fn hydrogen() -> &'static Element {
    &ELEMENTS["H"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(lookup("Cl").map(|e| e.atomic_number), Some(17));
        assert!(lookup("CL").is_none());
        assert_eq!(lookup("C").map(|e| e.atomic_number), Some(6));
    }

    #[test]
    fn organic_subset_elements_carry_default_valences() {
        for symbol in ["B", "C", "N", "O", "P", "S", "F", "Cl", "Br", "I"] {
            let element = lookup(symbol).unwrap();
            assert!(element.is_organic_subset(), "{symbol} should be organic");
        }
        assert!(!lookup("Na").unwrap().is_organic_subset());
        assert_eq!(lookup("S").unwrap().valences, &[2, 4, 6]);
    }

    #[test]
    fn element_classification_helpers() {
        assert!(lookup("Br").unwrap().is_halogen());
        assert!(!lookup("O").unwrap().is_halogen());
        assert!(hydrogen().is_hydrogen());
        assert!(lookup("C").unwrap().is_carbon());
    }
}
