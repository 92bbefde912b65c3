use super::ids::AtomId;
use super::molecule::{Atom, BondOrder, Molecule};
use super::smiles;
use serde::Serialize;
use tracing::debug;

pub const DESCRIPTOR_COUNT: usize = 6;

/// Column names of the descriptor vector, in [`Descriptors::as_array`] order.
pub const DESCRIPTOR_NAMES: [&str; DESCRIPTOR_COUNT] = [
    "mol_weight",
    "logp",
    "tpsa",
    "h_donors",
    "h_acceptors",
    "rule_of_five",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Descriptors {
    pub mol_weight: f64,
    pub logp: f64,
    pub tpsa: f64,
    pub h_donors: u32,
    pub h_acceptors: u32,
    /// 1 when at least three of the four Lipinski criteria hold, otherwise 0.
    pub rule_of_five: u8,
}

impl Descriptors {
    pub fn from_molecule(molecule: &Molecule) -> Self {
        let mol_weight = molecule.molecular_weight();
        let logp = crippen_logp(molecule);
        let tpsa = topological_polar_surface_area(molecule);
        let h_donors = hydrogen_bond_donors(molecule);
        let h_acceptors = hydrogen_bond_acceptors(molecule);

        let satisfied = [
            mol_weight <= 500.0,
            logp <= 5.0,
            h_donors <= 5,
            h_acceptors <= 10,
        ]
        .into_iter()
        .filter(|&criterion| criterion)
        .count();

        Self {
            mol_weight,
            logp,
            tpsa,
            h_donors,
            h_acceptors,
            rule_of_five: u8::from(satisfied >= 3),
        }
    }

    pub fn as_array(&self) -> [f64; DESCRIPTOR_COUNT] {
        [
            self.mol_weight,
            self.logp,
            self.tpsa,
            f64::from(self.h_donors),
            f64::from(self.h_acceptors),
            f64::from(self.rule_of_five),
        ]
    }

    fn is_finite(&self) -> bool {
        self.mol_weight.is_finite() && self.logp.is_finite() && self.tpsa.is_finite()
    }
}

/// The outcome of describing one structure string.
///
/// Unparseable structures and failed descriptor calculations are both reported as
/// [`FeatureVector::Invalid`]; callers cannot and should not tell them apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureVector {
    Valid(Descriptors),
    Invalid,
}

impl FeatureVector {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn descriptors(&self) -> Option<&Descriptors> {
        match self {
            Self::Valid(descriptors) => Some(descriptors),
            Self::Invalid => None,
        }
    }

    /// The six descriptor values, or six NaNs for an invalid structure.
    pub fn as_array(&self) -> [f64; DESCRIPTOR_COUNT] {
        match self {
            Self::Valid(descriptors) => descriptors.as_array(),
            Self::Invalid => [f64::NAN; DESCRIPTOR_COUNT],
        }
    }
}

pub trait DescriptorProvider: Send + Sync {
    /// Computes the descriptor vector for a structure string. Never fails; problems
    /// are folded into [`FeatureVector::Invalid`].
    fn describe(&self, smiles: &str) -> FeatureVector;
}

/// Descriptor provider backed by the built-in SMILES parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmilesDescriptors;

impl DescriptorProvider for SmilesDescriptors {
    fn describe(&self, smiles: &str) -> FeatureVector {
        match smiles::parse(smiles) {
            Ok(molecule) => {
                let descriptors = Descriptors::from_molecule(&molecule);
                if descriptors.is_finite() {
                    FeatureVector::Valid(descriptors)
                } else {
                    debug!(smiles, "Descriptor calculation produced non-finite values");
                    FeatureVector::Invalid
                }
            }
            Err(err) => {
                debug!(smiles, error = %err, "Failed to parse structure");
                FeatureVector::Invalid
            }
        }
    }
}

/// Bonding environment of one atom, counted over heavy (non-hydrogen) neighbors.
#[derive(Debug, Default)]
struct Environment {
    single: u8,
    double: u8,
    triple: u8,
    aromatic: u8,
    heavy_degree: u8,
    hydrogens: u8,
}

impl Environment {
    fn of(molecule: &Molecule, id: AtomId) -> Self {
        let mut env = Self {
            hydrogens: molecule.total_hydrogens(id),
            ..Self::default()
        };
        for (partner, bond) in molecule.neighbors(id) {
            if is_hydrogen(molecule, partner) {
                continue;
            }
            env.heavy_degree += 1;
            match bond.order {
                BondOrder::Single => env.single += 1,
                BondOrder::Double => env.double += 1,
                BondOrder::Triple => env.triple += 1,
                BondOrder::Aromatic => env.aromatic += 1,
            }
        }
        env
    }

    fn explicit_valence(&self) -> u8 {
        self.single + 2 * self.double + 3 * self.triple + self.aromatic + self.hydrogens
    }
}

fn is_hydrogen(molecule: &Molecule, id: AtomId) -> bool {
    molecule
        .atom(id)
        .is_some_and(|atom| atom.element.is_hydrogen())
}

fn heavy_atoms(molecule: &Molecule) -> impl Iterator<Item = (AtomId, &Atom)> {
    molecule
        .atoms_iter()
        .filter(|(_, atom)| !atom.element.is_hydrogen())
}

fn heavy_neighbors<'a>(
    molecule: &'a Molecule,
    id: AtomId,
) -> impl Iterator<Item = (&'a Atom, BondOrder)> + 'a {
    molecule.neighbors(id).filter_map(move |(partner, bond)| {
        molecule
            .atom(partner)
            .filter(|atom| !atom.element.is_hydrogen())
            .map(|atom| (atom, bond.order))
    })
}

fn is_heteroatom(atom: &Atom) -> bool {
    matches!(atom.element.atomic_number, 7 | 8 | 9 | 15 | 16 | 17 | 35 | 53)
}

/// Wildman-Crippen style logP over a reduced atom-type table.
fn crippen_logp(molecule: &Molecule) -> f64 {
    let mut total = 0.0;
    for (id, atom) in molecule.atoms_iter() {
        if atom.element.is_hydrogen() {
            if molecule.degree(id) == 0 {
                total += 0.1230;
            }
            continue;
        }
        let env = Environment::of(molecule, id);
        total += heavy_atom_contribution(molecule, id, atom, &env);
        total += f64::from(env.hydrogens) * hydrogen_contribution(molecule, id, atom);
    }
    total
}

fn heavy_atom_contribution(molecule: &Molecule, id: AtomId, atom: &Atom, env: &Environment) -> f64 {
    match atom.element.atomic_number {
        6 if atom.aromatic => aromatic_carbon(molecule, id, env),
        6 => aliphatic_carbon(molecule, id, env),
        7 if atom.aromatic => -0.4806,
        7 => match (atom.charge, env.hydrogens) {
            (0, 2) => -1.0190,
            (0, 1) => -0.7096,
            _ => -0.3187,
        },
        8 if atom.aromatic => 0.1552,
        8 => {
            if env.hydrogens > 0 || atom.charge < 0 {
                -0.2893
            } else if env.double > 0 {
                -0.1526
            } else if heavy_neighbors(molecule, id).any(|(partner, _)| partner.aromatic) {
                -0.4195
            } else {
                -0.0684
            }
        }
        9 => 0.4202,
        17 => 0.6895,
        35 => 0.8456,
        53 => 0.8857,
        15 => 0.8612,
        16 if atom.aromatic => 0.6237,
        16 => 0.6482,
        _ => 0.0,
    }
}

fn aliphatic_carbon(molecule: &Molecule, id: AtomId, env: &Environment) -> f64 {
    if env.triple > 0 {
        return 0.0017;
    }
    if env.double > 0 {
        let to_heteroatom = heavy_neighbors(molecule, id)
            .any(|(partner, order)| order == BondOrder::Double && !partner.element.is_carbon());
        return if to_heteroatom { -0.2783 } else { 0.1551 };
    }

    let mut hetero = false;
    let mut aromatic = false;
    for (partner, _) in heavy_neighbors(molecule, id) {
        hetero |= is_heteroatom(partner);
        aromatic |= partner.aromatic;
    }

    match (hetero, aromatic, env.hydrogens) {
        (true, _, h) if h >= 2 => -0.2035,
        (true, _, _) => -0.2051,
        (false, true, 3) => 0.08452,
        (false, true, 2) => -0.0516,
        (false, true, 1) => 0.1193,
        (false, true, _) => -0.0967,
        (false, false, h) if h >= 2 => 0.1441,
        (false, false, _) => 0.0,
    }
}

fn aromatic_carbon(molecule: &Molecule, id: AtomId, env: &Environment) -> f64 {
    if env.hydrogens > 0 {
        return 0.1581;
    }
    let substituent = heavy_neighbors(molecule, id).find(|(_, order)| *order != BondOrder::Aromatic);
    match substituent {
        None => 0.2955,
        Some((partner, _)) if partner.aromatic => 0.2713,
        Some((partner, _)) => match partner.element.atomic_number {
            7 => 0.4619,
            8 => 0.5437,
            16 => 0.1893,
            _ => 0.1360,
        },
    }
}

fn hydrogen_contribution(molecule: &Molecule, id: AtomId, atom: &Atom) -> f64 {
    match atom.element.atomic_number {
        7 => 0.2142,
        8 if is_acid_oxygen(molecule, id) => 0.2980,
        8 => -0.2677,
        _ => 0.1230,
    }
}

/// An oxygen bonded to a carbon that also carries a double bond, as in carboxylic acids.
fn is_acid_oxygen(molecule: &Molecule, id: AtomId) -> bool {
    molecule.neighbors(id).any(|(partner, _)| {
        molecule.atom(partner).is_some_and(|atom| atom.element.is_carbon() && !atom.aromatic)
            && molecule
                .neighbors(partner)
                .any(|(other, bond)| other != id && bond.order == BondOrder::Double)
    })
}

/// True when the atom and two of its neighbors form a three-membered ring.
fn in_three_ring(molecule: &Molecule, id: AtomId) -> bool {
    let partners: Vec<AtomId> = molecule.neighbors(id).map(|(partner, _)| partner).collect();
    partners.iter().enumerate().any(|(i, &a)| {
        partners[i + 1..]
            .iter()
            .any(|&b| molecule.bond_between(a, b).is_some())
    })
}

/// Ertl topological polar surface area, restricted to nitrogen and oxygen.
fn topological_polar_surface_area(molecule: &Molecule) -> f64 {
    heavy_atoms(molecule)
        .map(|(id, atom)| {
            let env = Environment::of(molecule, id);
            match atom.element.atomic_number {
                7 => nitrogen_psa(molecule, id, atom, &env),
                8 => oxygen_psa(molecule, id, atom, &env),
                _ => 0.0,
            }
        })
        .sum()
}

fn nitrogen_psa(molecule: &Molecule, id: AtomId, atom: &Atom, env: &Environment) -> f64 {
    let key = (
        atom.charge,
        env.hydrogens,
        env.single,
        env.double,
        env.triple,
        env.aromatic,
    );
    let tabulated = match key {
        (0, 0, 3, 0, 0, 0) if in_three_ring(molecule, id) => Some(3.01),
        (0, 0, 3, 0, 0, 0) => Some(3.24),
        (0, 0, 1, 1, 0, 0) => Some(12.36),
        (0, 0, 0, 0, 1, 0) => Some(23.79),
        (0, 0, 1, 2, 0, 0) => Some(11.68),
        (0, 0, 0, 1, 1, 0) => Some(13.60),
        (0, 1, 2, 0, 0, 0) if in_three_ring(molecule, id) => Some(21.94),
        (0, 1, 2, 0, 0, 0) => Some(12.03),
        (0, 1, 0, 1, 0, 0) => Some(23.85),
        (0, 2, 1, 0, 0, 0) => Some(26.02),
        (1, 0, 4, 0, 0, 0) => Some(0.00),
        (1, 0, 2, 1, 0, 0) => Some(3.01),
        (1, 0, 1, 0, 1, 0) => Some(4.36),
        (1, 1, 3, 0, 0, 0) => Some(4.44),
        (1, 1, 1, 1, 0, 0) => Some(13.97),
        (1, 2, 2, 0, 0, 0) => Some(16.61),
        (1, 2, 0, 1, 0, 0) => Some(25.59),
        (1, 3, 1, 0, 0, 0) => Some(27.64),
        (0, 0, 0, 0, 0, 2) => Some(12.89),
        (0, 0, 0, 0, 0, 3) => Some(4.41),
        (0, 0, 1, 0, 0, 2) => Some(4.93),
        (0, 0, 0, 1, 0, 2) => Some(8.39),
        (0, 1, 0, 0, 0, 2) => Some(15.79),
        (1, 0, 0, 0, 0, 3) => Some(4.10),
        (1, 0, 1, 0, 0, 2) => Some(3.88),
        (1, 1, 0, 0, 0, 2) => Some(14.14),
        _ => None,
    };
    tabulated.unwrap_or_else(|| {
        30.5 - 8.2 * f64::from(env.heavy_degree) + 1.5 * f64::from(env.hydrogens)
    })
}

fn oxygen_psa(molecule: &Molecule, id: AtomId, atom: &Atom, env: &Environment) -> f64 {
    let key = (
        atom.charge,
        env.hydrogens,
        env.single,
        env.double,
        env.aromatic,
    );
    let tabulated = match key {
        (0, 0, 2, 0, 0) if in_three_ring(molecule, id) => Some(12.53),
        (0, 0, 2, 0, 0) => Some(9.23),
        (0, 0, 0, 1, 0) => Some(17.07),
        (0, 1, 1, 0, 0) => Some(20.23),
        (-1, 0, 1, 0, 0) => Some(23.06),
        (0, 0, 0, 0, 2) => Some(13.14),
        _ => None,
    };
    tabulated.unwrap_or_else(|| {
        28.5 - 8.6 * f64::from(env.heavy_degree) + 1.5 * f64::from(env.hydrogens)
    })
}

/// Donor atoms: N-H (neutral trivalent or cationic tetravalent), neutral O-H and S-H
/// with exactly one hydrogen, and aromatic n-H.
fn hydrogen_bond_donors(molecule: &Molecule) -> u32 {
    heavy_atoms(molecule)
        .filter(|&(id, atom)| {
            let env = Environment::of(molecule, id);
            match (atom.element.atomic_number, atom.aromatic) {
                (7, false) => {
                    env.hydrogens > 0
                        && ((atom.charge == 0 && env.explicit_valence() == 3)
                            || (atom.charge == 1 && env.explicit_valence() == 4))
                }
                (7, true) => atom.charge == 0 && env.hydrogens == 1,
                (8 | 16, false) => atom.charge == 0 && env.hydrogens == 1,
                _ => false,
            }
        })
        .count() as u32
}

/// Acceptor atoms: divalent O/S that are not acidic hydroxyls, anionic O/S,
/// trivalent non-amide N, pyridine-like aromatic n, furan-like o/s, and fluorine.
fn hydrogen_bond_acceptors(molecule: &Molecule) -> u32 {
    heavy_atoms(molecule)
        .filter(|&(id, atom)| {
            let env = Environment::of(molecule, id);
            match (atom.element.atomic_number, atom.aromatic) {
                (8 | 16, false) if atom.charge < 0 => true,
                (8 | 16, false) => {
                    atom.charge == 0
                        && env.explicit_valence() == 2
                        && match env.hydrogens {
                            0 => true,
                            1 => !attached_to_unsaturated_heteroatom_center(molecule, id),
                            _ => false,
                        }
                }
                (7, false) => {
                    atom.charge == 0
                        && env.explicit_valence() == 3
                        && !attached_to_unsaturated_heteroatom_center(molecule, id)
                }
                (7 | 8 | 16, true) => atom.charge == 0 && env.hydrogens == 0,
                (9, _) => true,
                _ => false,
            }
        })
        .count() as u32
}

/// Whether a single-bonded neighbor carries a double bond to O, N, P or S, as in
/// amides and carboxylic acids.
fn attached_to_unsaturated_heteroatom_center(molecule: &Molecule, id: AtomId) -> bool {
    molecule
        .neighbors(id)
        .filter(|(_, bond)| bond.order == BondOrder::Single)
        .any(|(partner, _)| {
            molecule.neighbors(partner).any(|(other, bond)| {
                other != id
                    && bond.order == BondOrder::Double
                    && molecule.atom(other).is_some_and(|atom| {
                        matches!(atom.element.atomic_number, 7 | 8 | 15 | 16)
                    })
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(smiles: &str) -> Descriptors {
        *SmilesDescriptors
            .describe(smiles)
            .descriptors()
            .unwrap_or_else(|| panic!("{smiles} should be valid"))
    }

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn invalid_structures_yield_nan_sentinel() {
        for smiles in ["", "C1CC", "not a smiles", "cc"] {
            let vector = SmilesDescriptors.describe(smiles);
            assert!(!vector.is_valid(), "{smiles:?} should be invalid");
            assert!(vector.as_array().iter().all(|value| value.is_nan()));
        }
    }

    #[test]
    fn valid_structures_yield_six_finite_values() {
        for smiles in ["O", "CCO", "c1ccccc1", "CS(C)=O", "C1CCOC1", "CN1C=NC2=C1C(=O)N(C(=O)N2C)C"] {
            let values = SmilesDescriptors.describe(smiles).as_array();
            assert_eq!(values.len(), DESCRIPTOR_COUNT);
            assert!(values.iter().all(|value| value.is_finite()), "{smiles}");
        }
    }

    #[test]
    fn molecular_weight_includes_hydrogens() {
        assert_close(describe("O").mol_weight, 18.015, 1e-3);
        assert_close(describe("CCO").mol_weight, 46.069, 1e-3);
        assert_close(describe("c1ccccc1").mol_weight, 78.114, 1e-3);
    }

    #[test]
    fn crippen_logp_matches_reference_values() {
        assert_close(describe("O").logp, -0.8247, 1e-4);
        assert_close(describe("CC(C)=O").logp, 0.5953, 1e-4);
        assert_close(describe("CCO").logp, -0.0014, 1e-4);
        assert_close(describe("c1ccccc1").logp, 1.6866, 1e-4);
        assert_close(describe("CC(=O)O").logp, 0.0909, 1e-4);
        assert_close(describe("Oc1ccccc1").logp, 1.3922, 1e-4);
    }

    #[test]
    fn polar_surface_area_uses_ertl_contributions() {
        assert_close(describe("CCO").tpsa, 20.23, 1e-6);
        assert_close(describe("CC(C)=O").tpsa, 17.07, 1e-6);
        assert_close(describe("c1ccncc1").tpsa, 12.89, 1e-6);
        assert_close(describe("CC(=O)O").tpsa, 37.30, 1e-6);
        assert_close(describe("O").tpsa, 31.5, 1e-6);
        assert_close(describe("CCCC").tpsa, 0.0, 1e-12);
    }

    #[test]
    fn hydrogen_bond_counts_follow_lipinski_style_rules() {
        let ethanol = describe("CCO");
        assert_eq!((ethanol.h_donors, ethanol.h_acceptors), (1, 1));

        let acetic_acid = describe("CC(=O)O");
        assert_eq!((acetic_acid.h_donors, acetic_acid.h_acceptors), (1, 1));

        let acetamide = describe("CC(N)=O");
        assert_eq!((acetamide.h_donors, acetamide.h_acceptors), (1, 1));

        let pyridine = describe("c1ccncc1");
        assert_eq!((pyridine.h_donors, pyridine.h_acceptors), (0, 1));

        let pyrrole = describe("c1cc[nH]c1");
        assert_eq!((pyrrole.h_donors, pyrrole.h_acceptors), (1, 0));
    }

    #[test]
    fn rule_of_five_flags_small_and_large_molecules() {
        assert_eq!(describe("CCO").rule_of_five, 1);

        // A long perfluorinated chain breaks the weight, logP and acceptor limits.
        let long_chain = format!("C{}", "C(F)(F)".repeat(20));
        assert_eq!(describe(&long_chain).rule_of_five, 0);
    }
}
