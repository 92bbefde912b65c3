use super::elements::{self, Element};
use super::ids::AtomId;
use slotmap::{SecondaryMap, SlotMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    /// Integer contribution of the bond to an atom's explicit valence.
    /// Aromatic bonds count as single; the extra pi electron is accounted for per atom.
    pub fn valence(self) -> u8 {
        match self {
            Self::Single | Self::Aromatic => 1,
            Self::Double => 2,
            Self::Triple => 3,
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Single => "Single",
                Self::Double => "Double",
                Self::Triple => "Triple",
                Self::Aromatic => "Aromatic",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub atom1_id: AtomId,
    pub atom2_id: AtomId,
    pub order: BondOrder,
}

impl Bond {
    pub fn contains(&self, atom_id: AtomId) -> bool {
        self.atom1_id == atom_id || self.atom2_id == atom_id
    }

    pub fn partner(&self, atom_id: AtomId) -> Option<AtomId> {
        if self.atom1_id == atom_id {
            Some(self.atom2_id)
        } else if self.atom2_id == atom_id {
            Some(self.atom1_id)
        } else {
            None
        }
    }
}

/// A heavy atom (or explicit bracket hydrogen) in the molecular graph.
#[derive(Debug, Clone)]
pub struct Atom {
    pub element: &'static Element,
    pub aromatic: bool,
    pub charge: i8,
    pub isotope: Option<u16>,
    /// `true` if the atom was written in square brackets, which pins its hydrogen count.
    pub bracket: bool,
    /// Hydrogens attached to this atom that are not themselves graph nodes.
    pub hydrogens: u8,
}

impl Atom {
    pub fn new(element: &'static Element) -> Self {
        Self {
            element,
            aromatic: false,
            charge: 0,
            isotope: None,
            bracket: false,
            hydrogens: 0,
        }
    }

    pub fn symbol(&self) -> &'static str {
        self.element.symbol
    }

    pub fn is_element(&self, atomic_number: u8) -> bool {
        self.element.atomic_number == atomic_number
    }
}

/// An undirected molecular graph with implicit hydrogens folded into heavy atoms.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    atoms: SlotMap<AtomId, Atom>,
    bonds: Vec<Bond>,
    adjacency: SecondaryMap<AtomId, Vec<usize>>,
    ring_bonds: Vec<bool>,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_atom(&mut self, atom: Atom) -> AtomId {
        let id = self.atoms.insert(atom);
        self.adjacency.insert(id, Vec::new());
        id
    }

    /// Adds a bond between two existing atoms.
    ///
    /// Returns `None` when either atom is unknown, the atoms are identical or the pair is
    /// already bonded.
    pub fn add_bond(&mut self, atom1_id: AtomId, atom2_id: AtomId, order: BondOrder) -> Option<usize> {
        if atom1_id == atom2_id
            || !self.atoms.contains_key(atom1_id)
            || !self.atoms.contains_key(atom2_id)
            || self.bond_between(atom1_id, atom2_id).is_some()
        {
            return None;
        }
        let index = self.bonds.len();
        self.bonds.push(Bond {
            atom1_id,
            atom2_id,
            order,
        });
        self.ring_bonds.push(false);
        self.adjacency.get_mut(atom1_id)?.push(index);
        self.adjacency.get_mut(atom2_id)?.push(index);
        Some(index)
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atoms.iter()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn bond_between(&self, atom1_id: AtomId, atom2_id: AtomId) -> Option<&Bond> {
        self.adjacency
            .get(atom1_id)?
            .iter()
            .map(|&index| &self.bonds[index])
            .find(|bond| bond.contains(atom2_id))
    }

    /// Iterates over `(neighbor, bond)` pairs for an atom.
    pub fn neighbors(&self, id: AtomId) -> impl Iterator<Item = (AtomId, &Bond)> + '_ {
        self.adjacency
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(move |&index| {
                let bond = &self.bonds[index];
                bond.partner(id).map(|partner| (partner, bond))
            })
    }

    /// Number of explicit graph neighbors.
    pub fn degree(&self, id: AtomId) -> usize {
        self.adjacency.get(id).map_or(0, Vec::len)
    }

    /// Sum of bond valence contributions to graph neighbors.
    pub fn bond_order_sum(&self, id: AtomId) -> u8 {
        self.neighbors(id)
            .map(|(_, bond)| bond.order.valence())
            .fold(0u8, u8::saturating_add)
    }

    pub fn is_bond_in_ring(&self, bond_index: usize) -> bool {
        self.ring_bonds.get(bond_index).copied().unwrap_or(false)
    }

    pub fn is_atom_in_ring(&self, id: AtomId) -> bool {
        self.adjacency
            .get(id)
            .is_some_and(|bonds| bonds.iter().any(|&index| self.is_bond_in_ring(index)))
    }

    /// Total hydrogens on an atom, counting both folded hydrogens and explicit
    /// hydrogen neighbors.
    pub fn total_hydrogens(&self, id: AtomId) -> u8 {
        let folded = self.atom(id).map_or(0, |atom| atom.hydrogens);
        let explicit = self
            .neighbors(id)
            .filter(|(partner, _)| {
                self.atom(*partner)
                    .is_some_and(|atom| atom.element.is_hydrogen())
            })
            .count() as u8;
        folded.saturating_add(explicit)
    }

    /// Average molecular weight including every hydrogen.
    pub fn molecular_weight(&self) -> f64 {
        let hydrogen_mass = elements::hydrogen().mass;
        self.atoms
            .values()
            .map(|atom| atom.element.mass + f64::from(atom.hydrogens) * hydrogen_mass)
            .sum()
    }

    /// Marks every bond that lies on a cycle.
    ///
    /// A bond is a ring bond exactly when it is not a bridge of the graph, so this runs an
    /// iterative Tarjan bridge search over every connected component.
    pub fn perceive_rings(&mut self) {
        let ids: Vec<AtomId> = self.atoms.keys().collect();
        let mut order: SecondaryMap<AtomId, usize> = SecondaryMap::new();
        let mut low: SecondaryMap<AtomId, usize> = SecondaryMap::new();
        let mut is_bridge = vec![false; self.bonds.len()];
        let mut counter = 0usize;

        for &root in &ids {
            if order.contains_key(root) {
                continue;
            }
            order.insert(root, counter);
            low.insert(root, counter);
            counter += 1;

            // (atom, bond used to enter it, next adjacency position)
            let mut stack: Vec<(AtomId, Option<usize>, usize)> = vec![(root, None, 0)];
            while let Some(frame) = stack.last_mut() {
                let (atom, parent_bond, cursor) = *frame;
                let edges = &self.adjacency[atom];
                if cursor < edges.len() {
                    frame.2 += 1;
                    let bond_index = edges[cursor];
                    if Some(bond_index) == parent_bond {
                        continue;
                    }
                    let Some(next) = self.bonds[bond_index].partner(atom) else {
                        continue;
                    };
                    if let Some(&next_order) = order.get(next) {
                        if next_order < low[atom] {
                            low[atom] = next_order;
                        }
                    } else {
                        order.insert(next, counter);
                        low.insert(next, counter);
                        counter += 1;
                        stack.push((next, Some(bond_index), 0));
                    }
                } else {
                    stack.pop();
                    if let (Some(bond_index), Some(&(parent, _, _))) = (parent_bond, stack.last()) {
                        if low[atom] < low[parent] {
                            low[parent] = low[atom];
                        }
                        if low[atom] > order[parent] {
                            is_bridge[bond_index] = true;
                        }
                    }
                }
            }
        }

        self.ring_bonds = is_bridge.into_iter().map(|bridge| !bridge).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carbon() -> Atom {
        Atom::new(elements::lookup("C").unwrap())
    }

    fn chain(molecule: &mut Molecule, length: usize) -> Vec<AtomId> {
        let ids: Vec<AtomId> = (0..length).map(|_| molecule.add_atom(carbon())).collect();
        for pair in ids.windows(2) {
            molecule.add_bond(pair[0], pair[1], BondOrder::Single).unwrap();
        }
        ids
    }

    #[test]
    fn add_bond_rejects_self_and_duplicate_bonds() {
        let mut molecule = Molecule::new();
        let ids = chain(&mut molecule, 2);
        assert!(molecule.add_bond(ids[0], ids[0], BondOrder::Single).is_none());
        assert!(molecule.add_bond(ids[1], ids[0], BondOrder::Double).is_none());
        assert_eq!(molecule.bonds().len(), 1);
    }

    #[test]
    fn neighbors_and_bond_order_sum_follow_bonds() {
        let mut molecule = Molecule::new();
        let a = molecule.add_atom(carbon());
        let b = molecule.add_atom(carbon());
        let c = molecule.add_atom(carbon());
        molecule.add_bond(a, b, BondOrder::Double).unwrap();
        molecule.add_bond(b, c, BondOrder::Single).unwrap();

        assert_eq!(molecule.degree(b), 2);
        assert_eq!(molecule.bond_order_sum(b), 3);
        let partners: Vec<AtomId> = molecule.neighbors(b).map(|(id, _)| id).collect();
        assert!(partners.contains(&a) && partners.contains(&c));
    }

    #[test]
    fn ring_perception_distinguishes_ring_and_chain_bonds() {
        let mut molecule = Molecule::new();
        let ring = chain(&mut molecule, 6);
        molecule.add_bond(ring[5], ring[0], BondOrder::Single).unwrap();
        let tail = molecule.add_atom(carbon());
        let tail_bond = molecule.add_bond(ring[0], tail, BondOrder::Single).unwrap();

        molecule.perceive_rings();

        assert!(ring.iter().all(|&id| molecule.is_atom_in_ring(id)));
        assert!(!molecule.is_atom_in_ring(tail));
        assert!(!molecule.is_bond_in_ring(tail_bond));
    }

    #[test]
    fn ring_perception_handles_disconnected_fragments() {
        let mut molecule = Molecule::new();
        let linear = chain(&mut molecule, 3);
        let ring = chain(&mut molecule, 3);
        molecule.add_bond(ring[2], ring[0], BondOrder::Single).unwrap();

        molecule.perceive_rings();

        assert!(linear.iter().all(|&id| !molecule.is_atom_in_ring(id)));
        assert!(ring.iter().all(|&id| molecule.is_atom_in_ring(id)));
    }

    #[test]
    fn molecular_weight_counts_folded_hydrogens() {
        let mut molecule = Molecule::new();
        let mut methane = carbon();
        methane.hydrogens = 4;
        molecule.add_atom(methane);
        assert!((molecule.molecular_weight() - 16.043).abs() < 1e-3);
    }
}
