use super::elements::{self, Element};
use super::ids::AtomId;
use super::molecule::{Atom, BondOrder, Molecule};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid SMILES at position {position}: {kind}")]
pub struct SmilesError {
    pub position: usize,
    pub kind: SmilesErrorKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SmilesErrorKind {
    #[error("empty structure string")]
    Empty,
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("unknown element '{0}'")]
    UnknownElement(String),
    #[error("element '{0}' cannot be aromatic")]
    InvalidAromatic(String),
    #[error("unterminated bracket atom")]
    UnclosedBracket,
    #[error("malformed bracket atom")]
    MalformedBracketAtom,
    #[error("unclosed branch")]
    UnclosedBranch,
    #[error("unmatched ')'")]
    UnmatchedBranchClose,
    #[error("branch or ring bond without a preceding atom")]
    MissingPrecedingAtom,
    #[error("ring closure {0} is never closed")]
    UnclosedRing(u16),
    #[error("conflicting bond symbols on ring closure {0}")]
    ConflictingRingBond(u16),
    #[error("bond symbol is not followed by an atom")]
    DanglingBond,
    #[error("atoms are bonded more than once")]
    DuplicateBond,
    #[error("quadruple bonds are not supported")]
    UnsupportedBond,
    #[error("{symbol} exceeds its maximum valence ({valence} bonds)")]
    ValenceExceeded { symbol: &'static str, valence: u8 },
    #[error("aromatic atom '{0}' is not part of a ring")]
    AromaticOutsideRing(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BondSymbol {
    Single,
    Double,
    Triple,
    Aromatic,
    /// `/` or `\`, stereo markers that are single bonds for our purposes.
    Directional,
}

impl BondSymbol {
    fn order(self) -> BondOrder {
        match self {
            Self::Single | Self::Directional => BondOrder::Single,
            Self::Double => BondOrder::Double,
            Self::Triple => BondOrder::Triple,
            Self::Aromatic => BondOrder::Aromatic,
        }
    }
}

struct OpenRing {
    atom: AtomId,
    bond: Option<BondSymbol>,
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
    molecule: Molecule,
    previous: Option<AtomId>,
    pending_bond: Option<BondSymbol>,
    branches: Vec<(Option<AtomId>, usize)>,
    open_rings: HashMap<u16, OpenRing>,
    ring_positions: HashMap<u16, usize>,
}

/// Parses a SMILES string into a molecular graph with implicit hydrogens assigned and
/// ring membership perceived.
pub fn parse(smiles: &str) -> Result<Molecule, SmilesError> {
    let trimmed = smiles.trim();
    if trimmed.is_empty() {
        return Err(SmilesError {
            position: 0,
            kind: SmilesErrorKind::Empty,
        });
    }
    Parser::new(trimmed).run()
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            source,
            molecule: Molecule::new(),
            previous: None,
            pending_bond: None,
            branches: Vec::new(),
            open_rings: HashMap::new(),
            ring_positions: HashMap::new(),
        }
    }

    fn error(&self, kind: SmilesErrorKind) -> SmilesError {
        SmilesError {
            position: self.pos,
            kind,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn run(mut self) -> Result<Molecule, SmilesError> {
        while let Some(c) = self.peek() {
            match c {
                '(' => {
                    if self.previous.is_none() {
                        return Err(self.error(SmilesErrorKind::MissingPrecedingAtom));
                    }
                    self.branches.push((self.previous, self.pos));
                    self.pos += 1;
                }
                ')' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error(SmilesErrorKind::DanglingBond));
                    }
                    let (anchor, _) = self
                        .branches
                        .pop()
                        .ok_or_else(|| self.error(SmilesErrorKind::UnmatchedBranchClose))?;
                    self.previous = anchor;
                    self.pos += 1;
                }
                '-' | '=' | '#' | ':' | '/' | '\\' | '$' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error(SmilesErrorKind::UnexpectedCharacter(c)));
                    }
                    self.pending_bond = Some(match c {
                        '-' => BondSymbol::Single,
                        '=' => BondSymbol::Double,
                        '#' => BondSymbol::Triple,
                        ':' => BondSymbol::Aromatic,
                        '/' | '\\' => BondSymbol::Directional,
                        _ => return Err(self.error(SmilesErrorKind::UnsupportedBond)),
                    });
                    self.pos += 1;
                }
                '.' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error(SmilesErrorKind::DanglingBond));
                    }
                    self.previous = None;
                    self.pos += 1;
                }
                '0'..='9' | '%' => self.ring_closure()?,
                '[' => {
                    let atom = self.bracket_atom()?;
                    self.attach(atom)?;
                }
                _ => {
                    let atom = self.organic_atom()?;
                    self.attach(atom)?;
                }
            }
        }

        if self.pending_bond.is_some() {
            return Err(self.error(SmilesErrorKind::DanglingBond));
        }
        if let Some(&(_, position)) = self.branches.last() {
            return Err(SmilesError {
                position,
                kind: SmilesErrorKind::UnclosedBranch,
            });
        }
        if let Some(&number) = self.open_rings.keys().min() {
            return Err(SmilesError {
                position: self.ring_positions.get(&number).copied().unwrap_or(0),
                kind: SmilesErrorKind::UnclosedRing(number),
            });
        }
        if self.molecule.atom_count() == 0 {
            return Err(self.error(SmilesErrorKind::Empty));
        }

        let mut molecule = self.molecule;
        molecule.perceive_rings();
        assign_hydrogens(&mut molecule).map_err(|kind| SmilesError {
            position: self.source.len(),
            kind,
        })?;
        Ok(molecule)
    }

    fn bond_order(&self, bond: Option<BondSymbol>, a: AtomId, b: AtomId) -> BondOrder {
        match bond {
            Some(symbol) => symbol.order(),
            None => {
                let aromatic = |id| self.molecule.atom(id).is_some_and(|atom: &Atom| atom.aromatic);
                if aromatic(a) && aromatic(b) {
                    BondOrder::Aromatic
                } else {
                    BondOrder::Single
                }
            }
        }
    }

    fn attach(&mut self, atom: Atom) -> Result<(), SmilesError> {
        let id = self.molecule.add_atom(atom);
        if let Some(previous) = self.previous {
            let symbol = self.pending_bond.take();
            let order = self.bond_order(symbol, previous, id);
            self.molecule
                .add_bond(previous, id, order)
                .ok_or_else(|| self.error(SmilesErrorKind::DuplicateBond))?;
        } else if self.pending_bond.is_some() {
            return Err(self.error(SmilesErrorKind::MissingPrecedingAtom));
        }
        self.previous = Some(id);
        Ok(())
    }

    fn ring_closure(&mut self) -> Result<(), SmilesError> {
        let start = self.pos;
        let number = if self.peek() == Some('%') {
            let digits: String = self.chars.iter().skip(self.pos + 1).take(2).collect();
            if digits.len() != 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
                return Err(self.error(SmilesErrorKind::UnexpectedCharacter('%')));
            }
            self.pos += 3;
            digits
                .parse::<u16>()
                .map_err(|_| self.error(SmilesErrorKind::UnexpectedCharacter('%')))?
        } else {
            let digit = self.peek().and_then(|c| c.to_digit(10)).unwrap_or(0);
            self.pos += 1;
            digit as u16
        };

        let current = self.previous.ok_or(SmilesError {
            position: start,
            kind: SmilesErrorKind::MissingPrecedingAtom,
        })?;
        let bond = self.pending_bond.take();

        match self.open_rings.remove(&number) {
            Some(open) => {
                self.ring_positions.remove(&number);
                let symbol = match (open.bond, bond) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(SmilesError {
                            position: start,
                            kind: SmilesErrorKind::ConflictingRingBond(number),
                        });
                    }
                    (a, b) => a.or(b),
                };
                let order = self.bond_order(symbol, open.atom, current);
                self.molecule
                    .add_bond(open.atom, current, order)
                    .ok_or(SmilesError {
                        position: start,
                        kind: SmilesErrorKind::DuplicateBond,
                    })?;
            }
            None => {
                self.open_rings.insert(
                    number,
                    OpenRing {
                        atom: current,
                        bond,
                    },
                );
                self.ring_positions.insert(number, start);
            }
        }
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<Atom, SmilesError> {
        let c = self.peek().ok_or_else(|| self.error(SmilesErrorKind::Empty))?;
        let next = self.chars.get(self.pos + 1).copied();

        let (symbol, aromatic, width) = match (c, next) {
            ('C', Some('l')) => ("Cl", false, 2),
            ('B', Some('r')) => ("Br", false, 2),
            ('B', _) => ("B", false, 1),
            ('C', _) => ("C", false, 1),
            ('N', _) => ("N", false, 1),
            ('O', _) => ("O", false, 1),
            ('P', _) => ("P", false, 1),
            ('S', _) => ("S", false, 1),
            ('F', _) => ("F", false, 1),
            ('I', _) => ("I", false, 1),
            ('b', _) => ("B", true, 1),
            ('c', _) => ("C", true, 1),
            ('n', _) => ("N", true, 1),
            ('o', _) => ("O", true, 1),
            ('p', _) => ("P", true, 1),
            ('s', _) => ("S", true, 1),
            _ => return Err(self.error(SmilesErrorKind::UnexpectedCharacter(c))),
        };

        let element = elements::lookup(symbol)
            .ok_or_else(|| self.error(SmilesErrorKind::UnknownElement(symbol.to_string())))?;
        self.pos += width;

        let mut atom = Atom::new(element);
        atom.aromatic = aromatic;
        Ok(atom)
    }

    fn bracket_atom(&mut self) -> Result<Atom, SmilesError> {
        let open = self.pos;
        let close = self.chars[open..]
            .iter()
            .position(|&c| c == ']')
            .map(|offset| open + offset)
            .ok_or_else(|| self.error(SmilesErrorKind::UnclosedBracket))?;
        let body: Vec<char> = self.chars[open + 1..close].to_vec();
        let atom = parse_bracket_body(&body).map_err(|kind| SmilesError {
            position: open,
            kind,
        })?;
        self.pos = close + 1;
        Ok(atom)
    }
}

fn parse_bracket_body(body: &[char]) -> Result<Atom, SmilesErrorKind> {
    let mut i = 0;

    let isotope_digits: String = body.iter().take_while(|c| c.is_ascii_digit()).collect();
    i += isotope_digits.len();
    let isotope = if isotope_digits.is_empty() {
        None
    } else {
        Some(
            isotope_digits
                .parse::<u16>()
                .map_err(|_| SmilesErrorKind::MalformedBracketAtom)?,
        )
    };

    let (element, aromatic, width) = bracket_symbol(&body[i..])?;
    i += width;

    while body.get(i) == Some(&'@') {
        i += 1;
    }
    // Extended chirality classes such as @TH1 or @SP2.
    if i > 0 && body.get(i - 1) == Some(&'@') {
        while body
            .get(i)
            .is_some_and(|c| c.is_ascii_uppercase() && *c != 'H')
        {
            i += 1;
            while body.get(i).is_some_and(|c| c.is_ascii_digit()) {
                i += 1;
            }
        }
    }

    let mut hydrogens = 0u8;
    if body.get(i) == Some(&'H') {
        i += 1;
        let digits: String = body[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
        i += digits.len();
        hydrogens = if digits.is_empty() {
            1
        } else {
            digits
                .parse()
                .map_err(|_| SmilesErrorKind::MalformedBracketAtom)?
        };
    }

    let mut charge: i8 = 0;
    if let Some(&sign @ ('+' | '-')) = body.get(i) {
        let unit: i8 = if sign == '+' { 1 } else { -1 };
        i += 1;
        let digits: String = body[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            i += digits.len();
            let magnitude: i8 = digits
                .parse()
                .map_err(|_| SmilesErrorKind::MalformedBracketAtom)?;
            charge = unit * magnitude;
        } else {
            charge = unit;
            while body.get(i) == Some(&sign) {
                charge += unit;
                i += 1;
            }
        }
    }

    if body.get(i) == Some(&':') {
        i += 1;
        let digits = body[i..].iter().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return Err(SmilesErrorKind::MalformedBracketAtom);
        }
        i += digits;
    }

    if i != body.len() {
        return Err(SmilesErrorKind::MalformedBracketAtom);
    }

    let mut atom = Atom::new(element);
    atom.aromatic = aromatic;
    atom.charge = charge;
    atom.isotope = isotope;
    atom.bracket = true;
    atom.hydrogens = hydrogens;
    Ok(atom)
}

fn bracket_symbol(rest: &[char]) -> Result<(&'static Element, bool, usize), SmilesErrorKind> {
    let first = *rest.first().ok_or(SmilesErrorKind::MalformedBracketAtom)?;

    if first.is_ascii_lowercase() {
        let two: String = rest.iter().take(2).collect();
        if two == "se" || two == "as" {
            let symbol: String = [first.to_ascii_uppercase(), rest[1]].iter().collect();
            let element =
                elements::lookup(&symbol).ok_or(SmilesErrorKind::UnknownElement(symbol))?;
            return Ok((element, true, 2));
        }
        return match first {
            'b' | 'c' | 'n' | 'o' | 'p' | 's' => {
                let symbol = first.to_ascii_uppercase().to_string();
                let element =
                    elements::lookup(&symbol).ok_or(SmilesErrorKind::UnknownElement(symbol))?;
                Ok((element, true, 1))
            }
            _ => Err(SmilesErrorKind::InvalidAromatic(first.to_string())),
        };
    }

    if !first.is_ascii_uppercase() {
        return Err(SmilesErrorKind::MalformedBracketAtom);
    }
    if let Some(&second) = rest.get(1) {
        if second.is_ascii_lowercase() {
            let symbol: String = [first, second].iter().collect();
            if let Some(element) = elements::lookup(&symbol) {
                return Ok((element, false, 2));
            }
        }
    }
    let symbol = first.to_string();
    let element = elements::lookup(&symbol).ok_or(SmilesErrorKind::UnknownElement(symbol))?;
    Ok((element, false, 1))
}

/// Assigns implicit hydrogens to organic-subset atoms and validates valences and
/// aromatic ring membership.
fn assign_hydrogens(molecule: &mut Molecule) -> Result<(), SmilesErrorKind> {
    let ids: Vec<AtomId> = molecule.atoms_iter().map(|(id, _)| id).collect();
    for id in ids {
        let bond_sum = molecule.bond_order_sum(id);
        let in_ring = molecule.is_atom_in_ring(id);
        let Some(atom) = molecule.atom_mut(id) else {
            continue;
        };

        if atom.aromatic && !in_ring {
            return Err(SmilesErrorKind::AromaticOutsideRing(atom.symbol()));
        }
        if atom.bracket {
            continue;
        }

        let valences = atom.element.valences;
        let max_valence = valences.last().copied().unwrap_or(0);
        if bond_sum > max_valence {
            return Err(SmilesErrorKind::ValenceExceeded {
                symbol: atom.symbol(),
                valence: bond_sum,
            });
        }

        atom.hydrogens = if atom.aromatic {
            // One valence unit goes to the delocalized pi system; lone-pair donors
            // such as furan oxygen end up with no hydrogens.
            valences
                .first()
                .copied()
                .unwrap_or(0)
                .saturating_sub(bond_sum + 1)
        } else {
            valences
                .iter()
                .find(|&&valence| valence >= bond_sum)
                .map_or(0, |&valence| valence - bond_sum)
        };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hydrogen_count(molecule: &Molecule) -> u32 {
        molecule
            .atoms_iter()
            .map(|(id, _)| u32::from(molecule.total_hydrogens(id)))
            .sum()
    }

    #[test]
    fn parses_simple_chains_with_implicit_hydrogens() {
        let ethanol = parse("CCO").unwrap();
        assert_eq!(ethanol.atom_count(), 3);
        assert_eq!(ethanol.bonds().len(), 2);
        assert_eq!(hydrogen_count(&ethanol), 6);
    }

    #[test]
    fn parses_water_and_two_letter_halogens() {
        let water = parse("O").unwrap();
        assert_eq!(hydrogen_count(&water), 2);

        let chloroform = parse("ClC(Cl)Cl").unwrap();
        assert_eq!(chloroform.atom_count(), 4);
        assert_eq!(hydrogen_count(&chloroform), 1);
    }

    #[test]
    fn parses_aromatic_rings() {
        let benzene = parse("c1ccccc1").unwrap();
        assert_eq!(benzene.atom_count(), 6);
        assert!(
            benzene
                .bonds()
                .iter()
                .all(|bond| bond.order == BondOrder::Aromatic)
        );
        assert_eq!(hydrogen_count(&benzene), 6);

        let pyridine = parse("c1ccncc1").unwrap();
        assert_eq!(hydrogen_count(&pyridine), 5);

        let furan = parse("c1ccoc1").unwrap();
        assert_eq!(hydrogen_count(&furan), 4);
    }

    #[test]
    fn parses_bracket_atoms_with_charge_and_hydrogens() {
        let ammonium = parse("[NH4+]").unwrap();
        let (_, atom) = ammonium.atoms_iter().next().unwrap();
        assert_eq!(atom.charge, 1);
        assert_eq!(atom.hydrogens, 4);

        let pyrrole = parse("c1cc[nH]c1").unwrap();
        assert_eq!(hydrogen_count(&pyrrole), 5);

        let labelled = parse("[13CH3:1][C@@H](N)O").unwrap();
        let isotopes: Vec<Option<u16>> = labelled.atoms_iter().map(|(_, a)| a.isotope).collect();
        assert!(isotopes.contains(&Some(13)));

        let sodium_chloride = parse("[Na+].[Cl-]").unwrap();
        assert_eq!(sodium_chloride.atom_count(), 2);
        assert!(sodium_chloride.bonds().is_empty());
    }

    #[test]
    fn parses_branches_ring_bonds_and_percent_closures() {
        let caffeine = parse("CN1C=NC2=C1C(=O)N(C(=O)N2C)C").unwrap();
        assert_eq!(caffeine.atom_count(), 14);
        assert_eq!(hydrogen_count(&caffeine), 10);

        let cyclohexane = parse("C%10CCCCC%10").unwrap();
        assert_eq!(cyclohexane.bonds().len(), 6);
        assert_eq!(hydrogen_count(&cyclohexane), 12);
    }

    #[test]
    fn triple_and_double_bonds_reduce_hydrogens() {
        let acetonitrile = parse("CC#N").unwrap();
        assert_eq!(hydrogen_count(&acetonitrile), 3);

        let dmso = parse("CS(C)=O").unwrap();
        assert_eq!(hydrogen_count(&dmso), 6);
    }

    #[test]
    fn rejects_malformed_input() {
        let cases = [
            ("", SmilesErrorKind::Empty),
            ("   ", SmilesErrorKind::Empty),
            ("C1CC", SmilesErrorKind::UnclosedRing(1)),
            ("C(C", SmilesErrorKind::UnclosedBranch),
            ("CC)", SmilesErrorKind::UnmatchedBranchClose),
            ("CC=", SmilesErrorKind::DanglingBond),
            ("C[Xx]", SmilesErrorKind::UnknownElement("X".to_string())),
            ("c1cc", SmilesErrorKind::UnclosedRing(1)),
            ("cc", SmilesErrorKind::AromaticOutsideRing("C")),
            ("not a smiles", SmilesErrorKind::UnexpectedCharacter('t')),
        ];
        for (input, expected) in cases {
            let err = parse(input).unwrap_err();
            assert_eq!(err.kind, expected, "input: {input:?}");
        }
    }

    #[test]
    fn rejects_valence_overflow_on_organic_atoms() {
        let err = parse("C(C)(C)(C)(C)C").unwrap_err();
        assert!(matches!(
            err.kind,
            SmilesErrorKind::ValenceExceeded { symbol: "C", .. }
        ));
        assert!(parse("FC=O").is_ok());
        assert!(parse("F=C").is_err());
    }

    #[test]
    fn rejects_unterminated_bracket() {
        let err = parse("C[NH4+").unwrap_err();
        assert_eq!(err.kind, SmilesErrorKind::UnclosedBracket);
        assert_eq!(err.position, 1);
    }
}
