//! Molecular structure handling: element data, the molecular graph, the SMILES
//! line-notation parser and the descriptor provider built on top of them.

pub mod descriptors;
pub mod elements;
pub mod ids;
pub mod molecule;
pub mod smiles;
pub mod solvents;
