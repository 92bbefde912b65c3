use phf::phf_map;

/// Solvents searched when the caller does not supply a list: water, ethanol,
/// isopropanol, tetrahydrofuran and dimethyl sulfoxide.
pub const DEFAULT_SOLVENTS: [&str; 5] = ["O", "CCO", "CC(C)O", "C1CCOC1", "CS(C)=O"];

static SOLVENT_ALIASES: phf::Map<&'static str, &'static str> = phf_map! {
    "water" => "O",
    "ethanol" => "CCO",
    "methanol" => "CO",
    "acetonitrile" => "CC#N",
    "dmso" => "CS(C)=O",
    "thf" => "C1CCOC1",
    "toluene" => "Cc1ccccc1",
    "n-propanol" => "CCCO",
    "isopropanol" => "CC(C)O",
    "n-heptanol" => "CCCCCCCO",
    "transcutol" => "CCOCCOCCO",
    "cyclohexane" => "C1CCCCC1",
    "chloroform" => "ClC(Cl)Cl",
    "nmp" => "CN1CCCC1=O",
    "ethyl acetate" => "CCOC(C)=O",
    "n-hexadecane" => "CCCCCCCCCCCCCCCC",
    "2-methoxyethanol" => "COCCO",
    "2-ethoxyethanol" => "CCOCCO",
};

/// Resolves a solvent token to a SMILES string.
///
/// Known names are matched case-insensitively; anything else is assumed to already
/// be a SMILES string and is returned trimmed but otherwise unchanged.
pub fn resolve_solvent(token: &str) -> String {
    let trimmed = token.trim();
    SOLVENT_ALIASES
        .get(trimmed.to_ascii_lowercase().as_str())
        .map_or_else(|| trimmed.to_string(), |smiles| (*smiles).to_string())
}

/// Coarse solvent family used for dataset summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolventCategory {
    Water,
    Alcohol,
    Other,
}

impl SolventCategory {
    pub fn classify(solvent_smiles: &str) -> Self {
        match solvent_smiles {
            "O" => Self::Water,
            "CCO" | "CC(C)O" | "CCCO" => Self::Alcohol,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Alcohol => "alcohol",
            Self::Other => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_names_case_insensitively() {
        assert_eq!(resolve_solvent("Water"), "O");
        assert_eq!(resolve_solvent(" DMSO "), "CS(C)=O");
        assert_eq!(resolve_solvent("ethyl acetate"), "CCOC(C)=O");
    }

    #[test]
    fn passes_unknown_tokens_through_as_smiles() {
        assert_eq!(resolve_solvent("CCCCO"), "CCCCO");
        assert_eq!(resolve_solvent("c1ccccc1"), "c1ccccc1");
    }

    #[test]
    fn classifies_water_and_short_alcohols() {
        assert_eq!(SolventCategory::classify("O"), SolventCategory::Water);
        assert_eq!(SolventCategory::classify("CC(C)O"), SolventCategory::Alcohol);
        assert_eq!(SolventCategory::classify("CS(C)=O").as_str(), "other");
    }
}
