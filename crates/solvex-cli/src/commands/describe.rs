use crate::cli::DescribeArgs;
use crate::error::{CliError, Result};
use solvex::core::chem::descriptors::{
    DESCRIPTOR_NAMES, DescriptorProvider, Descriptors, SmilesDescriptors,
};

pub fn run(args: DescribeArgs) -> Result<()> {
    let descriptors = describe(&SmilesDescriptors, &args.smiles)?;
    if args.json {
        let json =
            serde_json::to_string_pretty(&descriptors).map_err(|e| CliError::Other(e.into()))?;
        println!("{}", json);
    } else {
        println!("Descriptors for {}:", args.smiles);
        for (name, value) in DESCRIPTOR_NAMES.iter().zip(descriptors.as_array()) {
            println!("  {:<14} {:>10.4}", name, value);
        }
    }
    Ok(())
}

fn describe<P: DescriptorProvider>(provider: &P, smiles: &str) -> Result<Descriptors> {
    provider
        .describe(smiles)
        .descriptors()
        .copied()
        .ok_or_else(|| {
            CliError::Argument(format!(
                "Invalid structure: '{}' could not be parsed or described",
                smiles
            ))
        })
}
