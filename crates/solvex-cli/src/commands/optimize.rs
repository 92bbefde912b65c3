use crate::cli::OptimizeArgs;
use crate::config::PartialConfig;
use crate::data::DataManager;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use solvex::core::store::FileModelStore;
use solvex::engine::progress::ProgressReporter;
use solvex::workflows;
use solvex::workflows::optimize::OptimizationResult;
use std::fmt::Write;
use tracing::info;

pub fn run(args: OptimizeArgs, partial: PartialConfig, show_progress: bool) -> Result<()> {
    let data_manager = DataManager::new()?;
    let (config, model_path) = partial.merge_optimize(&args, &data_manager)?;
    info!("Using trained model at {:?}", &model_path);
    let store = FileModelStore::new(model_path);

    let progress = CliProgressHandler::new(show_progress && !args.json);
    let reporter = ProgressReporter::with_callback(progress.callback());
    let result = workflows::optimize::run(&config, &store, &reporter);
    progress.finish();
    let result = result?;

    if args.json {
        let json = serde_json::to_string_pretty(&result).map_err(|e| CliError::Other(e.into()))?;
        println!("{}", json);
    } else {
        print!("{}", render(&result));
    }
    Ok(())
}

fn render(result: &OptimizationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Compound:       {}", result.smiles);
    let _ = writeln!(out, "Model:          {}", result.model_name);
    let _ = writeln!(
        out,
        "Best solvent:   {} at {:.2} K ({:.2} °C)",
        result.best_solvent, result.best_temperature_k, result.best_temperature_c
    );
    let _ = writeln!(
        out,
        "Predicted logS: {:.4} ({:.4e} mol/L)",
        result.predicted_log_s, result.solubility_mol_l
    );
    let _ = writeln!(
        out,
        "Grid points:    {} evaluated, {} skipped",
        result.evaluated, result.skipped
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:>4}  {:<20} {:>10} {:>10} {:>10}",
        "Rank", "Solvent", "T (K)", "T (°C)", "logS"
    );
    for (rank, candidate) in result.top_candidates.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  {:<20} {:>10.2} {:>10.2} {:>10.4}",
            rank + 1,
            candidate.solvent,
            candidate.temperature_k,
            candidate.temperature_c,
            candidate.predicted_log_s
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use solvex::engine::search::ConditionCandidate;

    fn candidate(solvent: &str, temperature_k: f64, predicted_log_s: f64) -> ConditionCandidate {
        ConditionCandidate {
            solvent: solvent.to_string(),
            temperature_k,
            temperature_c: temperature_k - 273.15,
            predicted_log_s,
        }
    }

    #[test]
    fn render_shows_the_best_conditions_and_ranked_list() {
        let result = OptimizationResult {
            smiles: "CC(=O)Nc1ccc(O)cc1".to_string(),
            model_name: "RandomForestRegressor".to_string(),
            best_solvent: "CCO".to_string(),
            best_temperature_k: 343.0,
            best_temperature_c: 69.85,
            predicted_log_s: -1.0,
            solubility_mol_l: 0.1,
            top_candidates: vec![candidate("CCO", 343.0, -1.0), candidate("O", 343.0, -1.5)],
            evaluated: 40,
            skipped: 0,
        };
        let text = render(&result);

        assert!(text.contains("Best solvent:   CCO at 343.00 K (69.85 °C)"));
        assert!(text.contains("Predicted logS: -1.0000 (1.0000e-1 mol/L)"));
        assert!(text.contains("40 evaluated, 0 skipped"));
        let rows: Vec<&str> = text.lines().skip_while(|l| !l.contains("Rank")).skip(1).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains("CCO"));
        assert!(rows[1].contains("-1.5000"));
    }
}
