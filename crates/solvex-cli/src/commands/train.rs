use crate::cli::TrainArgs;
use crate::config::PartialConfig;
use crate::data::DataManager;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use solvex::core::store::FileModelStore;
use solvex::engine::progress::ProgressReporter;
use solvex::engine::selection::SelectionReport;
use solvex::workflows;
use std::fmt::Write;
use tracing::info;

pub fn run(args: TrainArgs, partial: PartialConfig, show_progress: bool) -> Result<()> {
    let data_manager = DataManager::new()?;
    info!("Merging configuration from file and CLI arguments...");
    let (config, model_path) = partial.merge_train(&args, &data_manager)?;
    let store = FileModelStore::new(model_path);

    let progress = CliProgressHandler::new(show_progress);
    let reporter = ProgressReporter::with_callback(progress.callback());

    println!(
        "Training {} model(s) on {}...",
        config.selection.models.len(),
        config.dataset.input_path.display()
    );
    let report = workflows::train::run(&config, &store, &reporter);
    progress.finish();
    let report = report?;

    println!(
        "Usable rows: {} ({} train / {} test)",
        report.usable_rows, report.selection.train_rows, report.selection.test_rows
    );
    print!("{}", ranking_table(&report.selection));
    println!(
        "✓ Best model: {} saved to {}",
        report.model_name, report.model_location
    );
    Ok(())
}

/// Ranked summary of evaluated candidates followed by those that failed.
fn ranking_table(report: &SelectionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<28} {:>10} {:>10} {:>10}",
        "Rank", "Model", "MAE", "R²", "Fit (s)"
    );
    for (rank, result) in report.ranking.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  {:<28} {:>10.4} {:>10.4} {:>10.3}",
            rank + 1,
            result.model_name,
            result.mae,
            result.r2,
            result.fit_time.as_secs_f64()
        );
    }
    for failure in &report.failures {
        let _ = writeln!(out, "   -  {:<28} failed: {}", failure.model_name, failure.reason);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use solvex::engine::selection::{CandidateFailure, EvaluationResult};
    use std::time::Duration;

    fn result(name: &str, mae: f64) -> EvaluationResult {
        EvaluationResult {
            model_id: name.to_lowercase(),
            model_name: name.to_string(),
            mae,
            r2: f64::NAN,
            fit_time: Duration::from_millis(250),
        }
    }

    #[test]
    fn ranking_table_lists_candidates_in_order_then_failures() {
        let report = SelectionReport {
            ranking: vec![result("Ridge", 0.25), result("LinearRegression", 0.5)],
            failures: vec![CandidateFailure {
                model_id: "knn".to_string(),
                model_name: "KNeighborsRegressor".to_string(),
                reason: "not enough rows".to_string(),
            }],
            train_rows: 8,
            test_rows: 2,
        };
        let table = ranking_table(&report);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("Ridge") && lines[1].contains("0.2500"));
        assert!(lines[2].trim_start().starts_with('2'));
        assert!(lines[2].contains("NaN"));
        assert!(lines[3].contains("KNeighborsRegressor"));
        assert!(lines[3].ends_with("failed: not enough rows"));
    }
}
