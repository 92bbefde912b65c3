use crate::cli::PrepareArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use solvex::engine::progress::ProgressReporter;
use solvex::workflows;
use tracing::info;

pub fn run(args: PrepareArgs, partial: PartialConfig, show_progress: bool) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let config = partial.merge_prepare(&args)?;

    let progress = CliProgressHandler::new(show_progress);
    let reporter = ProgressReporter::with_callback(progress.callback());

    info!("Preparing dataset from {:?}", &config.dataset.input_path);
    let report = workflows::prepare::run(&config, &reporter);
    progress.finish();
    let report = report?;

    let cleaning = &report.cleaning;
    println!("Dataset prepared:");
    println!("  Input rows:            {}", cleaning.input_rows);
    println!("  Duplicates removed:    {}", cleaning.duplicates_removed);
    println!("  Out of range removed:  {}", cleaning.out_of_range_removed);
    println!("  Invalid structures:    {}", report.invalid_structures);
    println!("  Usable rows:           {}", report.usable_rows);
    println!(
        "  Compounds / solvents:  {} / {}",
        report.stats.compounds, report.stats.solvents
    );
    println!(
        "  logS mean ± std:       {:.3} ± {:.3}",
        report.stats.log_s_mean, report.stats.log_s_std
    );
    println!("✓ Features written to: {}", report.output_path.display());
    if let Some(path) = &report.stats_path {
        println!("✓ Statistics written to: {}", path.display());
    }
    Ok(())
}
