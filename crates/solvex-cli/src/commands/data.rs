use crate::cli::{DataArgs, DataCommands};
use crate::data::DataManager;
use crate::error::Result;
use std::path::PathBuf;
use tracing::info;

pub fn run(args: DataArgs) -> Result<()> {
    match args.command {
        DataCommands::Path => handle_path(),
        DataCommands::SetPath { path } => handle_set_path(path),
        DataCommands::ResetPath => handle_reset_path(),
    }
}

fn handle_path() -> Result<()> {
    let manager = DataManager::new()?;
    println!("Data directory: {}", manager.get_data_path().display());
    let model = manager.default_model_path();
    if model.exists() {
        println!("Trained model:  {}", model.display());
    } else {
        println!("Trained model:  (none yet, run `solvex train`)");
    }
    Ok(())
}

fn handle_set_path(path: PathBuf) -> Result<()> {
    let stored = DataManager::set_custom_path(&path)?;
    info!("Custom data path set to {:?}", &stored);
    println!("Data directory set to: {}", stored.display());
    Ok(())
}

fn handle_reset_path() -> Result<()> {
    DataManager::reset_path()?;
    let manager = DataManager::new()?;
    info!("Data path reset to {:?}", manager.get_data_path());
    println!(
        "Data directory reset to default: {}",
        manager.get_data_path().display()
    );
    Ok(())
}
