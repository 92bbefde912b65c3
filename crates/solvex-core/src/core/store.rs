use crate::core::ml::pipeline::TrainedPipeline;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No trained model found at '{path}'")]
    NotFound { path: String },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to (de)serialize model at '{path}': {source}")]
    Serde {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Holds the single current best pipeline.
pub trait ModelStore {
    /// Replaces the stored pipeline as a whole.
    fn save(&self, pipeline: &TrainedPipeline) -> Result<(), StoreError>;
    fn load(&self) -> Result<TrainedPipeline, StoreError>;
    fn location(&self) -> String;
}

/// A JSON file on disk, replaced atomically through a sibling temporary file.
#[derive(Debug, Clone)]
pub struct FileModelStore {
    path: PathBuf,
}

impl FileModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn write_and_replace(
        &self,
        file: fs::File,
        temp: &Path,
        pipeline: &TrainedPipeline,
    ) -> Result<(), StoreError> {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, pipeline).map_err(|source| StoreError::Serde {
            path: temp.display().to_string(),
            source,
        })?;
        writer.flush().map_err(|e| Self::io_error(temp, e))?;
        drop(writer);

        fs::rename(temp, &self.path).map_err(|e| Self::io_error(&self.path, e))
    }
}

impl ModelStore for FileModelStore {
    fn save(&self, pipeline: &TrainedPipeline) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(parent, e))?;
        }

        let temp = self.temp_path();
        let file = fs::File::create(&temp).map_err(|e| Self::io_error(&temp, e))?;
        if let Err(e) = self.write_and_replace(file, &temp, pipeline) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }
        info!(path = %self.path.display(), model = %pipeline.model_name, "Saved trained pipeline");
        Ok(())
    }

    fn load(&self) -> Result<TrainedPipeline, StoreError> {
        let file = fs::File::open(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound {
                path: self.path.display().to_string(),
            },
            _ => Self::io_error(&self.path, e),
        })?;
        let pipeline: TrainedPipeline =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Serde {
                path: self.path.display().to_string(),
                source,
            })?;
        debug!(path = %self.path.display(), model = %pipeline.model_name, "Loaded trained pipeline");
        Ok(pipeline)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ml::dataset::{FeatureTable, ModelInput, TrainingRow};
    use crate::core::ml::linear::Ridge;
    use crate::core::ml::preprocessing::UnknownCategory;
    use tempfile::tempdir;

    fn pipeline(alpha: f64) -> TrainedPipeline {
        let rows = [("O", 280.0, -1.0), ("CCO", 300.0, 0.5), ("O", 320.0, -0.4)].map(
            |(solvent, temperature_k, target)| TrainingRow {
                input: ModelInput {
                    solvent: solvent.to_string(),
                    temperature_k,
                    mol_weight: 180.0,
                    logp: 1.2,
                    tpsa: 63.6,
                    h_donors: 1.0,
                    h_acceptors: 3.0,
                },
                target,
            },
        );
        TrainedPipeline::fit(&Ridge { alpha }, &FeatureTable::from_rows(rows), UnknownCategory::Ignore)
            .unwrap()
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FileModelStore::new(dir.path().join("best_model.json"));
        assert!(matches!(store.load(), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn save_then_load_returns_the_same_pipeline() {
        let dir = tempdir().unwrap();
        let store = FileModelStore::new(dir.path().join("models").join("best_model.json"));
        let original = pipeline(1.0);
        store.save(&original).unwrap();
        assert_eq!(store.load().unwrap(), original);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn save_replaces_the_previous_pipeline() {
        let dir = tempdir().unwrap();
        let store = FileModelStore::new(dir.path().join("best_model.json"));
        store.save(&pipeline(1.0)).unwrap();
        let replacement = pipeline(5.0);
        store.save(&replacement).unwrap();
        assert_eq!(store.load().unwrap(), replacement);
    }

    #[test]
    fn corrupt_file_is_a_serde_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("best_model.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            FileModelStore::new(path).load(),
            Err(StoreError::Serde { .. })
        ));
    }

    #[test]
    fn failed_replace_leaves_no_temporary_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("best_model.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "occupied").unwrap();
        let store = FileModelStore::new(&path);

        assert!(matches!(store.save(&pipeline(1.0)), Err(StoreError::Io { .. })));
        assert!(!store.temp_path().exists());
        assert!(path.join("keep").exists());
    }
}
