use super::config::{ConfigError, SelectionConfig};
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use crate::core::ml::dataset::FeatureTable;
use crate::core::ml::metrics::{mean_absolute_error, r_squared};
use crate::core::ml::pipeline::TrainedPipeline;
use crate::core::ml::preprocessing::Preprocessor;
use crate::core::ml::regressor::{self, FittedRegressor, ModelError, Regressor};
use crate::core::ml::split::train_test_split;
use nalgebra::{DMatrix, DVector};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Held-out score of one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub model_id: String,
    pub model_name: String,
    pub mae: f64,
    /// `NaN` when the test partition has fewer than two rows.
    pub r2: f64,
    pub fit_time: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFailure {
    pub model_id: String,
    pub model_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionReport {
    /// Successful candidates, ascending by MAE; ties keep roster order.
    pub ranking: Vec<EvaluationResult>,
    pub failures: Vec<CandidateFailure>,
    pub train_rows: usize,
    pub test_rows: usize,
}

impl SelectionReport {
    pub fn best(&self) -> Option<&EvaluationResult> {
        self.ranking.first()
    }
}

pub struct SelectionOutcome {
    pub pipeline: TrainedPipeline,
    pub report: SelectionReport,
}

/// Instantiates the configured roster ids in order.
pub fn build_roster(ids: &[String]) -> Result<Vec<Box<dyn Regressor>>, ConfigError> {
    ids.iter()
        .map(|id| {
            regressor::by_id(id).ok_or_else(|| ConfigError::InvalidValue {
                parameter: "models",
                reason: format!("unknown model '{id}'"),
            })
        })
        .collect()
}

struct Partitions {
    preprocessor: Preprocessor,
    x_train: DMatrix<f64>,
    y_train: DVector<f64>,
    x_test: DMatrix<f64>,
    y_test: Vec<f64>,
}

fn partition(table: &FeatureTable, config: &SelectionConfig) -> Result<Partitions, ModelError> {
    let split = train_test_split(table.len(), config.test_fraction, config.seed)?;
    let train = table.subset(&split.train);
    let test = table.subset(&split.test);

    let preprocessor = Preprocessor::fit(&train, config.unknown_category);
    let x_train = preprocessor.transform(train.rows().iter().map(|row| &row.input))?;
    let x_test = preprocessor.transform(test.rows().iter().map(|row| &row.input))?;

    Ok(Partitions {
        preprocessor,
        x_train,
        y_train: DVector::from_vec(train.targets()),
        x_test,
        y_test: test.targets(),
    })
}

fn evaluate(
    candidate: &dyn Regressor,
    data: &Partitions,
) -> Result<(FittedRegressor, EvaluationResult), ModelError> {
    let start = Instant::now();
    let fitted = candidate.fit(&data.x_train, &data.y_train)?;
    let fit_time = start.elapsed();

    let predictions: Vec<f64> = fitted.predict(&data.x_test)?.iter().copied().collect();
    if predictions.iter().any(|p| !p.is_finite()) {
        return Err(ModelError::NonFinitePrediction);
    }

    let result = EvaluationResult {
        model_id: candidate.id().to_string(),
        model_name: candidate.name().to_string(),
        mae: mean_absolute_error(&data.y_test, &predictions),
        r2: r_squared(&data.y_test, &predictions),
        fit_time,
    };
    Ok((fitted, result))
}

/// Trains every candidate on one seeded split and keeps the lowest-MAE pipeline.
///
/// The preprocessor is fitted once on the training partition and shared by all
/// candidates. A candidate that fails is logged and skipped; selection fails only
/// when the table is empty or every candidate fails.
pub fn select_best(
    table: &FeatureTable,
    roster: &[Box<dyn Regressor>],
    config: &SelectionConfig,
    reporter: &ProgressReporter,
) -> Result<SelectionOutcome, EngineError> {
    if table.is_empty() {
        return Err(EngineError::EmptyDataset);
    }

    let data = partition(table, config)?;
    info!(
        train = data.y_train.len(),
        test = data.y_test.len(),
        features = data.x_train.ncols(),
        "Split dataset for model selection."
    );

    reporter.report(Progress::TaskStart {
        total_steps: roster.len() as u64,
    });

    let mut ranking = Vec::with_capacity(roster.len());
    let mut failures = Vec::new();
    let mut best: Option<(usize, FittedRegressor, f64)> = None;

    for (index, candidate) in roster.iter().enumerate() {
        debug!(model = candidate.name(), "Evaluating candidate.");
        match evaluate(candidate.as_ref(), &data) {
            Ok((fitted, result)) => {
                info!(
                    model = %result.model_name,
                    mae = result.mae,
                    r2 = result.r2,
                    seconds = result.fit_time.as_secs_f64(),
                    "Candidate evaluated."
                );
                if best.as_ref().is_none_or(|(_, _, mae)| result.mae < *mae) {
                    best = Some((index, fitted, result.mae));
                }
                ranking.push(result);
            }
            Err(e) => {
                warn!(model = candidate.name(), error = %e, "Candidate failed; skipping.");
                failures.push(CandidateFailure {
                    model_id: candidate.id().to_string(),
                    model_name: candidate.name().to_string(),
                    reason: e.to_string(),
                });
            }
        }
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    let Some((index, fitted, _)) = best else {
        return Err(EngineError::AllCandidatesFailed {
            attempted: roster.len(),
        });
    };

    ranking.sort_by(|a, b| a.mae.total_cmp(&b.mae));
    let pipeline = TrainedPipeline::assemble(roster[index].as_ref(), data.preprocessor, fitted);
    info!(model = %pipeline.model_name, "Selected best model.");

    Ok(SelectionOutcome {
        pipeline,
        report: SelectionReport {
            ranking,
            failures,
            train_rows: data.y_train.len(),
            test_rows: data.y_test.len(),
        },
    })
}
