use super::config::TemperatureRange;
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use crate::core::chem::descriptors::Descriptors;
use crate::core::ml::dataset::ModelInput;
use crate::core::ml::pipeline::SolubilityModel;
use serde::Serialize;
use tracing::{debug, warn};

const KELVIN_OFFSET: f64 = 273.15;

/// One scored point of the solvent × temperature grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionCandidate {
    pub solvent: String,
    pub temperature_k: f64,
    pub temperature_c: f64,
    pub predicted_log_s: f64,
}

impl ConditionCandidate {
    fn new(solvent: &str, temperature_k: f64, predicted_log_s: f64) -> Self {
        Self {
            solvent: solvent.to_string(),
            temperature_k,
            temperature_c: temperature_k - KELVIN_OFFSET,
            predicted_log_s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub best: ConditionCandidate,
    /// At most `top_k` candidates, descending by prediction.
    pub ranked: Vec<ConditionCandidate>,
    pub evaluated: usize,
    pub skipped: usize,
}

/// Scores every (solvent, temperature) pair with fixed query descriptors.
///
/// Solvents form the outer loop. A pair whose prediction fails or is not finite is
/// skipped. The ranking is descending but not strict: equal predictions keep grid
/// order, so the pair visited first ranks higher and is reported as best.
pub fn grid_search<M>(
    model: &M,
    descriptors: &Descriptors,
    solvents: &[String],
    temperatures: &TemperatureRange,
    top_k: usize,
    reporter: &ProgressReporter,
) -> Result<SearchOutcome, EngineError>
where
    M: SolubilityModel + ?Sized,
{
    let grid = temperatures.values();
    let attempted = solvents.len() * grid.len();
    reporter.report(Progress::TaskStart {
        total_steps: attempted as u64,
    });

    let mut candidates: Vec<ConditionCandidate> = Vec::with_capacity(attempted);
    let mut best: Option<usize> = None;
    let mut skipped = 0;

    for solvent in solvents {
        for &temperature_k in &grid {
            let input = ModelInput::new(solvent.as_str(), temperature_k, descriptors);
            match model.predict_one(&input) {
                Ok(prediction) if prediction.is_finite() => {
                    if best.is_none_or(|i: usize| prediction > candidates[i].predicted_log_s) {
                        best = Some(candidates.len());
                    }
                    candidates.push(ConditionCandidate::new(solvent, temperature_k, prediction));
                }
                Ok(prediction) => {
                    warn!(solvent = %solvent, temperature_k, prediction, "Non-finite prediction; skipping.");
                    skipped += 1;
                }
                Err(e) => {
                    warn!(solvent = %solvent, temperature_k, error = %e, "Prediction failed; skipping.");
                    skipped += 1;
                }
            }
            reporter.report(Progress::TaskIncrement);
        }
    }
    reporter.report(Progress::TaskFinish);

    let Some(best) = best.map(|i| candidates[i].clone()) else {
        return Err(EngineError::NoViableCandidates { attempted });
    };
    let evaluated = candidates.len();
    debug!(evaluated, skipped, "Grid search finished.");

    candidates.sort_by(|a, b| b.predicted_log_s.total_cmp(&a.predicted_log_s));
    candidates.truncate(top_k);

    Ok(SearchOutcome {
        best,
        ranked: candidates,
        evaluated,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ml::regressor::ModelError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// logS rises with temperature and is highest in ethanol; fails for "bad".
    struct Toy {
        calls: AtomicUsize,
    }

    impl Toy {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SolubilityModel for Toy {
        fn predict_one(&self, input: &ModelInput) -> Result<f64, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let bonus = match input.solvent.as_str() {
                "CCO" => 1.0,
                "bad" => return Err(ModelError::NonFinitePrediction),
                "nan" => return Ok(f64::NAN),
                _ => 0.0,
            };
            Ok(-3.0 + 0.01 * (input.temperature_k - 273.0) + bonus)
        }
    }

    fn descriptors() -> Descriptors {
        Descriptors {
            mol_weight: 151.16,
            logp: 1.35,
            tpsa: 49.33,
            h_donors: 2,
            h_acceptors: 2,
            rule_of_five: 1,
        }
    }

    fn solvents(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn range() -> TemperatureRange {
        TemperatureRange {
            min_k: 273.0,
            max_k: 293.0,
            step_k: 10.0,
        }
    }

    #[test]
    fn evaluates_the_full_grid_and_finds_the_maximum() {
        let model = Toy::new();
        let names = solvents(&["O", "CCO", "CC(C)O", "C1CCOC1", "CS(C)=O"]);
        let outcome = grid_search(&model, &descriptors(), &names, &range(), 5, &ProgressReporter::new()).unwrap();

        assert_eq!(model.calls.load(Ordering::SeqCst), 15);
        assert_eq!(outcome.evaluated, 15);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.best.solvent, "CCO");
        assert_eq!(outcome.best.temperature_k, 293.0);
        assert!((outcome.best.temperature_c - 19.85).abs() < 1e-9);
        assert_eq!(outcome.ranked.len(), 5);
        assert_eq!(outcome.ranked[0], outcome.best);
        assert!(outcome
            .ranked
            .windows(2)
            .all(|w| w[0].predicted_log_s >= w[1].predicted_log_s));
    }

    #[test]
    fn failing_pairs_are_skipped() {
        let model = Toy::new();
        let names = solvents(&["bad", "O", "nan"]);
        let outcome = grid_search(&model, &descriptors(), &names, &range(), 5, &ProgressReporter::new()).unwrap();
        assert_eq!(outcome.evaluated, 3);
        assert_eq!(outcome.skipped, 6);
        assert_eq!(outcome.best.solvent, "O");
        assert_eq!(outcome.ranked.len(), 3);
    }

    #[test]
    fn all_failures_is_an_error() {
        let names = solvents(&["bad"]);
        let err = grid_search(&Toy::new(), &descriptors(), &names, &range(), 5, &ProgressReporter::new());
        assert!(matches!(err, Err(EngineError::NoViableCandidates { attempted: 3 })));
    }

    #[test]
    fn ties_keep_grid_order() {
        struct Flat;
        impl SolubilityModel for Flat {
            fn predict_one(&self, _: &ModelInput) -> Result<f64, ModelError> {
                Ok(-2.0)
            }
        }
        let names = solvents(&["CCO", "O"]);
        let outcome = grid_search(&Flat, &descriptors(), &names, &range(), 2, &ProgressReporter::new()).unwrap();
        assert_eq!(outcome.best.solvent, "CCO");
        assert_eq!(outcome.best.temperature_k, 273.0);
        assert_eq!(outcome.ranked[0], outcome.best);
        assert_eq!(outcome.ranked[1].temperature_k, 283.0);
    }
}
