use super::regressor::ModelError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Row indices of a seeded shuffle split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..n_rows` with `seed` and takes the first `ceil(test_fraction · n)`
/// indices as the test partition. The same inputs always produce the same split.
pub fn train_test_split(n_rows: usize, test_fraction: f64, seed: u64) -> Result<TrainTestSplit, ModelError> {
    let invalid = || ModelError::InvalidSplit {
        rows: n_rows,
        fraction: test_fraction,
    };
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(invalid());
    }
    let n_test = (test_fraction * n_rows as f64).ceil() as usize;
    if n_test < 1 || n_test >= n_rows {
        return Err(invalid());
    }

    let mut permutation: Vec<usize> = (0..n_rows).collect();
    permutation.shuffle(&mut StdRng::seed_from_u64(seed));
    let train = permutation.split_off(n_test);
    Ok(TrainTestSplit {
        train,
        test: permutation,
    })
}
