pub mod boosting;
pub mod dataset;
pub mod forest;
pub mod linear;
pub mod metrics;
pub mod neighbors;
pub mod pipeline;
pub mod preprocessing;
pub mod regressor;
pub mod split;
pub mod svm;
pub mod tree;
