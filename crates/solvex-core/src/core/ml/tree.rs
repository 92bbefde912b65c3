//! Second-order regression trees shared by the forest and every booster.
//!
//! A tree is grown from per-row gradients `g` and hessians `h` of the loss. Leaves take
//! the Newton step `−G / (H + λ)` and a split is scored by
//! `½·[G_L²/(H_L+λ) + G_R²/(H_R+λ) − G²/(H+λ)] − γ`. With squared loss, `h = 1` and
//! `λ = γ = 0` this is ordinary variance-reduction CART with mean-valued leaves.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Order in which expandable nodes are split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    /// Breadth-first, bounded by depth.
    DepthWise,
    /// Best-first by gain, bounded by the number of leaves.
    LeafWise,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub max_leaves: Option<usize>,
    pub min_samples_leaf: usize,
    pub min_child_weight: f64,
    pub lambda: f64,
    pub gamma: f64,
    pub growth: Growth,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_leaves: None,
            min_samples_leaf: 1,
            min_child_weight: 0.0,
            lambda: 0.0,
            gamma: 0.0,
            growth: Growth::DepthWise,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((index, depth)) = stack.pop() {
            match self.nodes.get(index) {
                Some(Node::Split { left, right, .. }) => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
                Some(Node::Leaf { .. }) => deepest = deepest.max(depth),
                None => {}
            }
        }
        deepest
    }

    /// Multiplies every leaf value, used to bake a learning rate into the tree.
    pub fn scale(&mut self, factor: f64) {
        for node in &mut self.nodes {
            if let Node::Leaf { value } = node {
                *value *= factor;
            }
        }
    }

    /// Missing (NaN) feature values follow the right branch.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).copied().unwrap_or(f64::NAN);
                    index = if value <= *threshold { *left } else { *right };
                }
                None => return f64::NAN,
            }
        }
    }
}

/// Feature values quantized into at most 256 bins per column.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    /// `bins[feature][row]`
    bins: Vec<Vec<u8>>,
    /// Upper bin boundaries; value `v` falls in the first bin `b` with `v <= edges[b]`.
    edges: Vec<Vec<f64>>,
}

impl BinnedMatrix {
    pub fn new(x: &DMatrix<f64>, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, 256);
        let mut bins = Vec::with_capacity(x.ncols());
        let mut edges = Vec::with_capacity(x.ncols());

        for column in x.column_iter() {
            let mut sorted: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
            sorted.sort_by(f64::total_cmp);
            let column_edges = bin_edges(&sorted, max_bins);
            let column_bins = column
                .iter()
                .map(|&v| column_edges.partition_point(|&edge| edge < v) as u8)
                .collect();
            bins.push(column_bins);
            edges.push(column_edges);
        }
        Self { bins, edges }
    }

    pub fn n_bins(&self, feature: usize) -> usize {
        self.edges[feature].len() + 1
    }
}

fn bin_edges(sorted: &[f64], max_bins: usize) -> Vec<f64> {
    let mut unique = sorted.to_vec();
    unique.dedup();
    let mut edges: Vec<f64> = if unique.len() <= max_bins {
        unique.windows(2).map(|w| midpoint(w[0], w[1])).collect()
    } else {
        let n = sorted.len();
        (1..max_bins)
            .filter_map(|k| {
                let position = k * n / max_bins;
                (position > 0 && position < n && sorted[position - 1] < sorted[position])
                    .then(|| midpoint(sorted[position - 1], sorted[position]))
            })
            .collect()
    };
    edges.dedup();
    edges
}

fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    // Guard against the midpoint rounding up onto the upper value.
    if mid >= high { low } else { mid }
}

/// Where split candidates come from: raw values (exact sweep) or histograms.
#[derive(Debug, Clone, Copy)]
pub enum FeatureSource<'a> {
    Exact(&'a DMatrix<f64>),
    Binned(&'a BinnedMatrix),
}

impl FeatureSource<'_> {
    fn n_features(&self) -> usize {
        match self {
            Self::Exact(x) => x.ncols(),
            Self::Binned(b) => b.bins.len(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitChoice {
    feature: usize,
    threshold: f64,
    /// Highest bin sent left, for histogram splits.
    bin: Option<u8>,
    gain: f64,
    left: Totals,
    right: Totals,
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    grad: f64,
    hess: f64,
    count: usize,
}

impl Totals {
    fn of(indices: &[usize], grad: &[f64], hess: &[f64]) -> Self {
        indices.iter().fold(Self::default(), |mut acc, &i| {
            acc.grad += grad[i];
            acc.hess += hess[i];
            acc.count += 1;
            acc
        })
    }

    fn minus(&self, other: &Self) -> Self {
        Self {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
            count: self.count - other.count,
        }
    }
}

struct Pending {
    node: usize,
    indices: Vec<usize>,
    depth: usize,
    split: SplitChoice,
}

pub struct TreeBuilder<'a> {
    source: FeatureSource<'a>,
    params: &'a TreeParams,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(source: FeatureSource<'a>, params: &'a TreeParams) -> Self {
        Self { source, params }
    }

    fn score(&self, totals: &Totals) -> f64 {
        let denominator = totals.hess + self.params.lambda;
        if denominator <= 0.0 {
            0.0
        } else {
            totals.grad * totals.grad / denominator
        }
    }

    fn leaf_value(&self, totals: &Totals) -> f64 {
        let denominator = totals.hess + self.params.lambda;
        if denominator <= 0.0 {
            0.0
        } else {
            -totals.grad / denominator
        }
    }

    fn admissible(&self, left: &Totals, right: &Totals) -> bool {
        left.count >= self.params.min_samples_leaf
            && right.count >= self.params.min_samples_leaf
            && left.hess >= self.params.min_child_weight
            && right.hess >= self.params.min_child_weight
    }

    fn gain(&self, parent: &Totals, left: &Totals, right: &Totals) -> f64 {
        0.5 * (self.score(left) + self.score(right) - self.score(parent)) - self.params.gamma
    }

    /// Grows one tree over the rows in `indices` (which may repeat, as in a bootstrap
    /// sample).
    pub fn grow(&self, grad: &[f64], hess: &[f64], indices: Vec<usize>) -> RegressionTree {
        let root = Totals::of(&indices, grad, hess);
        let mut nodes = vec![Node::Leaf {
            value: self.leaf_value(&root),
        }];
        let mut frontier = VecDeque::new();
        if let Some(pending) = self.pending(0, indices, 0, &root, grad, hess) {
            frontier.push_back(pending);
        }

        let max_leaves = self.params.max_leaves.unwrap_or(usize::MAX);
        let mut leaves = 1;
        while leaves < max_leaves {
            let position = match self.params.growth {
                Growth::DepthWise => 0,
                Growth::LeafWise => {
                    let mut best = 0;
                    for (position, pending) in frontier.iter().enumerate().skip(1) {
                        if pending.split.gain > frontier[best].split.gain {
                            best = position;
                        }
                    }
                    best
                }
            };
            let Some(pending) = frontier.remove(position) else {
                break;
            };

            let split = pending.split;
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = pending
                .indices
                .iter()
                .copied()
                .partition(|&row| self.goes_left(row, &split));

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf {
                value: self.leaf_value(&split.left),
            });
            nodes.push(Node::Leaf {
                value: self.leaf_value(&split.right),
            });
            nodes[pending.node] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            leaves += 1;

            let depth = pending.depth + 1;
            for (node, rows, totals) in [
                (left, left_rows, split.left),
                (right, right_rows, split.right),
            ] {
                if let Some(child) = self.pending(node, rows, depth, &totals, grad, hess) {
                    frontier.push_back(child);
                }
            }
        }

        RegressionTree { nodes }
    }

    fn goes_left(&self, row: usize, split: &SplitChoice) -> bool {
        match (self.source, split.bin) {
            (FeatureSource::Binned(binned), Some(bin)) => binned.bins[split.feature][row] <= bin,
            (FeatureSource::Exact(x), _) => x[(row, split.feature)] <= split.threshold,
            (FeatureSource::Binned(_), None) => false,
        }
    }

    fn pending(
        &self,
        node: usize,
        indices: Vec<usize>,
        depth: usize,
        totals: &Totals,
        grad: &[f64],
        hess: &[f64],
    ) -> Option<Pending> {
        if self.params.max_depth.is_some_and(|max| depth >= max)
            || indices.len() < 2 * self.params.min_samples_leaf.max(1)
        {
            return None;
        }
        let split = match self.source {
            FeatureSource::Exact(x) => self.best_exact_split(x, &indices, totals, grad, hess),
            FeatureSource::Binned(binned) => {
                self.best_histogram_split(binned, &indices, totals, grad, hess)
            }
        }?;
        Some(Pending {
            node,
            indices,
            depth,
            split,
        })
    }

    fn consider(&self, best: &mut Option<SplitChoice>, candidate: SplitChoice) {
        if candidate.gain > 0.0 && best.is_none_or(|current| candidate.gain > current.gain) {
            *best = Some(candidate);
        }
    }

    fn best_exact_split(
        &self,
        x: &DMatrix<f64>,
        indices: &[usize],
        parent: &Totals,
        grad: &[f64],
        hess: &[f64],
    ) -> Option<SplitChoice> {
        let mut best = None;
        let mut order = indices.to_vec();

        for feature in 0..self.source.n_features() {
            let column = x.column(feature);
            let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                (lo.min(column[i]), hi.max(column[i]))
            });
            if !(min < max) {
                continue;
            }

            order.sort_by(|&a, &b| column[a].total_cmp(&column[b]));
            let mut left = Totals::default();
            for pair in order.windows(2) {
                let (row, next) = (pair[0], pair[1]);
                left.grad += grad[row];
                left.hess += hess[row];
                left.count += 1;

                let (value, next_value) = (column[row], column[next]);
                if value == next_value || next_value.is_nan() {
                    continue;
                }
                let right = parent.minus(&left);
                if !self.admissible(&left, &right) {
                    continue;
                }
                self.consider(
                    &mut best,
                    SplitChoice {
                        feature,
                        threshold: midpoint(value, next_value),
                        bin: None,
                        gain: self.gain(parent, &left, &right),
                        left,
                        right,
                    },
                );
            }
        }
        best
    }

    fn best_histogram_split(
        &self,
        binned: &BinnedMatrix,
        indices: &[usize],
        parent: &Totals,
        grad: &[f64],
        hess: &[f64],
    ) -> Option<SplitChoice> {
        let mut best = None;

        for feature in 0..binned.bins.len() {
            let n_bins = binned.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            let mut histogram = vec![Totals::default(); n_bins];
            let column = &binned.bins[feature];
            for &row in indices {
                let slot = &mut histogram[usize::from(column[row])];
                slot.grad += grad[row];
                slot.hess += hess[row];
                slot.count += 1;
            }

            let mut left = Totals::default();
            for (bin, slot) in histogram.iter().enumerate().take(n_bins - 1) {
                left.grad += slot.grad;
                left.hess += slot.hess;
                left.count += slot.count;
                if slot.count == 0 {
                    continue;
                }
                let right = parent.minus(&left);
                if right.count == 0 || !self.admissible(&left, &right) {
                    continue;
                }
                self.consider(
                    &mut best,
                    SplitChoice {
                        feature,
                        threshold: binned.edges[feature][bin],
                        bin: Some(bin as u8),
                        gain: self.gain(parent, &left, &right),
                        left,
                        right,
                    },
                );
            }
        }
        best
    }
}

/// Gradients and hessians of ½·(prediction − target)².
pub fn squared_loss_gradients(predictions: &[f64], targets: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let grad = predictions
        .iter()
        .zip(targets)
        .map(|(p, y)| p - y)
        .collect();
    (grad, vec![1.0; targets.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (DMatrix<f64>, Vec<f64>) {
        let x = DMatrix::from_row_slice(
            8,
            2,
            &[
                0.0, 5.0, 1.0, 3.0, 2.0, 1.0, 3.0, 7.0, 4.0, 2.0, 5.0, 6.0, 6.0, 0.0, 7.0, 4.0,
            ],
        );
        let y = vec![1.0, 1.0, 1.0, 1.0, 9.0, 9.0, 9.0, 9.0];
        (x, y)
    }

    fn fit_cart(source: FeatureSource<'_>, params: &TreeParams, y: &[f64]) -> RegressionTree {
        let (grad, hess) = squared_loss_gradients(&vec![0.0; y.len()], y);
        TreeBuilder::new(source, params).grow(&grad, &hess, (0..y.len()).collect())
    }

    #[test]
    fn exact_split_finds_step_boundary() {
        let (x, y) = step_data();
        let tree = fit_cart(FeatureSource::Exact(&x), &TreeParams::default(), &y);

        assert_eq!(tree.leaf_count(), 2);
        match &tree.nodes()[0] {
            Node::Split {
                feature, threshold, ..
            } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 3.5);
            }
            other => panic!("expected a split, got {other:?}"),
        }
        assert_eq!(tree.predict_row(&[2.0, 0.0]), 1.0);
        assert_eq!(tree.predict_row(&[6.5, 0.0]), 9.0);
    }

    #[test]
    fn histogram_split_matches_exact_on_few_values() {
        let (x, y) = step_data();
        let binned = BinnedMatrix::new(&x, 255);
        let tree = fit_cart(FeatureSource::Binned(&binned), &TreeParams::default(), &y);
        for row in 0..8 {
            let values = [x[(row, 0)], x[(row, 1)]];
            assert_eq!(tree.predict_row(&values), y[row]);
        }
    }

    #[test]
    fn depth_limit_caps_growth() {
        let x = DMatrix::from_fn(16, 1, |i, _| i as f64);
        let y: Vec<f64> = (0..16).map(|i| (i * i) as f64).collect();
        let params = TreeParams {
            max_depth: Some(2),
            ..TreeParams::default()
        };
        let tree = fit_cart(FeatureSource::Exact(&x), &params, &y);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.leaf_count(), 4);
    }

    #[test]
    fn leaf_wise_growth_respects_leaf_budget() {
        let x = DMatrix::from_fn(32, 1, |i, _| i as f64);
        let y: Vec<f64> = (0..32).map(|i| ((i * 7) % 11) as f64).collect();
        let params = TreeParams {
            max_leaves: Some(5),
            growth: Growth::LeafWise,
            ..TreeParams::default()
        };
        let tree = fit_cart(FeatureSource::Exact(&x), &params, &y);
        assert_eq!(tree.leaf_count(), 5);
    }

    #[test]
    fn min_samples_leaf_blocks_small_children() {
        let (x, y) = step_data();
        let params = TreeParams {
            min_samples_leaf: 5,
            ..TreeParams::default()
        };
        let tree = fit_cart(FeatureSource::Exact(&x), &params, &y);
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.predict_row(&[0.0, 0.0]), 5.0);
    }

    #[test]
    fn lambda_shrinks_leaf_values() {
        let x = DMatrix::from_row_slice(2, 1, &[0.0, 1.0]);
        let y = vec![4.0, 4.0];
        let params = TreeParams {
            lambda: 2.0,
            ..TreeParams::default()
        };
        let tree = fit_cart(FeatureSource::Exact(&x), &params, &y);
        // G = −8, H = 2, λ = 2 → −G/(H+λ) = 2
        assert_eq!(tree.predict_row(&[0.0]), 2.0);
    }

    #[test]
    fn bin_edges_fall_between_distinct_values() {
        let edges = bin_edges(&[1.0, 1.0, 2.0, 4.0], 255);
        assert_eq!(edges, vec![1.5, 3.0]);

        let many: Vec<f64> = (0..1000).map(f64::from).collect();
        let edges = bin_edges(&many, 10);
        assert_eq!(edges.len(), 9);
        assert!(edges.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn scale_multiplies_leaves() {
        let (x, y) = step_data();
        let mut tree = fit_cart(FeatureSource::Exact(&x), &TreeParams::default(), &y);
        tree.scale(0.5);
        assert_eq!(tree.predict_row(&[0.0, 0.0]), 0.5);
    }
}
