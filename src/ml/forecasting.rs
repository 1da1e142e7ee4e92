//! Bootstrap-aggregated regression trees over a single feature.
//!
//! The demand forecaster fits one ensemble per product on the synthetic
//! month index and extrapolates a short horizon past the last observed
//! index. Trees cannot extrapolate beyond the training range, so future
//! indices resolve to the rightmost leaves of each tree; the ensemble mean
//! therefore always lies within the range of observed targets. With
//! non-negative sales quantities the prediction is never negative.

use rand::Rng;

/// Tuning knobs for the ensemble.
#[derive(Debug, Clone)]
pub struct ForestConfig {
    /// Number of bootstrap trees.
    pub n_trees: usize,
    /// Minimum samples a node needs before a split is attempted.
    pub min_samples_split: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 200,
            min_samples_split: 2,
        }
    }
}

/// A single CART-style regression tree on one feature, stored as an arena.
#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        threshold: f64,
        left: usize,
        right: usize,
    },
}

impl RegressionTree {
    /// Fit a fully grown tree on the sample described by `indices`.
    fn fit(xs: &[f64], ys: &[f64], indices: &[usize], min_samples_split: usize) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_by(|&a, &b| xs[a].total_cmp(&xs[b]));
        tree.build(xs, ys, &sorted, min_samples_split);
        tree
    }

    /// Recursively grow the subtree for `indices` (sorted by feature value)
    /// and return its node id.
    fn build(&mut self, xs: &[f64], ys: &[f64], indices: &[usize], min_samples_split: usize) -> usize {
        let mean = indices.iter().map(|&i| ys[i]).sum::<f64>() / indices.len() as f64;

        if indices.len() < min_samples_split {
            return self.push(Node::Leaf { value: mean });
        }

        let Some((split_at, threshold)) = best_split(xs, ys, indices) else {
            // All feature values identical (or targets pure); nothing to gain.
            return self.push(Node::Leaf { value: mean });
        };

        // Reserve the slot before recursing so child ids stay stable.
        let id = self.push(Node::Leaf { value: mean });
        let left = self.build(xs, ys, &indices[..split_at], min_samples_split);
        let right = self.build(xs, ys, &indices[split_at..], min_samples_split);
        self.nodes[id] = Node::Split {
            threshold,
            left,
            right,
        };
        id
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn predict(&self, x: f64) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Leaf { value } => return value,
                Node::Split {
                    threshold,
                    left,
                    right,
                } => {
                    id = if x <= threshold { left } else { right };
                }
            }
        }
    }
}

/// Find the boundary minimizing the summed squared error of the two halves.
///
/// `indices` must be sorted by feature value. Returns the split position in
/// `indices` and the midpoint threshold, or None when no boundary separates
/// two distinct feature values.
fn best_split(xs: &[f64], ys: &[f64], indices: &[usize]) -> Option<(usize, f64)> {
    let n = indices.len();

    // Prefix sums of y and y^2 let each candidate be scored in O(1).
    let mut sum = vec![0.0; n + 1];
    let mut sum_sq = vec![0.0; n + 1];
    for (pos, &i) in indices.iter().enumerate() {
        sum[pos + 1] = sum[pos] + ys[i];
        sum_sq[pos + 1] = sum_sq[pos] + ys[i] * ys[i];
    }

    let sse = |from: usize, to: usize| -> f64 {
        let count = (to - from) as f64;
        let s = sum[to] - sum[from];
        let sq = sum_sq[to] - sum_sq[from];
        sq - s * s / count
    };

    let mut best: Option<(usize, f64, f64)> = None;
    for pos in 1..n {
        let (prev, curr) = (xs[indices[pos - 1]], xs[indices[pos]]);
        if prev == curr {
            continue;
        }
        let score = sse(0, pos) + sse(pos, n);
        let threshold = (prev + curr) / 2.0;
        if best.map_or(true, |(_, _, s)| score < s) {
            best = Some((pos, threshold, score));
        }
    }

    best.map(|(pos, threshold, _)| (pos, threshold))
}

/// Bootstrap-aggregated regression trees: each tree is fit on a
/// sample-with-replacement of the training set and predictions are the mean
/// over trees.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
}

impl RandomForestRegressor {
    /// Fit the ensemble. `xs` and `ys` must have equal, non-zero length.
    pub fn fit<R: Rng + ?Sized>(
        config: &ForestConfig,
        xs: &[f64],
        ys: &[f64],
        rng: &mut R,
    ) -> Self {
        assert_eq!(xs.len(), ys.len(), "feature/target length mismatch");
        assert!(!xs.is_empty(), "cannot fit on an empty sample");

        let n = xs.len();
        let trees = (0..config.n_trees.max(1))
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(xs, ys, &sample, config.min_samples_split)
            })
            .collect();

        Self { trees }
    }

    pub fn predict(&self, x: f64) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        total / self.trees.len() as f64
    }
}
