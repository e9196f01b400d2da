//! Variance-reduction regression trees over sparse features
//!
//! Used directly by both ensembles: the random forest fits trees to 0/1
//! targets (variance reduction on binary targets ranks splits exactly like
//! Gini impurity), gradient boosting fits them to log-loss residuals.

use rand::{rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVecView};

/// Impurity below which a node is considered pure
const IMPURITY_EPS: f64 = 1e-12;

/// How many features to consider at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Every feature present in the node
    All,
    /// `sqrt(n_features)`, drawn at random; more are drawn if none splits
    Sqrt,
}

/// Growth limits
#[derive(Debug, Clone)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree; node 0 is the root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Leaf value reached by a row. Absent features read as zero.
    pub fn predict(&self, row: &CsVecView<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Number of leaves
    pub fn num_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, TreeNode::Leaf { .. }))
            .count()
    }

    /// Longest root-to-leaf path, in edges
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
            }
        }
        walk(&self.nodes, 0)
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    sse: f64,
}

/// Samples sharing one feature value: their count and target sums
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bucket {
    value: f64,
    count: usize,
    sum: f64,
    sq: f64,
}

impl Bucket {
    fn new(value: f64, target: f64, count: usize) -> Self {
        let weight = count as f64;
        Self {
            value,
            count,
            sum: weight * target,
            sq: weight * target * target,
        }
    }
}

/// Target totals over the samples of one node
#[derive(Debug, Clone, Copy)]
struct NodeTotals {
    count: usize,
    sum: f64,
    sq: f64,
}

/// Grows trees against one feature matrix and one target vector
pub struct TreeBuilder<'a> {
    rows: &'a CsMat<f64>,
    columns: &'a CsMat<f64>,
    targets: &'a [f64],
    params: &'a TreeParams,
    /// How many times each sample occurs in the current node, reset after use
    multiplicity: Vec<usize>,
}

impl<'a> TreeBuilder<'a> {
    /// `rows` must be CSR and `columns` the CSC copy of the same matrix
    pub fn new(
        rows: &'a CsMat<f64>,
        columns: &'a CsMat<f64>,
        targets: &'a [f64],
        params: &'a TreeParams,
    ) -> Self {
        Self {
            rows,
            columns,
            targets,
            params,
            multiplicity: vec![0; rows.rows()],
        }
    }

    /// Grow a tree over `samples` (indices may repeat, as in a bootstrap).
    /// `leaf_value` maps the samples reaching a leaf to its output.
    pub fn build<F>(&mut self, samples: &[usize], rng: &mut StdRng, leaf_value: F) -> RegressionTree
    where
        F: Fn(&[usize]) -> f64,
    {
        let mut nodes = Vec::new();
        self.grow(&mut nodes, samples, 0, rng, &leaf_value);
        RegressionTree { nodes }
    }

    fn grow<F>(
        &mut self,
        nodes: &mut Vec<TreeNode>,
        samples: &[usize],
        depth: usize,
        rng: &mut StdRng,
        leaf_value: &F,
    ) -> usize
    where
        F: Fn(&[usize]) -> f64,
    {
        let idx = nodes.len();
        nodes.push(TreeNode::Leaf {
            value: leaf_value(samples),
        });

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        if depth_reached || samples.len() < self.params.min_samples_split.max(2) {
            return idx;
        }

        let parent_sse = sum_squared_error(samples.iter().map(|&s| self.targets[s]));
        if parent_sse <= IMPURITY_EPS {
            return idx;
        }

        let Some(split) = self.best_split(samples, parent_sse, rng) else {
            return idx;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .copied()
            .partition(|&s| self.value(s, split.feature) <= split.threshold);

        let left_idx = self.grow(nodes, &left, depth + 1, rng, leaf_value);
        let right_idx = self.grow(nodes, &right, depth + 1, rng, leaf_value);
        nodes[idx] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_idx,
            right: right_idx,
        };
        idx
    }

    fn value(&self, sample: usize, feature: usize) -> f64 {
        self.rows
            .outer_view(sample)
            .and_then(|row| row.get(feature).copied())
            .unwrap_or(0.0)
    }

    fn best_split(
        &mut self,
        samples: &[usize],
        parent_sse: f64,
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let rows = self.rows;

        // Only features non-zero somewhere in the node can separate it
        let mut candidates = Vec::new();
        for &s in samples {
            if let Some(row) = rows.outer_view(s) {
                candidates.extend_from_slice(row.indices());
            }
        }
        candidates.sort_unstable();
        candidates.dedup();

        let wanted = match self.params.max_features {
            MaxFeatures::All => candidates.len(),
            MaxFeatures::Sqrt => ((rows.cols() as f64).sqrt() as usize).max(1),
        };
        if wanted < candidates.len() {
            candidates.shuffle(rng);
        }

        let totals = self.enter_node(samples);
        let mut best: Option<SplitCandidate> = None;

        for (visited, feature) in candidates.into_iter().enumerate() {
            if visited >= wanted && best.is_some() {
                break;
            }

            let buckets = self.column_buckets(feature, totals);
            if let Some((sse, threshold)) = self.scan(&buckets) {
                let improves_parent = sse < parent_sse - IMPURITY_EPS;
                let beats_best = best.as_ref().map_or(true, |b| sse < b.sse);
                if improves_parent && beats_best {
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        sse,
                    });
                }
            }
        }

        self.leave_node(samples);
        best
    }

    /// Record the node's sample multiplicities and return its target totals
    fn enter_node(&mut self, samples: &[usize]) -> NodeTotals {
        let mut totals = NodeTotals {
            count: samples.len(),
            sum: 0.0,
            sq: 0.0,
        };
        for &s in samples {
            self.multiplicity[s] += 1;
            let target = self.targets[s];
            totals.sum += target;
            totals.sq += target * target;
        }
        totals
    }

    fn leave_node(&mut self, samples: &[usize]) {
        for &s in samples {
            self.multiplicity[s] = 0;
        }
    }

    /// Value-sorted buckets of one column restricted to the current node.
    ///
    /// Only the column's stored entries are visited. Every node sample
    /// without a stored non-zero falls into a single zero bucket whose
    /// sums come from the node totals.
    fn column_buckets(&self, feature: usize, totals: NodeTotals) -> Vec<Bucket> {
        let mut entries = Vec::new();
        if let Some(column) = self.columns.outer_view(feature) {
            for (row, &value) in column.iter() {
                let count = self.multiplicity[row];
                if count > 0 && value != 0.0 {
                    entries.push(Bucket::new(value, self.targets[row], count));
                }
            }
        }
        entries.sort_by(|a, b| a.value.total_cmp(&b.value));

        let nonzero = entries.iter().fold((0usize, 0.0, 0.0), |(n, s, q), b| {
            (n + b.count, s + b.sum, q + b.sq)
        });
        let zeros = Bucket {
            value: 0.0,
            count: totals.count - nonzero.0,
            sum: totals.sum - nonzero.1,
            sq: totals.sq - nonzero.2,
        };
        if zeros.count > 0 {
            let at = entries.partition_point(|b| b.value < 0.0);
            entries.insert(at, zeros);
        }
        entries
    }

    /// Best threshold along value-sorted buckets: `(sse, threshold)`
    fn scan(&self, buckets: &[Bucket]) -> Option<(f64, f64)> {
        let n: usize = buckets.iter().map(|b| b.count).sum();
        if n < 2 || buckets.len() < 2 {
            return None;
        }
        let min_leaf = self.params.min_samples_leaf.max(1);

        let total_sum: f64 = buckets.iter().map(|b| b.sum).sum();
        let total_sq: f64 = buckets.iter().map(|b| b.sq).sum();
        let mut left_n = 0usize;
        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        let mut best: Option<(f64, f64)> = None;

        for pair in buckets.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            left_n += current.count;
            left_sum += current.sum;
            left_sq += current.sq;

            let right_n = n - left_n;
            if next.value <= current.value || left_n < min_leaf || right_n < min_leaf {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n as f64)
                + (right_sq - right_sum * right_sum / right_n as f64);

            if best.map_or(true, |(b, _)| sse < b) {
                best = Some((sse, (current.value + next.value) / 2.0));
            }
        }

        best
    }
}

fn sum_squared_error(values: impl Iterator<Item = f64>) -> f64 {
    let (n, sum, sq) = values.fold((0usize, 0.0, 0.0), |(n, s, q), v| (n + 1, s + v, q + v * v));
    if n == 0 {
        0.0
    } else {
        (sq - sum * sum / n as f64).max(0.0)
    }
}

/// Mean of `targets` over `samples`
pub(crate) fn mean_target(samples: &[usize], targets: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&s| targets[s]).sum::<f64>() / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::super::test_support::csr;
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_single_split_on_informative_feature() {
        let x = csr(&[&[0.0, 1.0], &[0.0, 2.0], &[5.0, 1.0], &[6.0, 2.0]]);
        let columns = x.to_csc();
        let targets = [0.0, 0.0, 1.0, 1.0];
        let params = TreeParams::default();
        let mut rng = StdRng::seed_from_u64(7);

        let mut builder = TreeBuilder::new(&x, &columns, &targets, &params);
        let tree = builder.build(&[0, 1, 2, 3], &mut rng, |s| mean_target(s, &targets));

        assert_eq!(tree.num_leaves(), 2);
        assert_eq!(tree.depth(), 1);
        let probe = csr(&[&[4.0, 0.0], &[0.0, 9.0]]);
        assert_eq!(tree.predict(&probe.outer_view(0).unwrap()), 1.0);
        assert_eq!(tree.predict(&probe.outer_view(1).unwrap()), 0.0);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = csr(&[&[1.0], &[2.0], &[3.0], &[4.0]]);
        let columns = x.to_csc();
        let targets = [0.0, 1.0, 0.0, 1.0];
        let params = TreeParams {
            max_depth: Some(1),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(7);

        let mut builder = TreeBuilder::new(&x, &columns, &targets, &params);
        let tree = builder.build(&[0, 1, 2, 3], &mut rng, |s| mean_target(s, &targets));
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn test_pure_node_is_leaf() {
        let x = csr(&[&[1.0], &[2.0]]);
        let columns = x.to_csc();
        let targets = [1.0, 1.0];
        let params = TreeParams::default();
        let mut rng = StdRng::seed_from_u64(7);

        let mut builder = TreeBuilder::new(&x, &columns, &targets, &params);
        let tree = builder.build(&[0, 1], &mut rng, |s| mean_target(s, &targets));
        assert_eq!(tree.num_leaves(), 1);
    }

    /// Best split per feature from every sample's value, zeros included
    fn dense_best(
        builder: &TreeBuilder<'_>,
        x: &CsMat<f64>,
        targets: &[f64],
        samples: &[usize],
        feature: usize,
    ) -> Option<(f64, f64)> {
        let mut buckets: Vec<Bucket> = samples
            .iter()
            .map(|&s| {
                let value = x
                    .outer_view(s)
                    .and_then(|row| row.get(feature).copied())
                    .unwrap_or(0.0);
                Bucket::new(value, targets[s], 1)
            })
            .collect();
        buckets.sort_by(|a, b| a.value.total_cmp(&b.value));
        builder.scan(&buckets)
    }

    #[test]
    fn test_sparse_column_scan_matches_dense_scan() {
        let x = csr(&[
            &[0.0, 1.0, 0.0, -2.0],
            &[3.0, 0.0, 0.0, 0.0],
            &[0.0, 2.0, 1.0, 0.0],
            &[1.0, 0.0, 0.0, 4.0],
            &[0.0, 0.0, 2.0, -1.0],
            &[2.0, 1.0, 0.0, 0.0],
            &[0.0, 0.0, 0.0, 3.0],
        ]);
        let columns = x.to_csc();
        let targets = [0.0, 1.0, 0.0, 1.0, 0.5, 1.0, 0.0];
        let params = TreeParams::default();
        // Repeated indices, as in a bootstrap sample
        let samples = [0, 1, 1, 2, 3, 4, 4, 4, 6];

        let mut builder = TreeBuilder::new(&x, &columns, &targets, &params);
        let totals = builder.enter_node(&samples);
        for feature in 0..x.cols() {
            let sparse = builder.scan(&builder.column_buckets(feature, totals));
            let dense = dense_best(&builder, &x, &targets, &samples, feature);
            match (sparse, dense) {
                (Some((sse_s, threshold)), Some((sse_d, _))) => {
                    assert!((sse_s - sse_d).abs() < 1e-9, "feature {}", feature);
                    let (left, right): (Vec<usize>, Vec<usize>) = samples
                        .iter()
                        .copied()
                        .partition(|&s| builder.value(s, feature) <= threshold);
                    let split_sse = sum_squared_error(left.iter().map(|&s| targets[s]))
                        + sum_squared_error(right.iter().map(|&s| targets[s]));
                    assert!((split_sse - sse_d).abs() < 1e-9, "feature {}", feature);
                }
                (None, None) => {}
                other => panic!("feature {}: {:?}", feature, other),
            }
        }
        builder.leave_node(&samples);
        assert!(builder.multiplicity.iter().all(|&m| m == 0));
    }

    #[test]
    fn test_zero_bucket_takes_node_remainder() {
        let x = csr(&[&[0.0], &[5.0], &[0.0], &[0.0]]);
        let columns = x.to_csc();
        let targets = [1.0, 0.0, 1.0, 0.0];
        let params = TreeParams::default();

        let mut builder = TreeBuilder::new(&x, &columns, &targets, &params);
        let totals = builder.enter_node(&[0, 1, 2]);
        let buckets = builder.column_buckets(0, totals);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].value, 0.0);
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[0].sum, 2.0);
        assert_eq!(buckets[1], Bucket::new(5.0, 0.0, 1));
    }

    #[test]
    fn test_sum_squared_error() {
        assert_eq!(sum_squared_error([1.0, 1.0].into_iter()), 0.0);
        assert!((sum_squared_error([0.0, 1.0].into_iter()) - 0.5).abs() < 1e-12);
        assert_eq!(sum_squared_error(std::iter::empty()), 0.0);
    }
}
