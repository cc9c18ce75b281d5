//! Bagged ensemble of CART decision trees for binary classification.
//!
//! Trees split on Gini impurity, draw a random subset of features at every node
//! and are grown until their leaves are pure. All randomness flows from a single
//! seed so fitting identical data twice yields identical forests.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::labels::Label;

/// Knobs shared by every tree of a forest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeConfig {
    /// Features inspected per split before settling on the best one found
    pub max_features: usize,
    /// Nodes with fewer samples than this become leaves
    pub min_samples_split: usize,
    pub max_depth: Option<usize>,
}

impl TreeConfig {
    /// `sqrt(n_features)` candidates per split, fully grown trees
    pub fn for_features(n_features: usize) -> Self {
        Self {
            max_features: ((n_features as f64).sqrt().floor() as usize).max(1),
            min_samples_split: 2,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        counts: [usize; 2],
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    /// Weighted Gini of both children, in sample units
    child_impurity: f64,
}

fn gini(counts: [usize; 2]) -> f64 {
    let n = (counts[0] + counts[1]) as f64;
    if n == 0.0 {
        return 0.0;
    }
    let p0 = counts[0] as f64 / n;
    let p1 = counts[1] as f64 / n;
    1.0 - p0 * p0 - p1 * p1
}

fn majority(counts: [usize; 2]) -> Label {
    if counts[1] > counts[0] {
        Label::Favorable
    } else {
        Label::Unfavorable
    }
}

/// A single CART classification tree stored as a node arena
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    /// Total impurity decrease attributed to each feature, in sample units
    impurity_decrease: Vec<f64>,
}

impl DecisionTree {
    /// Grows a tree over the rows of `x` named by `indices` (repeats allowed)
    pub fn fit(
        x: &[Vec<f64>],
        y: &[Label],
        indices: &[usize],
        config: TreeConfig,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let n_features = x.first().map(|row| row.len()).unwrap_or(0);
        let mut tree = Self {
            nodes: Vec::new(),
            impurity_decrease: vec![0.0; n_features],
        };
        let mut working = indices.to_vec();
        tree.grow(x, y, &mut working, 0, config, rng);
        tree
    }

    fn grow(
        &mut self,
        x: &[Vec<f64>],
        y: &[Label],
        indices: &mut [usize],
        depth: usize,
        config: TreeConfig,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        let mut counts = [0usize; 2];
        for &i in indices.iter() {
            counts[y[i].as_index()] += 1;
        }

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { counts });

        let pure = counts[0] == 0 || counts[1] == 0;
        let too_small = indices.len() < config.min_samples_split;
        let too_deep = config.max_depth.is_some_and(|max| depth >= max);
        if pure || too_small || too_deep {
            return id;
        }

        let Some(best) = self.best_split(x, y, indices, config, rng) else {
            return id;
        };

        let mid = partition(indices, |i| x[i][best.feature] <= best.threshold);
        if mid == 0 || mid == indices.len() {
            return id;
        }

        let parent_impurity = gini(counts) * indices.len() as f64;
        self.impurity_decrease[best.feature] += (parent_impurity - best.child_impurity).max(0.0);

        let (left_idx, right_idx) = indices.split_at_mut(mid);
        let left = self.grow(x, y, left_idx, depth + 1, config, rng);
        let right = self.grow(x, y, right_idx, depth + 1, config, rng);

        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    /// Visits features in random order and keeps going past `max_features`
    /// until at least one valid partition has been found.
    fn best_split(
        &self,
        x: &[Vec<f64>],
        y: &[Label],
        indices: &[usize],
        config: TreeConfig,
        rng: &mut ChaCha8Rng,
    ) -> Option<Candidate> {
        let mut order: Vec<usize> = (0..self.impurity_decrease.len()).collect();
        order.shuffle(rng);

        let mut best: Option<Candidate> = None;
        for (visited, &feature) in order.iter().enumerate() {
            if visited >= config.max_features && best.is_some() {
                break;
            }
            if let Some(candidate) = best_threshold(x, y, indices, feature) {
                if best.map_or(true, |b| candidate.child_impurity < b.child_impurity) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    pub fn predict(&self, row: &[f64]) -> Label {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { counts } => return majority(*counts),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    /// Impurity decrease per feature normalised to sum to 1, or all zeros for a single-leaf tree
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.impurity_decrease.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.impurity_decrease.len()];
        }
        self.impurity_decrease.iter().map(|d| d / total).collect()
    }
}

/// Lowest weighted child Gini over all midpoints between distinct values of `feature`
fn best_threshold(x: &[Vec<f64>], y: &[Label], indices: &[usize], feature: usize) -> Option<Candidate> {
    let mut column: Vec<(f64, Label)> = indices.iter().map(|&i| (x[i][feature], y[i])).collect();
    column.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut total = [0usize; 2];
    for (_, label) in &column {
        total[label.as_index()] += 1;
    }

    let mut left = [0usize; 2];
    let mut best: Option<Candidate> = None;
    for pos in 0..column.len() - 1 {
        left[column[pos].1.as_index()] += 1;
        let (value, next) = (column[pos].0, column[pos + 1].0);
        if value == next {
            continue;
        }
        let right = [total[0] - left[0], total[1] - left[1]];
        let n_left = (pos + 1) as f64;
        let n_right = (column.len() - pos - 1) as f64;
        let child_impurity = gini(left) * n_left + gini(right) * n_right;
        if best.map_or(true, |b| child_impurity < b.child_impurity) {
            best = Some(Candidate {
                feature,
                threshold: midpoint(value, next),
                child_impurity,
            });
        }
    }
    best
}

/// Split point between two distinct sorted values. Falls back to `lower` when the
/// midpoint rounds up to `upper` or overflows, so `<= threshold` always separates them.
fn midpoint(lower: f64, upper: f64) -> f64 {
    let mid = lower + (upper - lower) / 2.0;
    if !mid.is_finite() || mid >= upper {
        lower
    } else {
        mid
    }
}

/// Moves elements matching `pred` to the front, returning how many matched
fn partition(indices: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for i in 0..indices.len() {
        if pred(indices[i]) {
            indices.swap(mid, i);
            mid += 1;
        }
    }
    mid
}

/// Bootstrap-aggregated forest of [`DecisionTree`]s voting by simple majority
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl RandomForest {
    /// Fits `n_estimators` trees, each on a bootstrap resample of the rows
    pub fn fit(x: &[Vec<f64>], y: &[Label], n_estimators: usize, seed: u64) -> Self {
        let n_features = x.first().map(|row| row.len()).unwrap_or(0);
        let config = TreeConfig::for_features(n_features);
        let mut master = ChaCha8Rng::seed_from_u64(seed);

        let trees = (0..n_estimators)
            .map(|_| {
                let mut rng = ChaCha8Rng::seed_from_u64(master.gen());
                let sample: Vec<usize> = (0..x.len()).map(|_| rng.gen_range(0..x.len())).collect();
                DecisionTree::fit(x, y, &sample, config, &mut rng)
            })
            .collect();

        Self { trees, n_features }
    }

    /// Majority vote; an even split resolves to [`Label::Unfavorable`]
    pub fn predict(&self, row: &[f64]) -> Label {
        let favorable = self
            .trees
            .iter()
            .filter(|t| t.predict(row) == Label::Favorable)
            .count();
        if favorable * 2 > self.trees.len() {
            Label::Favorable
        } else {
            Label::Unfavorable
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean of the per-tree importances, renormalised to sum to 1.
    /// Falls back to a uniform split when no tree ever split.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (sum, imp) in sums.iter_mut().zip(tree.feature_importances()) {
                *sum += imp;
            }
        }

        let total: f64 = sums.iter().sum();
        if total <= 0.0 {
            return vec![1.0 / self.n_features as f64; self.n_features];
        }
        sums.iter().map(|s| s / total).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<Label>) {
        // Feature 0 decides the label; feature 1 is noise.
        let x: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![i as f64, ((i * 7) % 5) as f64])
            .collect();
        let y = x
            .iter()
            .map(|row| if row[0] >= 20.0 { Label::Favorable } else { Label::Unfavorable })
            .collect();
        (x, y)
    }

    #[test]
    fn test_tree_fits_training_data() {
        let (x, y) = separable();
        let indices: Vec<usize> = (0..x.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let tree = DecisionTree::fit(&x, &y, &indices, TreeConfig::for_features(2), &mut rng);

        for (row, label) in x.iter().zip(&y) {
            assert_eq!(tree.predict(row), *label);
        }
        assert!(tree.depth() >= 1);
        assert!(tree.node_count() >= 3);
    }

    #[test]
    fn test_pure_labels_make_a_single_leaf() {
        let x = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let y = vec![Label::Favorable; 3];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = DecisionTree::fit(&x, &y, &[0, 1, 2], TreeConfig::for_features(2), &mut rng);

        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.feature_importances(), vec![0.0, 0.0]);
        assert_eq!(tree.predict(&[100.0, -100.0]), Label::Favorable);
    }

    #[test]
    fn test_forest_ranks_informative_feature_first() {
        let (x, y) = separable();
        let forest = RandomForest::fit(&x, &y, 25, 42);
        let importances = forest.feature_importances();

        assert_eq!(forest.n_trees(), 25);
        assert!(importances[0] > importances[1]);
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(forest.predict(&[35.0, 1.0]), Label::Favorable);
        assert_eq!(forest.predict(&[2.0, 1.0]), Label::Unfavorable);
    }

    #[test]
    fn test_forest_is_deterministic_for_a_seed() {
        let (x, y) = separable();
        let a = RandomForest::fit(&x, &y, 10, 42);
        let b = RandomForest::fit(&x, &y, 10, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_uniform_importances_when_nothing_splits() {
        let x = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let y = vec![Label::Unfavorable; 2];
        let forest = RandomForest::fit(&x, &y, 5, 42);
        for imp in forest.feature_importances() {
            assert!((imp - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_adjacent_floats_still_split() {
        let a = f64::from_bits(1.0f64.to_bits() + 1);
        let b = f64::from_bits(a.to_bits() + 1);
        assert!(midpoint(a, b) < b);

        let x = vec![vec![a, 0.0], vec![b, 0.0]];
        let y = vec![Label::Unfavorable, Label::Favorable];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let tree = DecisionTree::fit(&x, &y, &[0, 1], TreeConfig::for_features(2), &mut rng);

        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.predict(&[a, 0.0]), Label::Unfavorable);
        assert_eq!(tree.predict(&[b, 0.0]), Label::Favorable);
    }

    #[test]
    fn test_extreme_magnitudes_still_split() {
        assert_eq!(midpoint(-1e308, 1e308), -1e308);

        let x = vec![vec![-1e308, 1.0], vec![1e308, 1.0]];
        let y = vec![Label::Favorable, Label::Unfavorable];
        let forest = RandomForest::fit(&x, &y, 5, 42);
        let importances = forest.feature_importances();
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let tree = DecisionTree::fit(&x, &y, &[0, 1], TreeConfig::for_features(2), &mut rng);
        assert_eq!(tree.predict(&[-1e308, 1.0]), Label::Favorable);
        assert_eq!(tree.predict(&[1e308, 1.0]), Label::Unfavorable);
    }

    #[test]
    fn test_partition_moves_matches_to_front() {
        let mut v = vec![5, 1, 4, 2, 3];
        let mid = partition(&mut v, |i| i <= 2);
        assert_eq!(mid, 2);
        let mut front = v[..mid].to_vec();
        front.sort();
        assert_eq!(front, vec![1, 2]);
    }
}
