//! Exact tree builder
//!
//! Compiles a linear function over boolean features into a decision tree
//! with linear leaves that reproduces the function's logit, given that no
//! non-intercept aspatial feature is ever active together with a spatial one.
use crate::errors::LogitTreeError;
use crate::features::{FeatureCatalogue, FeatureRef, WeightVector};
use crate::node::LogitTreeNode;
use crate::splitter::{AbsorptionScorer, MaxAbsScorer, RemainingFeatures, ScoredSplit, SplitScorer};
use crate::utils::validate_weight_alignment;
use log::{debug, info};

/// Builds a tree from a weight vector, choosing splits with `S`.
pub struct ExactTreeBuilder<S: SplitScorer> {
    pub scorer: S,
    /// Build the two branches of each decision node on the rayon pool.
    pub parallel: bool,
}

impl<S: SplitScorer> ExactTreeBuilder<S> {
    pub fn new(scorer: S) -> Self {
        ExactTreeBuilder { scorer, parallel: false }
    }

    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Build a tree equivalent to the linear function `weights`.
    ///
    /// * `features` - Catalogue the weights are aligned to, aspatial then spatial.
    /// * `weights` - One weight per feature.
    /// * `max_depth` - Maximum number of decision nodes on any root to leaf path.
    pub fn build<C: FeatureCatalogue>(
        &self,
        features: &C,
        weights: &WeightVector,
        max_depth: usize,
    ) -> Result<LogitTreeNode, LogitTreeError> {
        let (remaining, intercept) = preprocess(features, weights)?;
        info!(
            "Building exact logit tree over {} weighted features, max depth {}.",
            remaining.len(),
            max_depth
        );
        let tree = self.build_node(features, remaining, intercept, max_depth);
        info!(
            "Finished exact logit tree with depth {}, {} decision nodes and {} leaves.",
            tree.depth(),
            tree.num_decision_nodes(),
            tree.num_leaves()
        );
        Ok(tree)
    }

    fn build_node<C: FeatureCatalogue>(
        &self,
        features: &C,
        remaining: RemainingFeatures,
        intercept: f32,
        depth: usize,
    ) -> LogitTreeNode {
        if remaining.is_empty() {
            return LogitTreeNode::intercept_leaf(intercept);
        }

        if depth == 0 {
            return LogitTreeNode::leaf(intercept, remaining.weighted_features());
        }

        let split = match self.scorer.best_split(features, &remaining) {
            Some(split) => split,
            None => return LogitTreeNode::leaf(intercept, remaining.weighted_features()),
        };
        debug!(
            "Splitting on {} with branch score {} at remaining depth {}.",
            features.display_name(split.feature),
            split.score,
            depth
        );

        let ((true_remaining, true_intercept), (false_remaining, false_intercept)) =
            partition(features, &remaining, intercept, &split);

        let (true_node, false_node) = if self.parallel {
            rayon::join(
                || self.build_node(features, true_remaining, true_intercept, depth - 1),
                || self.build_node(features, false_remaining, false_intercept, depth - 1),
            )
        } else {
            (
                self.build_node(features, true_remaining, true_intercept, depth - 1),
                self.build_node(features, false_remaining, false_intercept, depth - 1),
            )
        };

        LogitTreeNode::decision(split.feature, true_node, false_node)
    }
}

/// Build a tree that reproduces `weights` exactly, choosing the split that
/// leaves the least undecided weight.
pub fn build_tree<C: FeatureCatalogue>(
    features: &C,
    weights: &WeightVector,
    max_depth: usize,
) -> Result<LogitTreeNode, LogitTreeError> {
    ExactTreeBuilder::new(AbsorptionScorer).build(features, weights, max_depth)
}

/// Same recursion as [`build_tree`], but always splits on the feature with
/// the largest absolute weight.
pub fn build_tree_naive_max_abs<C: FeatureCatalogue>(
    features: &C,
    weights: &WeightVector,
    max_depth: usize,
) -> Result<LogitTreeNode, LogitTreeError> {
    ExactTreeBuilder::new(MaxAbsScorer).build(features, weights, max_depth)
}

/// Fold intercept weights into a single bias and drop zero weights.
pub fn preprocess<C: FeatureCatalogue>(
    features: &C,
    weights: &WeightVector,
) -> Result<(RemainingFeatures, f32), LogitTreeError> {
    validate_weight_alignment(features.num_features(), weights.len())?;

    let all_weights = weights.all_weights();
    let num_aspatial = features.aspatial_features().len();
    let (aspatial_weights, spatial_weights) = all_weights.split_at(num_aspatial);

    let mut intercept = 0.0_f32;
    let mut aspatial = Vec::with_capacity(num_aspatial);
    for (i, (feature, w)) in features.aspatial_features().iter().zip(aspatial_weights).enumerate() {
        if feature.is_intercept() {
            intercept += *w;
        } else if *w != 0.0 {
            aspatial.push((i, *w));
        }
    }

    let spatial = spatial_weights
        .iter()
        .enumerate()
        .filter(|(_, w)| **w != 0.0)
        .map(|(i, w)| (i, *w))
        .collect();

    Ok((RemainingFeatures { aspatial, spatial }, intercept))
}

type Branch = (RemainingFeatures, f32);

/// Remaining features and intercepts for the (true, false) children of a split.
///
/// Features dropped with their weight folded into the intercept are known to
/// be active in that branch, features dropped without folding are known to be
/// inactive.
pub fn partition<C: FeatureCatalogue>(
    features: &C,
    remaining: &RemainingFeatures,
    intercept: f32,
    split: &ScoredSplit,
) -> (Branch, Branch) {
    match split.feature {
        FeatureRef::Aspatial(a) => {
            let aspatial: Vec<(usize, f32)> = remaining.aspatial.iter().filter(|(i, _)| *i != a).copied().collect();
            let true_branch = (
                RemainingFeatures {
                    aspatial: aspatial.clone(),
                    spatial: Vec::new(),
                },
                intercept + split.weight,
            );
            let false_branch = (
                RemainingFeatures {
                    aspatial,
                    spatial: remaining.spatial.clone(),
                },
                intercept,
            );
            (true_branch, false_branch)
        }
        FeatureRef::Spatial(s) => {
            let mut true_intercept = intercept + split.weight;
            let mut true_spatial = Vec::with_capacity(remaining.spatial.len());
            let mut false_spatial = Vec::with_capacity(remaining.spatial.len());
            for (j, w) in remaining.spatial.iter() {
                if *j == s {
                    continue;
                }
                if features.generalizes(*j, s) {
                    true_intercept += *w;
                } else {
                    true_spatial.push((*j, *w));
                }
                if !features.generalizes(s, *j) {
                    false_spatial.push((*j, *w));
                }
            }
            let true_branch = (
                RemainingFeatures {
                    aspatial: Vec::new(),
                    spatial: true_spatial,
                },
                true_intercept,
            );
            let false_branch = (
                RemainingFeatures {
                    aspatial: remaining.aspatial.clone(),
                    spatial: false_spatial,
                },
                intercept,
            );
            (true_branch, false_branch)
        }
        // Intercepts never reach the candidate lists.
        FeatureRef::Intercept => (
            (remaining.clone(), intercept + split.weight),
            (remaining.clone(), intercept),
        ),
    }
}
