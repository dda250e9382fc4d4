//! Experience tree learner
//!
//! Fits a logit tree to recorded play by regressing on the logits an oracle
//! linear function assigns to every available move. Splits minimise the
//! summed squared error of the targets around each branch's mean, and every
//! leaf is a single intercept holding that mean.
use crate::errors::LogitTreeError;
use crate::experience::{ExperienceBuffer, Sample};
use crate::features::{FeatureCatalogue, FeatureRef, FeatureVector, WeightVector};
use crate::node::LogitTreeNode;
use crate::utils::{mean, validate_positive_count, validate_weight_alignment};
use log::{debug, info, warn};
use rayon::prelude::*;

/// A feature vector with the logit the oracle assigns to it.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingPair {
    pub feature_vector: FeatureVector,
    pub target: f32,
}

/// Derive training pairs from every sample that offered a real choice.
pub fn training_pairs<C, B>(
    features: &C,
    oracle: &WeightVector,
    buffer: &B,
) -> Result<Vec<TrainingPair>, LogitTreeError>
where
    C: FeatureCatalogue,
    B: ExperienceBuffer + ?Sized,
{
    validate_weight_alignment(features.num_features(), oracle.len())?;
    let num_aspatial = features.aspatial_features().len();
    let pairs = buffer
        .all_experience()
        .iter()
        .filter(|sample| sample.num_moves() > 1)
        .flat_map(|sample| sample.generate_feature_vectors(features))
        .map(|feature_vector| TrainingPair {
            target: oracle.dot(&feature_vector, num_aspatial),
            feature_vector,
        })
        .collect();
    Ok(pairs)
}

/// Learns a logit tree from recorded experience.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExperienceTreeLearner {
    /// Score candidate features, and build sibling branches, on the rayon pool.
    pub parallel: bool,
}

/// Path state carried down the recursion.
#[derive(Clone)]
struct UsedFeatures {
    aspatial: Vec<bool>,
    spatial: Vec<bool>,
}

impl UsedFeatures {
    fn mark(&mut self, feature: FeatureRef) {
        match feature {
            FeatureRef::Aspatial(i) => self.aspatial[i] = true,
            FeatureRef::Spatial(i) => self.spatial[i] = true,
            FeatureRef::Intercept => (),
        }
    }
}

impl ExperienceTreeLearner {
    pub fn new() -> Self {
        ExperienceTreeLearner { parallel: false }
    }

    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Learn a tree from experience.
    ///
    /// * `features` - Feature catalogue used to generate feature vectors.
    /// * `oracle` - Linear function whose logits are the regression targets.
    /// * `buffer` - Recorded samples; samples with fewer than two moves are skipped.
    /// * `max_depth` - Maximum number of decision nodes on any root to leaf path.
    /// * `min_samples_per_leaf` - Minimum number of training pairs in either branch of a split.
    pub fn build<C, B>(
        &self,
        features: &C,
        oracle: &WeightVector,
        buffer: &B,
        max_depth: usize,
        min_samples_per_leaf: usize,
    ) -> Result<LogitTreeNode, LogitTreeError>
    where
        C: FeatureCatalogue,
        B: ExperienceBuffer + ?Sized,
    {
        validate_positive_count(min_samples_per_leaf, "min_samples_per_leaf")?;
        let pairs = training_pairs(features, oracle, buffer)?;
        if pairs.is_empty() {
            warn!("Experience buffer produced no training pairs, tree will be a single zero leaf.");
        }
        info!(
            "Learning logit tree from {} training pairs, max depth {}, min samples per leaf {}.",
            pairs.len(),
            max_depth,
            min_samples_per_leaf
        );

        let used = UsedFeatures {
            aspatial: features.aspatial_features().iter().map(|f| f.is_intercept()).collect(),
            spatial: vec![false; features.spatial_features().len()],
        };
        let samples: Vec<&TrainingPair> = pairs.iter().collect();
        let tree = self.build_node(features, samples, used, max_depth, min_samples_per_leaf)?;

        info!(
            "Finished learned logit tree with depth {}, {} decision nodes and {} leaves.",
            tree.depth(),
            tree.num_decision_nodes(),
            tree.num_leaves()
        );
        Ok(tree)
    }

    fn build_node<C: FeatureCatalogue>(
        &self,
        features: &C,
        samples: Vec<&TrainingPair>,
        mut used: UsedFeatures,
        depth: usize,
        min_samples_per_leaf: usize,
    ) -> Result<LogitTreeNode, LogitTreeError> {
        validate_positive_count(min_samples_per_leaf, "min_samples_per_leaf")?;

        if samples.is_empty() {
            return Ok(LogitTreeNode::intercept_leaf(0.0));
        }

        let targets: Vec<f32> = samples.iter().map(|s| s.target).collect();
        let mean_target = mean(&targets);
        if depth == 0 {
            return Ok(LogitTreeNode::intercept_leaf(mean_target));
        }

        let candidates: Vec<FeatureRef> = used
            .aspatial
            .iter()
            .enumerate()
            .filter(|(_, u)| !**u)
            .map(|(i, _)| FeatureRef::Aspatial(i))
            .chain(
                used.spatial
                    .iter()
                    .enumerate()
                    .filter(|(_, u)| !**u)
                    .map(|(i, _)| FeatureRef::Spatial(i)),
            )
            .collect();

        let errors: Vec<Option<f64>> = if self.parallel {
            candidates
                .par_iter()
                .map(|f| split_error(&samples, *f, min_samples_per_leaf))
                .collect()
        } else {
            candidates
                .iter()
                .map(|f| split_error(&samples, *f, min_samples_per_leaf))
                .collect()
        };

        let mut best: Option<(FeatureRef, f64)> = None;
        let mut max_error = f64::NEG_INFINITY;
        for (feature, error) in candidates.iter().zip(errors) {
            if let Some(error) = error {
                if best.map_or(true, |(_, b)| error < b) {
                    best = Some((*feature, error));
                }
                if error > max_error {
                    max_error = error;
                }
            }
        }

        let (split_feature, min_error) = match best {
            Some(b) => b,
            None => return Ok(LogitTreeNode::intercept_leaf(mean_target)),
        };
        if min_error == 0.0 || min_error == max_error {
            return Ok(LogitTreeNode::intercept_leaf(mean_target));
        }
        debug!(
            "Splitting {} samples on {} with squared error {} at remaining depth {}.",
            samples.len(),
            features.display_name(split_feature),
            min_error,
            depth
        );

        used.mark(split_feature);
        let (true_samples, false_samples): (Vec<&TrainingPair>, Vec<&TrainingPair>) = samples
            .into_iter()
            .partition(|s| s.feature_vector.is_active(split_feature));

        let (true_node, false_node) = if self.parallel {
            let false_used = used.clone();
            rayon::join(
                || self.build_node(features, true_samples, used, depth - 1, min_samples_per_leaf),
                || self.build_node(features, false_samples, false_used, depth - 1, min_samples_per_leaf),
            )
        } else {
            (
                self.build_node(features, true_samples, used.clone(), depth - 1, min_samples_per_leaf),
                self.build_node(features, false_samples, used, depth - 1, min_samples_per_leaf),
            )
        };

        Ok(LogitTreeNode::decision(split_feature, true_node?, false_node?))
    }
}

/// Summed squared error of the targets around their branch mean when
/// splitting on `feature`, or `None` if either branch is too small.
fn split_error(samples: &[&TrainingPair], feature: FeatureRef, min_samples_per_leaf: usize) -> Option<f64> {
    let mut true_sum = 0.0_f64;
    let mut false_sum = 0.0_f64;
    let mut true_count = 0_usize;
    let mut false_count = 0_usize;
    for s in samples {
        if s.feature_vector.is_active(feature) {
            true_sum += f64::from(s.target);
            true_count += 1;
        } else {
            false_sum += f64::from(s.target);
            false_count += 1;
        }
    }
    if true_count < min_samples_per_leaf || false_count < min_samples_per_leaf {
        return None;
    }

    let true_mean = true_sum / true_count as f64;
    let false_mean = false_sum / false_count as f64;
    let error = samples
        .iter()
        .map(|s| {
            let m = if s.feature_vector.is_active(feature) {
                true_mean
            } else {
                false_mean
            };
            let d = f64::from(s.target) - m;
            d * d
        })
        .sum();
    Some(error)
}

/// Learn a logit tree from experience, evaluating sequentially.
pub fn build_tree<C, B>(
    features: &C,
    oracle: &WeightVector,
    buffer: &B,
    max_depth: usize,
    min_samples_per_leaf: usize,
) -> Result<LogitTreeNode, LogitTreeError>
where
    C: FeatureCatalogue,
    B: ExperienceBuffer + ?Sized,
{
    ExperienceTreeLearner::new().build(features, oracle, buffer, max_depth, min_samples_per_leaf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experience::RecordedSample;
    use crate::features::{Feature, FeatureSet};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::cell::Cell;

    fn feature_set() -> FeatureSet {
        FeatureSet::new(
            vec![Feature::intercept(), Feature::aspatial("PassMove")],
            vec![Feature::spatial("S0"), Feature::spatial("S1")],
        )
    }

    /// Two moves per sample: one spatial move with S0 active, one plain move.
    fn buffer(fs: &FeatureSet, n: usize) -> Vec<RecordedSample> {
        (0..n)
            .map(|i| {
                let second = if i % 2 == 0 { vec![1] } else { vec![] };
                RecordedSample::new(vec![fs.feature_vector(&[], &[0]), fs.feature_vector(&[], &second)])
            })
            .collect()
    }

    struct CountingSample {
        calls: Cell<usize>,
        fv: FeatureVector,
    }

    impl Sample for CountingSample {
        fn num_moves(&self) -> usize {
            2
        }

        fn generate_feature_vectors<C: FeatureCatalogue>(&self, _features: &C) -> Vec<FeatureVector> {
            self.calls.set(self.calls.get() + 1);
            vec![self.fv.clone(), self.fv.clone()]
        }
    }

    #[test]
    fn test_invalid_min_samples() {
        let fs = feature_set();
        let sample = CountingSample {
            calls: Cell::new(0),
            fv: fs.feature_vector(&[], &[]),
        };
        let samples = vec![sample];
        let err = build_tree(&fs, &WeightVector::new(vec![0.0; 4]), &samples, 3, 0).unwrap_err();
        assert!(matches!(err, LogitTreeError::InvalidParameter(..)));
        assert_eq!(samples[0].calls.get(), 0);
    }

    #[test]
    fn test_invalid_min_samples_in_recursion() {
        let fs = feature_set();
        let used = UsedFeatures {
            aspatial: vec![true, false],
            spatial: vec![false, false],
        };
        let result = ExperienceTreeLearner::new().build_node(&fs, Vec::new(), used, 2, 0);
        assert!(matches!(result, Err(LogitTreeError::InvalidParameter(..))));
    }

    #[test]
    fn test_misaligned_oracle() {
        let fs = feature_set();
        let err = build_tree(&fs, &WeightVector::new(vec![1.0]), &buffer(&fs, 4), 3, 1).unwrap_err();
        assert!(matches!(err, LogitTreeError::MisalignedWeights { expected: 4, found: 1 }));
    }

    #[test]
    fn test_empty_buffer() {
        let fs = feature_set();
        let samples: Vec<RecordedSample> = Vec::new();
        let tree = build_tree(&fs, &WeightVector::new(vec![1.0, 2.0, 3.0, 4.0]), &samples, 3, 1).unwrap();
        assert_eq!(tree, LogitTreeNode::intercept_leaf(0.0));
    }

    #[test]
    fn test_single_move_samples_are_skipped() {
        let fs = feature_set();
        let samples = vec![
            RecordedSample::new(vec![fs.feature_vector(&[], &[0])]),
            RecordedSample::new(vec![]),
        ];
        let tree = build_tree(&fs, &WeightVector::new(vec![1.0, 2.0, 3.0, 4.0]), &samples[..], 3, 1).unwrap();
        assert_eq!(tree, LogitTreeNode::intercept_leaf(0.0));
    }

    #[test]
    fn test_depth_zero_is_mean() {
        let fs = feature_set();
        let wv = WeightVector::new(vec![1.0, 0.0, 2.0, 4.0]);
        let tree = build_tree(&fs, &wv, &buffer(&fs, 4), 0, 1).unwrap();
        // Targets: 3, 5, 3, 1, 3, 5, 3, 1.
        assert_eq!(tree, LogitTreeNode::intercept_leaf(3.0));
    }

    #[test]
    fn test_learns_split() {
        let fs = feature_set();
        let wv = WeightVector::new(vec![1.0, 0.0, 2.0, 4.0]);
        let tree = build_tree(&fs, &wv, &buffer(&fs, 4), 1, 1).unwrap();
        // S1 separates {5, 5} from {3, 3, 3, 1, 3, 1}; S0 separates
        // {3, 3, 3, 3} from {5, 1, 5, 1}. S1 leaves less squared error.
        assert_eq!(
            tree,
            LogitTreeNode::decision(
                FeatureRef::Spatial(1),
                LogitTreeNode::intercept_leaf(5.0),
                LogitTreeNode::intercept_leaf(14.0 / 6.0),
            )
        );
    }

    #[test]
    fn test_min_samples_blocks_split() {
        let fs = feature_set();
        let wv = WeightVector::new(vec![1.0, 0.0, 2.0, 4.0]);
        // S1 only has two active samples and S0 is then the sole candidate,
        // so the best and worst errors coincide.
        let tree = build_tree(&fs, &wv, &buffer(&fs, 4), 2, 3).unwrap();
        assert_eq!(tree, LogitTreeNode::intercept_leaf(3.0));
    }

    #[test]
    fn test_no_reuse_of_features_on_path() {
        let mut rng = StdRng::seed_from_u64(3);
        let fs = FeatureSet::new(
            vec![Feature::intercept(), Feature::aspatial("A0"), Feature::aspatial("A1")],
            (0..4).map(|i| Feature::spatial(&format!("S{}", i))).collect(),
        );
        let wv = WeightVector::new((0..fs.num_features()).map(|_| rng.gen_range(-2.0..2.0)).collect());
        let samples: Vec<RecordedSample> = (0..200)
            .map(|_| {
                let moves = (0..3)
                    .map(|_| {
                        if rng.gen_bool(0.3) {
                            let a: Vec<usize> = (1..3).filter(|_| rng.gen_bool(0.5)).collect();
                            fs.feature_vector(&a, &[])
                        } else {
                            let s: Vec<usize> = (0..4).filter(|_| rng.gen_bool(0.5)).collect();
                            fs.feature_vector(&[], &s)
                        }
                    })
                    .collect();
                RecordedSample::new(moves)
            })
            .collect();

        let tree = build_tree(&fs, &wv, &samples, 6, 2).unwrap();
        assert!(tree.depth() <= 6);
        fn check(node: &LogitTreeNode, path: &mut Vec<FeatureRef>) {
            match node {
                LogitTreeNode::DecisionNode {
                    feature,
                    true_node,
                    false_node,
                } => {
                    assert!(!path.contains(feature));
                    assert_ne!(*feature, FeatureRef::Aspatial(0));
                    path.push(*feature);
                    check(true_node, path);
                    check(false_node, path);
                    path.pop();
                }
                LogitTreeNode::ModelLeaf { features } => {
                    assert_eq!(features.len(), 1);
                    assert_eq!(features[0].0, FeatureRef::Intercept);
                }
            }
        }
        check(&tree, &mut Vec::new());

        let parallel = ExperienceTreeLearner::new()
            .set_parallel(true)
            .build(&fs, &wv, &samples, 6, 2)
            .unwrap();
        assert_eq!(tree, parallel);
    }
}
