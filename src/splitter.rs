//! Split scoring for the exact tree builder.
//!
//! A candidate's branch score is the absolute weight that would still be
//! undecided in that branch after splitting on it. Lower is better.
use crate::features::{FeatureCatalogue, FeatureRef};
use crate::utils::fast_f64_abs_sum;
use serde::{Deserialize, Serialize};

/// Features still undecided at a node, as `(catalogue index, weight)`
/// pairs in catalogue order. Intercepts are never present.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemainingFeatures {
    pub aspatial: Vec<(usize, f32)>,
    pub spatial: Vec<(usize, f32)>,
}

impl RemainingFeatures {
    pub fn is_empty(&self) -> bool {
        self.aspatial.is_empty() && self.spatial.is_empty()
    }

    pub fn len(&self) -> usize {
        self.aspatial.len() + self.spatial.len()
    }

    /// All remaining weights as feature references.
    pub fn weighted_features(&self) -> impl Iterator<Item = (FeatureRef, f32)> + '_ {
        self.aspatial
            .iter()
            .map(|(i, w)| (FeatureRef::Aspatial(*i), *w))
            .chain(self.spatial.iter().map(|(i, w)| (FeatureRef::Spatial(*i), *w)))
    }

    pub fn abs_totals(&self) -> AbsTotals {
        let aspatial = fast_f64_abs_sum(self.aspatial.iter().map(|(_, w)| *w));
        let spatial = fast_f64_abs_sum(self.spatial.iter().map(|(_, w)| *w));
        AbsTotals {
            total: aspatial + spatial,
            aspatial,
            spatial,
        }
    }
}

/// Sums of absolute remaining weights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AbsTotals {
    pub total: f32,
    pub aspatial: f32,
    pub spatial: f32,
}

/// Undecided weight left in each branch of a candidate split.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BranchScores {
    pub false_score: f32,
    pub true_score: f32,
}

impl BranchScores {
    pub fn score(&self) -> f32 {
        (self.false_score + self.true_score) / 2.0
    }
}

/// The winning candidate at a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredSplit {
    pub feature: FeatureRef,
    pub weight: f32,
    pub score: f32,
}

/// Which scoring rule the exact builder uses.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SplitRule {
    /// Accounts for every weight a split decides, including the other
    /// category and generalized features.
    Absorption,
    /// Only accounts for the candidate's own weight.
    MaxAbs,
}

/// Trait for scoring candidate splits.
pub trait SplitScorer: Sync {
    /// Branch scores for the aspatial candidate at `position` in `remaining.aspatial`.
    fn aspatial_scores(&self, remaining: &RemainingFeatures, totals: &AbsTotals, position: usize) -> BranchScores;

    /// Branch scores for the spatial candidate at `position` in `remaining.spatial`.
    fn spatial_scores<C: FeatureCatalogue>(
        &self,
        features: &C,
        remaining: &RemainingFeatures,
        totals: &AbsTotals,
        position: usize,
    ) -> BranchScores;

    /// Score every candidate, aspatial first, each in catalogue order.
    fn score_candidates<C: FeatureCatalogue>(
        &self,
        features: &C,
        remaining: &RemainingFeatures,
    ) -> Vec<(FeatureRef, f32, BranchScores)> {
        let totals = remaining.abs_totals();
        let aspatial = remaining
            .aspatial
            .iter()
            .enumerate()
            .map(|(pos, (i, w))| (FeatureRef::Aspatial(*i), *w, self.aspatial_scores(remaining, &totals, pos)));
        let spatial = remaining.spatial.iter().enumerate().map(|(pos, (i, w))| {
            (
                FeatureRef::Spatial(*i),
                *w,
                self.spatial_scores(features, remaining, &totals, pos),
            )
        });
        aspatial.chain(spatial).collect()
    }

    /// Lowest scoring candidate; ties keep the first one encountered.
    fn best_split<C: FeatureCatalogue>(&self, features: &C, remaining: &RemainingFeatures) -> Option<ScoredSplit> {
        let mut best: Option<ScoredSplit> = None;
        for (feature, weight, scores) in self.score_candidates(features, remaining) {
            let score = scores.score();
            if best.map_or(true, |b| score < b.score) {
                best = Some(ScoredSplit { feature, weight, score });
            }
        }
        best
    }
}

/// Scorer that guarantees nothing about the split beyond its own weight.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaxAbsScorer;

impl SplitScorer for MaxAbsScorer {
    fn aspatial_scores(&self, remaining: &RemainingFeatures, totals: &AbsTotals, position: usize) -> BranchScores {
        let score = totals.total - remaining.aspatial[position].1.abs();
        BranchScores {
            false_score: score,
            true_score: score,
        }
    }

    fn spatial_scores<C: FeatureCatalogue>(
        &self,
        _features: &C,
        remaining: &RemainingFeatures,
        totals: &AbsTotals,
        position: usize,
    ) -> BranchScores {
        let score = totals.total - remaining.spatial[position].1.abs();
        BranchScores {
            false_score: score,
            true_score: score,
        }
    }
}

/// Scorer that credits a split with every weight it decides.
///
/// An active aspatial feature turns all spatial features off and vice versa,
/// an active spatial feature turns on everything that generalizes it, and an
/// inactive one turns off everything it generalizes.
#[derive(Clone, Copy, Debug, Default)]
pub struct AbsorptionScorer;

impl SplitScorer for AbsorptionScorer {
    fn aspatial_scores(&self, remaining: &RemainingFeatures, totals: &AbsTotals, position: usize) -> BranchScores {
        let own = remaining.aspatial[position].1.abs();
        BranchScores {
            false_score: totals.total - own,
            true_score: totals.total - own - totals.spatial,
        }
    }

    fn spatial_scores<C: FeatureCatalogue>(
        &self,
        features: &C,
        remaining: &RemainingFeatures,
        totals: &AbsTotals,
        position: usize,
    ) -> BranchScores {
        let (s, w) = remaining.spatial[position];
        let own = w.abs();
        let mut false_score = totals.total - own;
        let mut true_score = totals.total - own - totals.aspatial;
        for (j, wj) in remaining.spatial.iter() {
            if *j == s {
                continue;
            }
            if features.generalizes(*j, s) {
                true_score -= wj.abs();
            } else if features.generalizes(s, *j) {
                false_score -= wj.abs();
            }
        }
        BranchScores {
            false_score,
            true_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{Feature, FeatureSet};

    fn chain() -> (FeatureSet, RemainingFeatures) {
        // s0 generalizes s1, s1 generalizes s2.
        let fs = FeatureSet::new(
            vec![Feature::intercept(), Feature::aspatial("SwapMove")],
            vec![Feature::spatial("s0"), Feature::spatial("s1"), Feature::spatial("s2")],
        )
        .with_generalization(0, 1)
        .with_generalization(1, 2)
        .with_generalization(0, 2);
        let remaining = RemainingFeatures {
            aspatial: vec![(1, 4.0)],
            spatial: vec![(0, 1.0), (1, -2.0), (2, 3.0)],
        };
        (fs, remaining)
    }

    #[test]
    fn test_abs_totals() {
        let (_, remaining) = chain();
        let totals = remaining.abs_totals();
        assert_eq!(totals.total, 10.0);
        assert_eq!(totals.aspatial, 4.0);
        assert_eq!(totals.spatial, 6.0);
        assert_eq!(remaining.len(), 4);
    }

    #[test]
    fn test_abs_totals_many_features() {
        let remaining = RemainingFeatures {
            aspatial: (0..20).map(|i| (i, if i % 2 == 0 { 1.0 } else { -1.0 })).collect(),
            spatial: (0..33).map(|i| (i, -0.5)).collect(),
        };
        let totals = remaining.abs_totals();
        assert_eq!(totals.aspatial, 20.0);
        assert_eq!(totals.spatial, 16.5);
        assert_eq!(totals.total, 36.5);
        assert_eq!(RemainingFeatures::default().abs_totals().total, 0.0);
    }

    #[test]
    fn test_absorption_scores() {
        let (fs, remaining) = chain();
        let scores = AbsorptionScorer.score_candidates(&fs, &remaining);
        // Aspatial: false 10 - 4, true 10 - 4 - 6.
        assert_eq!(scores[0].2, BranchScores { false_score: 6.0, true_score: 0.0 });
        // s0: false absorbs s1 and s2, true absorbs the aspatial weight.
        assert_eq!(scores[1].2, BranchScores { false_score: 4.0, true_score: 5.0 });
        // s1: false absorbs s2, true absorbs aspatial and s0.
        assert_eq!(scores[2].2, BranchScores { false_score: 5.0, true_score: 3.0 });
        // s2: true absorbs aspatial, s0 and s1.
        assert_eq!(scores[3].2, BranchScores { false_score: 7.0, true_score: 0.0 });

        let best = AbsorptionScorer.best_split(&fs, &remaining).unwrap();
        assert_eq!(best.feature, FeatureRef::Aspatial(1));
        assert_eq!(best.score, 3.0);
    }

    #[test]
    fn test_max_abs_picks_largest_weight() {
        let (fs, remaining) = chain();
        let best = MaxAbsScorer.best_split(&fs, &remaining).unwrap();
        assert_eq!(best.feature, FeatureRef::Aspatial(1));
        assert_eq!(best.weight, 4.0);
        assert_eq!(best.score, 6.0);
    }

    #[test]
    fn test_scorers_disagree_with_generalization() {
        let (fs, remaining) = chain();
        let exact = AbsorptionScorer.score_candidates(&fs, &remaining);
        let naive = MaxAbsScorer.score_candidates(&fs, &remaining);
        assert_eq!(exact.len(), naive.len());
        assert!(exact.iter().zip(naive.iter()).any(|(e, n)| e.2.score() != n.2.score()));
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let fs = FeatureSet::new(vec![], vec![Feature::spatial("a"), Feature::spatial("b")]);
        let remaining = RemainingFeatures {
            aspatial: vec![],
            spatial: vec![(0, 2.0), (1, -2.0)],
        };
        let best = AbsorptionScorer.best_split(&fs, &remaining).unwrap();
        assert_eq!(best.feature, FeatureRef::Spatial(0));
        assert!(AbsorptionScorer.best_split(&fs, &RemainingFeatures::default()).is_none());
    }
}
