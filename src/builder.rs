//! Builder
//!
//! Entry point that runs either tree builder with a [`TreeConfig`].
use crate::config::TreeConfig;
use crate::errors::LogitTreeError;
use crate::exact::ExactTreeBuilder;
use crate::experience::ExperienceBuffer;
use crate::features::{FeatureCatalogue, WeightVector};
use crate::learner::ExperienceTreeLearner;
use crate::node::LogitTreeNode;
use crate::splitter::{AbsorptionScorer, MaxAbsScorer, SplitRule};

/// Builds logit trees according to a [`TreeConfig`].
#[derive(Clone, Debug, Default)]
pub struct LogitTreeBuilder {
    pub cfg: TreeConfig,
}

impl LogitTreeBuilder {
    pub fn new(cfg: TreeConfig) -> Self {
        LogitTreeBuilder { cfg }
    }

    /// Compile a linear function into a tree.
    ///
    /// * `features` - Feature catalogue the weights are aligned to.
    /// * `weights` - One weight per feature, aspatial then spatial.
    pub fn build_exact<C: FeatureCatalogue>(
        &self,
        features: &C,
        weights: &WeightVector,
    ) -> Result<LogitTreeNode, LogitTreeError> {
        match self.cfg.split_rule {
            SplitRule::Absorption => ExactTreeBuilder::new(AbsorptionScorer)
                .set_parallel(self.cfg.parallel)
                .build(features, weights, self.cfg.max_depth),
            SplitRule::MaxAbs => ExactTreeBuilder::new(MaxAbsScorer)
                .set_parallel(self.cfg.parallel)
                .build(features, weights, self.cfg.max_depth),
        }
    }

    /// Learn a tree from recorded experience, regressing on the oracle's logits.
    ///
    /// * `features` - Feature catalogue used to generate feature vectors.
    /// * `oracle` - Linear function providing the targets.
    /// * `buffer` - Recorded samples.
    pub fn build_from_experience<C, B>(
        &self,
        features: &C,
        oracle: &WeightVector,
        buffer: &B,
    ) -> Result<LogitTreeNode, LogitTreeError>
    where
        C: FeatureCatalogue,
        B: ExperienceBuffer + ?Sized,
    {
        ExperienceTreeLearner::new().set_parallel(self.cfg.parallel).build(
            features,
            oracle,
            buffer,
            self.cfg.max_depth,
            self.cfg.min_samples_per_leaf,
        )
    }
}
