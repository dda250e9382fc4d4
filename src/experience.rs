//! Experience
//!
//! Recorded play experience, read once by the experience tree learner.
use crate::features::{FeatureCatalogue, FeatureVector};
use serde::{Deserialize, Serialize};

/// A single recorded decision point.
pub trait Sample {
    /// Number of moves that were available, only the count matters.
    fn num_moves(&self) -> usize;
    /// Feature vectors for the available moves.
    fn generate_feature_vectors<C: FeatureCatalogue>(&self, features: &C) -> Vec<FeatureVector>;
}

/// Source of recorded samples.
pub trait ExperienceBuffer {
    type Item: Sample;
    fn all_experience(&self) -> &[Self::Item];
}

/// A sample whose feature vectors were computed when it was recorded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedSample {
    pub feature_vectors: Vec<FeatureVector>,
}

impl RecordedSample {
    pub fn new(feature_vectors: Vec<FeatureVector>) -> Self {
        RecordedSample { feature_vectors }
    }
}

impl Sample for RecordedSample {
    fn num_moves(&self) -> usize {
        self.feature_vectors.len()
    }

    fn generate_feature_vectors<C: FeatureCatalogue>(&self, _features: &C) -> Vec<FeatureVector> {
        self.feature_vectors.clone()
    }
}

impl<S: Sample> ExperienceBuffer for Vec<S> {
    type Item = S;

    fn all_experience(&self) -> &[S] {
        self
    }
}

impl<S: Sample> ExperienceBuffer for [S] {
    type Item = S;

    fn all_experience(&self) -> &[S] {
        self
    }
}
