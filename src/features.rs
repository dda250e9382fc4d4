//! Features
//!
//! The feature catalogue, activation vectors, and weight vectors that the
//! tree builders consume. Feature extraction and the computation of the
//! generalization relation live outside this crate; [`FeatureCatalogue`] is
//! the seam through which they are supplied.
use crate::constants::INTERCEPT_NAME;
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Category of a feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Independent of board geometry.
    Aspatial,
    /// Tied to a local board pattern.
    Spatial,
    /// Always-active bias term, stored in the aspatial list.
    Intercept,
}

/// A boolean indicator feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub kind: FeatureKind,
}

impl Feature {
    pub fn aspatial(name: &str) -> Self {
        Feature {
            name: name.to_string(),
            kind: FeatureKind::Aspatial,
        }
    }

    pub fn spatial(name: &str) -> Self {
        Feature {
            name: name.to_string(),
            kind: FeatureKind::Spatial,
        }
    }

    pub fn intercept() -> Self {
        Feature {
            name: INTERCEPT_NAME.to_string(),
            kind: FeatureKind::Intercept,
        }
    }

    pub fn is_intercept(&self) -> bool {
        self.kind == FeatureKind::Intercept
    }
}

impl Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Reference to a feature by its position in the catalogue.
///
/// Trees never own features, they point back into the catalogue they
/// were built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureRef {
    /// The folded bias of a leaf.
    Intercept,
    /// Index into the aspatial feature list.
    Aspatial(usize),
    /// Index into the spatial feature list.
    Spatial(usize),
}

/// Ordered catalogue of aspatial and spatial features.
pub trait FeatureCatalogue: Sync {
    /// Aspatial features, in catalogue order (intercepts included).
    fn aspatial_features(&self) -> &[Feature];
    /// Spatial features, in catalogue order.
    fn spatial_features(&self) -> &[Feature];
    /// Whether spatial feature `general` generalizes spatial feature `specific`,
    /// that is, `specific` being active implies `general` is active.
    fn generalizes(&self, general: usize, specific: usize) -> bool;

    /// Total number of features, aspatial then spatial.
    fn num_features(&self) -> usize {
        self.aspatial_features().len() + self.spatial_features().len()
    }

    /// Human readable name for a feature reference.
    fn display_name(&self, feature: FeatureRef) -> String {
        match feature {
            FeatureRef::Intercept => INTERCEPT_NAME.to_string(),
            FeatureRef::Aspatial(i) => self
                .aspatial_features()
                .get(i)
                .map(|f| f.name.clone())
                .unwrap_or_else(|| format!("aspatial:{}", i)),
            FeatureRef::Spatial(i) => self
                .spatial_features()
                .get(i)
                .map(|f| f.name.clone())
                .unwrap_or_else(|| format!("spatial:{}", i)),
        }
    }
}

/// In-memory feature catalogue with an explicit generalization relation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FeatureSet {
    pub aspatial: Vec<Feature>,
    pub spatial: Vec<Feature>,
    /// Pairs of `(general, specific)` spatial indices.
    generalizations: HashSet<(usize, usize)>,
}

impl FeatureSet {
    pub fn new(aspatial: Vec<Feature>, spatial: Vec<Feature>) -> Self {
        FeatureSet {
            aspatial,
            spatial,
            generalizations: HashSet::new(),
        }
    }

    /// Record that spatial feature `general` generalizes `specific`.
    /// The relation is taken as given; no transitive closure is computed.
    pub fn add_generalization(&mut self, general: usize, specific: usize) {
        self.generalizations.insert((general, specific));
    }

    pub fn with_generalization(mut self, general: usize, specific: usize) -> Self {
        self.add_generalization(general, specific);
        self
    }

    /// Build an activation vector for this catalogue. Intercept features are
    /// always set, regardless of `active_aspatial`.
    pub fn feature_vector(&self, active_aspatial: &[usize], active_spatial: &[usize]) -> FeatureVector {
        let mut values = vec![0.0_f32; self.aspatial.len()];
        for (i, f) in self.aspatial.iter().enumerate() {
            if f.is_intercept() {
                values[i] = 1.0;
            }
        }
        for i in active_aspatial {
            if let Some(v) = values.get_mut(*i) {
                *v = 1.0;
            }
        }
        FeatureVector::new(values, active_spatial.to_vec())
    }
}

impl FeatureCatalogue for FeatureSet {
    fn aspatial_features(&self) -> &[Feature] {
        &self.aspatial
    }

    fn spatial_features(&self) -> &[Feature] {
        &self.spatial
    }

    fn generalizes(&self, general: usize, specific: usize) -> bool {
        general != specific && self.generalizations.contains(&(general, specific))
    }
}

/// Feature activations for a single state or move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    aspatial_values: Vec<f32>,
    /// Sorted, without duplicates.
    active_spatial: Vec<usize>,
}

impl FeatureVector {
    pub fn new(aspatial_values: Vec<f32>, mut active_spatial: Vec<usize>) -> Self {
        active_spatial.sort_unstable();
        active_spatial.dedup();
        FeatureVector {
            aspatial_values,
            active_spatial,
        }
    }

    pub fn aspatial_feature_values(&self) -> &[f32] {
        &self.aspatial_values
    }

    pub fn active_spatial_feature_indices(&self) -> &[usize] {
        &self.active_spatial
    }

    pub fn is_active(&self, feature: FeatureRef) -> bool {
        match feature {
            FeatureRef::Intercept => true,
            FeatureRef::Aspatial(i) => self.aspatial_values.get(i).is_some_and(|v| *v != 0.0),
            FeatureRef::Spatial(i) => self.active_spatial.binary_search(&i).is_ok(),
        }
    }

    /// Value a leaf multiplies its weight with.
    pub fn value(&self, feature: FeatureRef) -> f32 {
        match feature {
            FeatureRef::Intercept => 1.0,
            FeatureRef::Aspatial(i) => self.aspatial_values.get(i).copied().unwrap_or(0.0),
            FeatureRef::Spatial(_) => {
                if self.is_active(feature) {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// One weight per feature, aspatial weights first, then spatial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    weights: Vec<f32>,
}

impl WeightVector {
    pub fn new(weights: Vec<f32>) -> Self {
        WeightVector { weights }
    }

    pub fn all_weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Linear logit of a feature vector.
    ///
    /// * `num_aspatial` - Number of aspatial features, the offset of the spatial weights.
    pub fn dot(&self, fv: &FeatureVector, num_aspatial: usize) -> f32 {
        let aspatial: f64 = fv
            .aspatial_feature_values()
            .iter()
            .zip(self.weights.iter().take(num_aspatial))
            .map(|(v, w)| f64::from(*v) * f64::from(*w))
            .sum();
        let spatial: f64 = fv
            .active_spatial_feature_indices()
            .iter()
            .filter_map(|i| self.weights.get(num_aspatial + i))
            .map(|w| f64::from(*w))
            .sum();
        (aspatial + spatial) as f32
    }
}

impl From<Vec<f32>> for WeightVector {
    fn from(weights: Vec<f32>) -> Self {
        WeightVector::new(weights)
    }
}
