//! Configuration
//!
//! Serialisable settings for the tree builders, and the JSON IO shared by
//! configs and exported trees.
use crate::constants::{DEFAULT_MAX_DEPTH, DEFAULT_MIN_SAMPLES_PER_LEAF};
use crate::errors::LogitTreeError;
use crate::splitter::SplitRule;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}
fn default_min_samples_per_leaf() -> usize {
    DEFAULT_MIN_SAMPLES_PER_LEAF
}
fn default_split_rule() -> SplitRule {
    SplitRule::Absorption
}
fn default_parallel() -> bool {
    false
}

/// Configuration for [`crate::LogitTreeBuilder`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum number of decision nodes on any root to leaf path.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Minimum training pairs per branch when learning from experience.
    #[serde(default = "default_min_samples_per_leaf")]
    pub min_samples_per_leaf: usize,
    /// Split scoring for trees built from weights.
    #[serde(default = "default_split_rule")]
    pub split_rule: SplitRule,
    /// Use the rayon pool while building.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            min_samples_per_leaf: DEFAULT_MIN_SAMPLES_PER_LEAF,
            split_rule: SplitRule::Absorption,
            parallel: false,
        }
    }
}

impl TreeConfig {
    /// Set the maximum depth.
    /// * `max_depth` - Maximum number of decision nodes on any path, 0 builds a single leaf.
    pub fn set_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples on either side of a learned split.
    pub fn set_min_samples_per_leaf(mut self, min_samples_per_leaf: usize) -> Self {
        self.min_samples_per_leaf = min_samples_per_leaf;
        self
    }

    pub fn set_split_rule(mut self, split_rule: SplitRule) -> Self {
        self.split_rule = split_rule;
        self
    }

    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// IO
pub trait TreeIO: Serialize + DeserializeOwned + Sized {
    /// Save as a json object to a file.
    ///
    /// * `path` - Path to save to.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), LogitTreeError> {
        fs::write(path, self.json_dump()?).map_err(|e| LogitTreeError::UnableToWrite(e.to_string()))
    }

    /// Dump as a json string.
    fn json_dump(&self) -> Result<String, LogitTreeError> {
        serde_json::to_string(self).map_err(|e| LogitTreeError::UnableToWrite(e.to_string()))
    }

    /// Load from a json string.
    fn from_json(json_str: &str) -> Result<Self, LogitTreeError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| LogitTreeError::UnableToRead(e.to_string()))
    }

    /// Load from a path to a json file.
    ///
    /// * `path` - Path to load from.
    fn load<P: AsRef<Path>>(path: P) -> Result<Self, LogitTreeError> {
        let json_str = fs::read_to_string(path).map_err(|e| LogitTreeError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl TreeIO for TreeConfig {}
