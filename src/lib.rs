// Modules
pub mod builder;
pub mod config;
pub mod constants;
pub mod errors;
pub mod exact;
pub mod experience;
pub mod export;
pub mod features;
pub mod learner;
pub mod node;
pub mod splitter;
pub mod utils;

// Individual classes, and functions
pub use builder::LogitTreeBuilder;
pub use config::{TreeConfig, TreeIO};
pub use errors::LogitTreeError;
pub use export::ExportNode;
pub use features::{Feature, FeatureCatalogue, FeatureKind, FeatureRef, FeatureSet, FeatureVector, WeightVector};
pub use node::LogitTreeNode;
