//! Export
//!
//! Conversion of a built tree into the `If` / `Leaf` form consumed outside
//! this crate, with features identified by their display strings.
use crate::config::TreeIO;
use crate::features::FeatureCatalogue;
use crate::node::LogitTreeNode;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Write};

/// Serialisable logit tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExportNode {
    If {
        feature: String,
        true_node: Box<ExportNode>,
        false_node: Box<ExportNode>,
    },
    Leaf {
        features: Vec<(String, f32)>,
    },
}

impl TreeIO for ExportNode {}

impl LogitTreeNode {
    /// Convert to the export form, naming features through `features`.
    pub fn to_export<C: FeatureCatalogue>(&self, features: &C) -> ExportNode {
        match self {
            LogitTreeNode::DecisionNode {
                feature,
                true_node,
                false_node,
            } => ExportNode::If {
                feature: features.display_name(*feature),
                true_node: Box::new(true_node.to_export(features)),
                false_node: Box::new(false_node.to_export(features)),
            },
            LogitTreeNode::ModelLeaf { features: weights } => ExportNode::Leaf {
                features: weights.iter().map(|(f, w)| (features.display_name(*f), *w)).collect(),
            },
        }
    }
}

impl ExportNode {
    fn write_metadata<W: Write>(&self, out: &mut W, depth: usize) -> fmt::Result {
        match self {
            ExportNode::If {
                feature,
                true_node,
                false_node,
            } => {
                let indent = "    ".repeat(depth + 1);
                write!(out, "(if {:?}\n{}then:", feature, indent)?;
                true_node.write_metadata(out, depth + 1)?;
                write!(out, "\n{}else:", indent)?;
                false_node.write_metadata(out, depth + 1)?;
                write!(out, "\n{})", "    ".repeat(depth))
            }
            ExportNode::Leaf { features } => {
                out.write_str("(leaf {")?;
                for (name, weight) in features {
                    write!(out, " (pair {:?} {:?})", name, weight)?;
                }
                out.write_str(" })")
            }
        }
    }
}

impl Display for ExportNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_metadata(f, 0)
    }
}
