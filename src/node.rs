use crate::constants::RENDER_INDENT;
use crate::features::{FeatureRef, FeatureVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::max;
use std::fmt::{self, Display};

/// A node of a logit tree.
///
/// Decision nodes own both children outright, so a tree is a plain
/// recursive value with no sharing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LogitTreeNode {
    /// Tests one feature and descends into the matching child.
    DecisionNode {
        feature: FeatureRef,
        true_node: Box<LogitTreeNode>,
        false_node: Box<LogitTreeNode>,
    },
    /// Residual linear model. The first entry is always the intercept.
    ModelLeaf { features: Vec<(FeatureRef, f32)> },
}

impl LogitTreeNode {
    pub fn decision(feature: FeatureRef, true_node: LogitTreeNode, false_node: LogitTreeNode) -> Self {
        LogitTreeNode::DecisionNode {
            feature,
            true_node: Box::new(true_node),
            false_node: Box::new(false_node),
        }
    }

    /// Leaf holding only a bias.
    pub fn intercept_leaf(intercept: f32) -> Self {
        LogitTreeNode::ModelLeaf {
            features: vec![(FeatureRef::Intercept, intercept)],
        }
    }

    /// Leaf holding a bias followed by the given residual weights.
    pub fn leaf<I>(intercept: f32, residual: I) -> Self
    where
        I: IntoIterator<Item = (FeatureRef, f32)>,
    {
        let mut features = vec![(FeatureRef::Intercept, intercept)];
        features.extend(residual);
        LogitTreeNode::ModelLeaf { features }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, LogitTreeNode::ModelLeaf { .. })
    }

    /// Descend to the leaf selected by the feature vector.
    pub fn leaf_for(&self, fv: &FeatureVector) -> &[(FeatureRef, f32)] {
        let mut node = self;
        loop {
            match node {
                LogitTreeNode::ModelLeaf { features } => return features,
                LogitTreeNode::DecisionNode {
                    feature,
                    true_node,
                    false_node,
                } => {
                    node = if fv.is_active(*feature) {
                        true_node.as_ref()
                    } else {
                        false_node.as_ref()
                    };
                }
            }
        }
    }

    /// Logit for a single feature vector.
    pub fn evaluate(&self, fv: &FeatureVector) -> f32 {
        let logit: f64 = self
            .leaf_for(fv)
            .iter()
            .map(|(f, w)| f64::from(*w) * f64::from(fv.value(*f)))
            .sum();
        logit as f32
    }

    fn predict_single_threaded(&self, data: &[FeatureVector]) -> Vec<f32> {
        data.iter().map(|fv| self.evaluate(fv)).collect()
    }

    fn predict_parallel(&self, data: &[FeatureVector]) -> Vec<f32> {
        data.par_iter().map(|fv| self.evaluate(fv)).collect()
    }

    pub fn predict(&self, data: &[FeatureVector], parallel: bool) -> Vec<f32> {
        if parallel {
            self.predict_parallel(data)
        } else {
            self.predict_single_threaded(data)
        }
    }

    /// Length of the longest root to leaf path, counted in decision nodes.
    pub fn depth(&self) -> usize {
        match self {
            LogitTreeNode::ModelLeaf { .. } => 0,
            LogitTreeNode::DecisionNode {
                true_node, false_node, ..
            } => 1 + max(true_node.depth(), false_node.depth()),
        }
    }

    pub fn num_leaves(&self) -> usize {
        match self {
            LogitTreeNode::ModelLeaf { .. } => 1,
            LogitTreeNode::DecisionNode {
                true_node, false_node, ..
            } => true_node.num_leaves() + false_node.num_leaves(),
        }
    }

    pub fn num_decision_nodes(&self) -> usize {
        match self {
            LogitTreeNode::ModelLeaf { .. } => 0,
            LogitTreeNode::DecisionNode {
                true_node, false_node, ..
            } => 1 + true_node.num_decision_nodes() + false_node.num_decision_nodes(),
        }
    }

    /// Split features in pre-order, true branch first.
    pub fn split_features(&self) -> Vec<FeatureRef> {
        let mut features = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let LogitTreeNode::DecisionNode {
                feature,
                true_node,
                false_node,
            } = node
            {
                features.push(*feature);
                stack.push(false_node.as_ref());
                stack.push(true_node.as_ref());
            }
        }
        features
    }
}

impl Display for FeatureRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FeatureRef::Intercept => write!(f, "intercept"),
            FeatureRef::Aspatial(i) => write!(f, "a{}", i),
            FeatureRef::Spatial(i) => write!(f, "s{}", i),
        }
    }
}

impl Display for LogitTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut print_buffer: Vec<(&LogitTreeNode, usize, &str)> = vec![(self, 0, "root")];
        let mut r = String::new();
        while let Some((node, depth, branch)) = print_buffer.pop() {
            let indent = RENDER_INDENT.repeat(depth);
            match node {
                LogitTreeNode::ModelLeaf { features } => {
                    let weights: Vec<String> = features.iter().map(|(f, w)| format!("{}={}", f, w)).collect();
                    r += format!("{}{}:leaf[{}]\n", indent, branch, weights.join(",")).as_str();
                }
                LogitTreeNode::DecisionNode {
                    feature,
                    true_node,
                    false_node,
                } => {
                    r += format!("{}{}:[{}]\n", indent, branch, feature).as_str();
                    print_buffer.push((false_node.as_ref(), depth + 1, "no"));
                    print_buffer.push((true_node.as_ref(), depth + 1, "yes"));
                }
            }
        }
        write!(f, "{}", r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_tree() -> LogitTreeNode {
        LogitTreeNode::decision(
            FeatureRef::Spatial(0),
            LogitTreeNode::intercept_leaf(5.0),
            LogitTreeNode::decision(
                FeatureRef::Aspatial(1),
                LogitTreeNode::intercept_leaf(1.0),
                LogitTreeNode::leaf(2.0, vec![(FeatureRef::Spatial(1), -1.0)]),
            ),
        )
    }

    #[test]
    fn test_structure() {
        let tree = small_tree();
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.num_leaves(), 3);
        assert_eq!(tree.num_decision_nodes(), 2);
        assert_eq!(tree.split_features(), vec![FeatureRef::Spatial(0), FeatureRef::Aspatial(1)]);
        assert!(!tree.is_leaf());
        assert_eq!(LogitTreeNode::intercept_leaf(0.0).depth(), 0);
    }

    #[test]
    fn test_evaluate() {
        let tree = small_tree();
        let s0 = FeatureVector::new(vec![1.0, 0.0], vec![0]);
        let a1 = FeatureVector::new(vec![1.0, 1.0], vec![]);
        let s1 = FeatureVector::new(vec![1.0, 0.0], vec![1]);
        let none = FeatureVector::new(vec![1.0, 0.0], vec![]);
        assert_eq!(tree.evaluate(&s0), 5.0);
        assert_eq!(tree.evaluate(&a1), 1.0);
        assert_eq!(tree.evaluate(&s1), 1.0);
        assert_eq!(tree.evaluate(&none), 2.0);

        let data = vec![s0, a1, s1, none];
        assert_eq!(tree.predict(&data, false), vec![5.0, 1.0, 1.0, 2.0]);
        assert_eq!(tree.predict(&data, true), tree.predict(&data, false));
    }

    #[test]
    fn test_display() {
        let rendered = format!("{}", small_tree());
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "root:[s0]");
        assert!(lines[1].trim_start().starts_with("yes:leaf[intercept=5]"));
        assert!(lines[4].trim_start().starts_with("no:leaf[intercept=2,s1=-1]"));
    }
}
