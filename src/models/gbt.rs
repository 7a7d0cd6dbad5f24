/// Gradient-boosted regression tree ensembles exported as JSON
///
/// Nodes of a tree are stored in one flat list with node 0 as the root and
/// children always after their parent. A split sends a sample left when its
/// feature value is below the threshold; missing values (NaN) follow
/// `default_left`.
use super::QualityModel;
use crate::BinqcError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default = "default_true")]
        default_left: bool,
    },
    Leaf {
        leaf: f64,
    },
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn predict(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { leaf } => return *leaf,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let value = features[*feature];
                    let go_left = if value.is_nan() {
                        *default_left
                    } else {
                        value < *threshold
                    };
                    index = if go_left { *left } else { *right };
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    #[serde(default)]
    pub base_score: f64,
    /// Expected input width; inferred from the splits when absent
    #[serde(default)]
    pub num_features: Option<usize>,
    pub trees: Vec<RegressionTree>,
}

impl GradientBoostedTrees {
    /// Check tree shape so prediction can index without bounds failures and
    /// always reaches a leaf.
    pub fn validate(&self) -> Result<(), BinqcError> {
        let mut widest = 0;
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(BinqcError::Model(format!("tree {} has no nodes", t)));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                if let TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } = node
                {
                    for child in [*left, *right] {
                        if child <= i || child >= tree.nodes.len() {
                            return Err(BinqcError::Model(format!(
                                "tree {} node {} points to invalid child {}",
                                t, i, child
                            )));
                        }
                    }
                    widest = widest.max(feature + 1);
                }
            }
        }

        if let Some(width) = self.num_features {
            if widest > width {
                return Err(BinqcError::Model(format!(
                    "trees split on feature {} but the model declares {} features",
                    widest - 1,
                    width
                )));
            }
        }
        Ok(())
    }

    fn required_width(&self) -> usize {
        self.num_features.unwrap_or_else(|| {
            self.trees
                .iter()
                .flat_map(|t| &t.nodes)
                .filter_map(|n| match n {
                    TreeNode::Split { feature, .. } => Some(feature + 1),
                    TreeNode::Leaf { .. } => None,
                })
                .max()
                .unwrap_or(0)
        })
    }
}

impl QualityModel for GradientBoostedTrees {
    fn input_width(&self) -> Option<usize> {
        self.num_features
    }

    fn predict(&self, features: &[f64]) -> Result<f64, BinqcError> {
        let width = self.required_width();
        if features.len() < width {
            return Err(BinqcError::Schema(format!(
                "tree ensemble needs {} features, got {}",
                width,
                features.len()
            )));
        }
        Ok(self.base_score + self.trees.iter().map(|t| t.predict(features)).sum::<f64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> GradientBoostedTrees {
        serde_json::from_str(
            r#"{
                "base_score": 50.0,
                "trees": [
                    {"nodes": [
                        {"feature": 0, "threshold": 10.0, "left": 1, "right": 2},
                        {"leaf": -5.0},
                        {"leaf": 5.0}
                    ]},
                    {"nodes": [
                        {"feature": 1, "threshold": 0.5, "left": 1, "right": 2, "default_left": false},
                        {"leaf": 1.0},
                        {"leaf": 2.0}
                    ]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_predict_sums_trees() {
        let model = model();
        model.validate().unwrap();
        assert_eq!(model.predict(&[3.0, 0.1]).unwrap(), 46.0);
        assert_eq!(model.predict(&[10.0, 0.9]).unwrap(), 57.0);
        // NaN follows the default branch
        assert_eq!(model.predict(&[f64::NAN, f64::NAN]).unwrap(), 47.0);
    }

    #[test]
    fn test_short_input_rejected() {
        assert!(matches!(model().predict(&[1.0]), Err(BinqcError::Schema(_))));
    }

    #[test]
    fn test_validate_rejects_backward_child() {
        let model = GradientBoostedTrees {
            base_score: 0.0,
            num_features: None,
            trees: vec![RegressionTree {
                nodes: vec![TreeNode::Split {
                    feature: 0,
                    threshold: 1.0,
                    left: 0,
                    right: 1,
                    default_left: true,
                }],
            }],
        };
        assert!(model.validate().is_err());
    }
}
