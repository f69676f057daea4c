//! Gradient boosted tree ensembles exported by XGBoost
//!
//! Reads the JSON model format written by `Booster.save_model("model.json")`
//! and evaluates it the way XGBoost does: features and split thresholds are
//! compared in `f32`, `x < threshold` goes left and missing values follow the
//! node's default direction.

use serde::Deserialize;
use std::path::Path;

use crate::features::FeatureVector;
use crate::model::Regressor;
use crate::{CovidError, Result};

/// How the summed tree margin maps to the predicted value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Squared, absolute and pseudo-Huber regression
    Identity,
    /// Poisson, gamma and Tweedie regression
    Exp,
    /// Logistic regression
    Logistic,
}

impl Link {
    fn from_objective(name: &str) -> Result<Self> {
        match name {
            "reg:squarederror" | "reg:linear" | "reg:absoluteerror" | "reg:pseudohubererror"
            | "reg:squaredlogerror" | "reg:quantileerror" => Ok(Link::Identity),
            "count:poisson" | "reg:gamma" | "reg:tweedie" => Ok(Link::Exp),
            "reg:logistic" | "binary:logistic" => Ok(Link::Logistic),
            other => Err(CovidError::Model(format!(
                "Unsupported objective for a scalar regressor: {}",
                other
            ))),
        }
    }

    /// Convert an output-space base score into margin space
    fn base_margin(&self, base_score: f32) -> f32 {
        match self {
            Link::Identity => base_score,
            Link::Exp => base_score.ln(),
            Link::Logistic => (base_score / (1.0 - base_score)).ln(),
        }
    }

    fn apply(&self, margin: f32) -> f32 {
        match self {
            Link::Identity => margin,
            Link::Exp => margin.exp(),
            Link::Logistic => 1.0 / (1.0 + (-margin).exp()),
        }
    }
}

/// A single regression tree in array form
#[derive(Debug, Clone)]
pub struct Tree {
    left: Vec<i32>,
    right: Vec<i32>,
    split_index: Vec<u32>,
    /// Split threshold for internal nodes, leaf value for leaves
    split_condition: Vec<f32>,
    default_left: Vec<bool>,
}

impl Tree {
    fn from_json(tree: TreeJson, num_features: usize) -> Result<Self> {
        let n = tree.left_children.len();
        if n == 0 {
            return Err(CovidError::Model("Tree has no nodes".to_string()));
        }
        if tree.right_children.len() != n
            || tree.split_indices.len() != n
            || tree.split_conditions.len() != n
            || tree.default_left.len() != n
        {
            return Err(CovidError::Model(
                "Tree node arrays have inconsistent lengths".to_string(),
            ));
        }

        for i in 0..n {
            let (l, r) = (tree.left_children[i], tree.right_children[i]);
            if l == -1 {
                continue;
            }
            let in_range = |c: i32| c > i as i32 && (c as usize) < n;
            if !in_range(l) || !in_range(r) {
                return Err(CovidError::Model(format!(
                    "Node {} has invalid children ({}, {})",
                    i, l, r
                )));
            }
            if tree.split_indices[i] as usize >= num_features {
                return Err(CovidError::Model(format!(
                    "Node {} splits on feature {} but the model has {} features",
                    i, tree.split_indices[i], num_features
                )));
            }
        }

        Ok(Tree {
            left: tree.left_children,
            right: tree.right_children,
            split_index: tree.split_indices,
            split_condition: tree.split_conditions,
            default_left: tree.default_left.into_iter().map(|f| f.is_set()).collect(),
        })
    }

    /// Leaf value reached by `row`
    pub fn leaf_value(&self, row: &[f32]) -> f32 {
        let mut node = 0usize;
        // children always have a higher index than their parent
        while self.left[node] != -1 {
            let x = row[self.split_index[node] as usize];
            let go_left = if x.is_nan() {
                self.default_left[node]
            } else {
                x < self.split_condition[node]
            };
            node = if go_left {
                self.left[node] as usize
            } else {
                self.right[node] as usize
            };
        }
        self.split_condition[node]
    }
}

/// Fitted XGBoost regressor
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    trees: Vec<Tree>,
    base_margin: f32,
    link: Link,
    num_features: usize,
    feature_names: Vec<String>,
}

impl TreeEnsemble {
    /// Load a JSON model file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CovidError::ModelNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: ModelFile = serde_json::from_str(json)
            .map_err(|e| CovidError::Model(format!("Invalid XGBoost model: {}", e)))?;
        let learner = file.learner;

        if learner.gradient_booster.name != "gbtree" {
            return Err(CovidError::Model(format!(
                "Unsupported booster: {}",
                learner.gradient_booster.name
            )));
        }
        let model = learner
            .gradient_booster
            .model
            .ok_or_else(|| CovidError::Model("Booster has no tree model".to_string()))?;

        let num_features: usize = learner
            .learner_model_param
            .num_feature
            .parse()
            .map_err(|_| {
                CovidError::Model(format!(
                    "Invalid num_feature: {}",
                    learner.learner_model_param.num_feature
                ))
            })?;
        let base_score = parse_base_score(&learner.learner_model_param.base_score)?;
        let link = Link::from_objective(&learner.objective.name)?;

        let trees = model
            .trees
            .into_iter()
            .map(|t| Tree::from_json(t, num_features))
            .collect::<Result<Vec<_>>>()?;

        Ok(TreeEnsemble {
            trees,
            base_margin: link.base_margin(base_score),
            link,
            num_features,
            feature_names: learner.feature_names,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn link(&self) -> Link {
        self.link
    }

    /// Prediction for a single row already in model column order
    pub fn predict_row(&self, row: &[f32]) -> Result<f32> {
        if row.len() != self.num_features {
            return Err(CovidError::FeatureMismatch {
                expected: format!("{} features", self.num_features),
                found: format!("{} features", row.len()),
            });
        }
        let margin = self
            .trees
            .iter()
            .fold(self.base_margin, |acc, tree| acc + tree.leaf_value(row));
        Ok(self.link.apply(margin))
    }

    fn check_columns(&self, features: &FeatureVector) -> Result<()> {
        if self.feature_names.is_empty() {
            return Ok(());
        }
        if self.feature_names.as_slice() != features.columns() {
            return Err(CovidError::FeatureMismatch {
                expected: self.feature_names.join(", "),
                found: features.columns().join(", "),
            });
        }
        Ok(())
    }
}

impl Regressor for TreeEnsemble {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        self.check_columns(features)?;
        let value = self.predict_row(&features.to_f32_vec())?;
        if !value.is_finite() {
            return Err(CovidError::Model(format!(
                "Model produced a non-finite value: {}",
                value
            )));
        }
        Ok(value as f64)
    }
}

/// `base_score` is written as `"5E-1"`, or `"[5E-1]"` by newer releases
fn parse_base_score(raw: &str) -> Result<f32> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
        .parse()
        .map_err(|_| CovidError::Model(format!("Invalid base_score: {}", raw)))
}

#[derive(Deserialize)]
struct ModelFile {
    learner: LearnerJson,
}

#[derive(Deserialize)]
struct LearnerJson {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: BoosterJson,
    learner_model_param: LearnerParamJson,
    objective: ObjectiveJson,
}

#[derive(Deserialize)]
struct BoosterJson {
    name: String,
    model: Option<TreeModelJson>,
}

#[derive(Deserialize)]
struct TreeModelJson {
    trees: Vec<TreeJson>,
}

#[derive(Deserialize)]
struct TreeJson {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<u32>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
}

#[derive(Deserialize)]
struct LearnerParamJson {
    base_score: String,
    num_feature: String,
}

#[derive(Deserialize)]
struct ObjectiveJson {
    name: String,
}

/// Older releases write booleans, newer ones 0/1
#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(i) => *i != 0,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Two stumps over two features:
    /// tree 0 splits `a` at 10 (left 1.0, right 2.0), default right;
    /// tree 1 splits `b` at 0.5 (left -0.5, right 0.5), default left.
    pub(crate) fn stump_model(objective: &str, base_score: &str) -> String {
        json!({
            "learner": {
                "feature_names": ["a", "b"],
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "trees": [
                            {
                                "left_children": [1, -1, -1],
                                "right_children": [2, -1, -1],
                                "split_indices": [0, 0, 0],
                                "split_conditions": [10.0, 1.0, 2.0],
                                "default_left": [0, 0, 0]
                            },
                            {
                                "left_children": [1, -1, -1],
                                "right_children": [2, -1, -1],
                                "split_indices": [1, 0, 0],
                                "split_conditions": [0.5, -0.5, 0.5],
                                "default_left": [true, false, false]
                            }
                        ]
                    }
                },
                "learner_model_param": { "base_score": base_score, "num_feature": "2" },
                "objective": { "name": objective }
            },
            "version": [2, 0, 3]
        })
        .to_string()
    }

    #[test]
    fn test_sums_leaves_and_base_score() {
        let model = TreeEnsemble::from_json(&stump_model("reg:squarederror", "5E-1")).unwrap();
        assert_eq!(model.num_trees(), 2);
        assert_eq!(model.link(), Link::Identity);

        assert_eq!(model.predict_row(&[3.0, 0.0]).unwrap(), 0.5 + 1.0 - 0.5);
        assert_eq!(model.predict_row(&[10.0, 1.0]).unwrap(), 0.5 + 2.0 + 0.5);
    }

    #[test]
    fn test_missing_values_follow_default() {
        let model = TreeEnsemble::from_json(&stump_model("reg:squarederror", "[0E0]")).unwrap();
        assert_eq!(model.predict_row(&[f32::NAN, f32::NAN]).unwrap(), 2.0 - 0.5);
    }

    #[test]
    fn test_exp_link() {
        let model = TreeEnsemble::from_json(&stump_model("count:poisson", "1")).unwrap();
        let y = model.predict_row(&[3.0, 0.0]).unwrap();
        assert!((y - 0.5f32.exp()).abs() < 1e-6);
    }

    #[test]
    fn test_regressor_checks_columns() {
        let model = TreeEnsemble::from_json(&stump_model("reg:squarederror", "0")).unwrap();

        let ok = FeatureVector::from_pairs([("a", 3.0), ("b", 0.0)]);
        assert_eq!(model.predict(&ok).unwrap(), 0.5);

        let swapped = FeatureVector::from_pairs([("b", 0.0), ("a", 3.0)]);
        assert!(matches!(
            model.predict(&swapped),
            Err(CovidError::FeatureMismatch { .. })
        ));

        let short = FeatureVector::from_pairs([("a", 3.0)]);
        assert!(model.predict(&short).is_err());
    }

    #[test]
    fn test_rejects_bad_models() {
        assert!(TreeEnsemble::from_json("{}").is_err());
        assert!(TreeEnsemble::from_json(&stump_model("multi:softprob", "0")).is_err());

        let bad_child = stump_model("reg:squarederror", "0").replace(
            "\"left_children\":[1,-1,-1]",
            "\"left_children\":[7,-1,-1]",
        );
        assert!(matches!(
            TreeEnsemble::from_json(&bad_child),
            Err(CovidError::Model(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = TreeEnsemble::load(Path::new("/nonexistent/model.json"));
        assert!(matches!(result, Err(CovidError::ModelNotFound(_))));
    }
}
