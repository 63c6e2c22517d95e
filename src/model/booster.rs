//! Gradient-boosted tree ensemble read from XGBoost's JSON model format.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use super::loader::ModelError;

// ---------------------------------------------------------------------------
// On-disk schema (only the fields needed for inference)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ModelDocument {
    learner: Learner,
}

#[derive(Debug, Deserialize)]
struct Learner {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: GradientBooster,
    learner_model_param: LearnerModelParam,
    objective: Objective,
}

#[derive(Debug, Deserialize)]
struct GradientBooster {
    model: TreeEnsemble,
}

#[derive(Debug, Deserialize)]
struct TreeEnsemble {
    trees: Vec<RawTree>,
    #[serde(default)]
    tree_info: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct RawTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<usize>,
    split_conditions: Vec<f64>,
    default_left: Vec<Flag>,
}

/// XGBoost writes boolean arrays as 0/1 integers; older writers used `true`/`false`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(i) => *i != 0,
        }
    }
}

// Numeric params are serialized as strings, e.g. "5E-1".
#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    #[serde(default = "default_base_score")]
    base_score: String,
    #[serde(default)]
    num_class: String,
    #[serde(default)]
    num_feature: String,
}

fn default_base_score() -> String {
    "0.5".to_string()
}

#[derive(Debug, Deserialize)]
struct Objective {
    name: String,
}

// ---------------------------------------------------------------------------
// In-memory model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Node {
    left: usize,
    right: usize,
    feature: usize,
    /// Split threshold, or the leaf weight when the node is a leaf.
    value: f64,
    default_left: bool,
    is_leaf: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_raw(index: usize, raw: RawTree) -> Result<Self, ModelError> {
        let n = raw.left_children.len();
        if n == 0
            || raw.right_children.len() != n
            || raw.split_indices.len() != n
            || raw.split_conditions.len() != n
            || raw.default_left.len() != n
        {
            return Err(ModelError::InvalidBooster(format!(
                "tree {} has inconsistent node arrays",
                index
            )));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (raw.left_children[i], raw.right_children[i]);
            let is_leaf = left == -1;
            // Children always come after their parent, which rules out cycles.
            let in_range = |child: i64| child > i as i64 && (child as usize) < n;
            if !is_leaf && !(in_range(left) && in_range(right)) {
                return Err(ModelError::InvalidBooster(format!(
                    "tree {} node {} has invalid children ({}, {})",
                    index, i, left, right
                )));
            }
            nodes.push(Node {
                left: if is_leaf { 0 } else { left as usize },
                right: if is_leaf { 0 } else { right as usize },
                feature: raw.split_indices[i],
                value: raw.split_conditions[i],
                default_left: raw.default_left[i].is_set(),
                is_leaf,
            });
        }
        Ok(Self { nodes })
    }

    fn leaf_value(&self, features: &[f64]) -> f64 {
        let mut node = &self.nodes[0];
        while !node.is_leaf {
            let x = features.get(node.feature).copied().unwrap_or(f64::NAN);
            let go_left = if x.is_nan() {
                node.default_left
            } else {
                x < node.value
            };
            node = &self.nodes[if go_left { node.left } else { node.right }];
        }
        node.value
    }
}

/// A tree ensemble that can score feature rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Booster {
    trees: Vec<Tree>,
    tree_groups: Vec<usize>,
    base_score: f64,
    num_groups: usize,
    num_features: usize,
    objective: String,
    feature_names: Vec<String>,
}

impl Booster {
    /// Read a model saved with `Booster.save_model("model.json")`.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let file = File::open(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let doc: ModelDocument = serde_json::from_reader(BufReader::new(file))?;
        Self::from_document(doc)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let doc: ModelDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    fn from_document(doc: ModelDocument) -> Result<Self, ModelError> {
        let learner = doc.learner;
        let params = learner.learner_model_param;

        let base_score = parse_param(&params.base_score).ok_or_else(|| {
            ModelError::InvalidBooster(format!("bad base_score {:?}", params.base_score))
        })?;
        let num_groups = parse_param(&params.num_class)
            .map(|n| n as usize)
            .unwrap_or(0)
            .max(1);
        let num_features = parse_param(&params.num_feature)
            .map(|n| n as usize)
            .unwrap_or(0);

        let ensemble = learner.gradient_booster.model;
        let tree_groups = if ensemble.tree_info.is_empty() {
            vec![0; ensemble.trees.len()]
        } else {
            ensemble.tree_info
        };
        if tree_groups.len() != ensemble.trees.len() {
            return Err(ModelError::InvalidBooster(format!(
                "tree_info has {} entries for {} trees",
                tree_groups.len(),
                ensemble.trees.len()
            )));
        }
        if let Some(bad) = tree_groups.iter().find(|&&g| g >= num_groups) {
            return Err(ModelError::InvalidBooster(format!(
                "tree assigned to group {} but model has {} output(s)",
                bad, num_groups
            )));
        }

        let trees = ensemble
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, raw)| Tree::from_raw(i, raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            trees,
            tree_groups,
            base_score,
            num_groups,
            num_features,
            objective: learner.objective.name,
            feature_names: learner.feature_names,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Starting margin before any tree contributes.
    fn base_margin(&self) -> f64 {
        match self.objective.as_str() {
            "binary:logistic" | "binary:logitraw" | "reg:logistic" => {
                let p = self.base_score;
                (p / (1.0 - p)).ln()
            }
            // Log-link objectives store base_score on the response scale.
            "count:poisson" | "reg:gamma" | "reg:tweedie" => self.base_score.ln(),
            _ => self.base_score,
        }
    }

    /// Raw per-output scores. Missing features (NaN or out of range) follow
    /// each split's default direction.
    pub fn predict_margin(&self, features: &[f64]) -> Vec<f64> {
        let mut margins = vec![self.base_margin(); self.num_groups];
        for (tree, &group) in self.trees.iter().zip(&self.tree_groups) {
            margins[group] += tree.leaf_value(features);
        }
        margins
    }

    /// Scores transformed by the objective's link function.
    ///
    /// Logistic objectives give probabilities, `multi:softprob` a
    /// probability per class, `multi:softmax` the winning class index.
    /// Poisson, gamma and Tweedie objectives give `exp(margin)`.
    pub fn predict(&self, features: &[f64]) -> Vec<f64> {
        let margins = self.predict_margin(features);
        match self.objective.as_str() {
            "binary:logistic" | "reg:logistic" => margins.into_iter().map(sigmoid).collect(),
            "count:poisson" | "reg:gamma" | "reg:tweedie" => {
                margins.into_iter().map(f64::exp).collect()
            }
            "multi:softprob" => softmax(&margins),
            "multi:softmax" => {
                let best = margins
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                vec![best as f64]
            }
            _ => margins,
        }
    }
}

/// Parse "5E-1" or the vector form "[5E-1]" written by newer releases.
fn parse_param(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    trimmed.split(',').next()?.trim().parse().ok()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(values: &[f64]) -> Vec<f64> {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
