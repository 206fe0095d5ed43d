//! rpart JSON export.
//!
//! Mirrors what `jsonlite` produces from an `rpart` object: the `frame` rows
//! (merged with the primary split of each node), the class levels
//! (`ylevels`), the categorical levels per variable (`xlevels`) and the
//! categorical partition matrix (`csplit`). These are foreign types used only
//! for parsing; see [`super::convert`] for the conversion to native types.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// =============================================================================
// Custom deserializers for jsonlite quirks
// =============================================================================

/// Render a scalar JSON value as a level string.
fn value_to_level(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.as_f64()?.to_string(),
        }),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Levels are strings, but numeric factors come through as numbers and
/// `jsonlite` unboxes single-element vectors to scalars.
fn levels_from_value<E: serde::de::Error>(value: Value) -> Result<Vec<String>, E> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| {
                value_to_level(v)
                    .ok_or_else(|| E::custom(format!("level must be a string or number, got {v}")))
            })
            .collect(),
        other => value_to_level(&other)
            .map(|level| vec![level])
            .ok_or_else(|| E::custom(format!("levels must be an array or scalar, got {other}"))),
    }
}

fn deserialize_levels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    levels_from_value(value)
}

fn deserialize_level_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(map) => map
            .into_iter()
            .map(|(var, levels)| Ok((var, levels_from_value(levels)?)))
            .collect(),
        // An empty R list serializes as `[]`.
        Value::Array(items) if items.is_empty() => Ok(BTreeMap::new()),
        other => Err(SerdeError::custom(format!(
            "xlevels must be an object, got {other}"
        ))),
    }
}

fn deserialize_csplit<'de, D>(deserializer: D) -> Result<Vec<Vec<i32>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    let value = Value::deserialize(deserializer)?;
    let code = |v: &Value| -> Result<i32, D::Error> {
        v.as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i32)
            .ok_or_else(|| SerdeError::custom(format!("csplit code must be an integer, got {v}")))
    };
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(rows) => rows
            .iter()
            .map(|row| match row {
                Value::Array(codes) => codes.iter().map(code).collect(),
                scalar => Ok(vec![code(scalar)?]),
            })
            .collect(),
        other => Err(SerdeError::custom(format!(
            "csplit must be a matrix, got {other}"
        ))),
    }
}

// =============================================================================
// Export definitions
// =============================================================================

/// One node of the rpart frame, with its primary split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpartNode {
    /// Binary node index (1 = root).
    pub node: u32,
    /// Split variable, or `<leaf>`.
    pub var: String,
    /// `±1` for continuous splits, number of levels for categorical ones.
    #[serde(default)]
    pub ncat: i32,
    /// Cutpoint (continuous) or 1-based `csplit` row (categorical).
    #[serde(default)]
    pub index: f64,
    /// 1-based index of the predicted class in `ylevels`.
    pub yval: f64,
    /// `[yval, counts.., probabilities.., node probability]`.
    pub yval2: Vec<f64>,
}

/// A fitted rpart model as exported to JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpartModel {
    pub nodes: Vec<RpartNode>,
    #[serde(deserialize_with = "deserialize_levels")]
    pub ylevels: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_level_map")]
    pub xlevels: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_csplit")]
    pub csplit: Vec<Vec<i32>>,
}

impl RpartModel {
    /// Read a model from JSON.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Read a model from a JSON reader.
    pub fn from_reader<R: std::io::Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }

    /// Number of classes in the model.
    pub fn n_classes(&self) -> usize {
        self.ylevels.len()
    }

    /// Split variables used by the model, in first-use order.
    pub fn split_variables(&self) -> Vec<&str> {
        let mut vars: Vec<&str> = Vec::new();
        for node in &self.nodes {
            if node.var != crate::repr::LEAF_SENTINEL && !vars.contains(&node.var.as_str()) {
                vars.push(&node.var);
            }
        }
        vars
    }
}
