//! Split rules on the edges of a typing tree.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Comparison operator of a split rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Numeric split: value is above the cutpoint.
    #[serde(rename = ">")]
    Gt,
    /// Numeric split: value is below the cutpoint.
    #[serde(rename = "<")]
    Lt,
    /// Categorical split: value is one of the listed levels.
    #[serde(rename = "in")]
    In,
}

impl Operator {
    /// Operator as written in XPath expressions and diagram labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::In => "in",
        }
    }

    /// Opposite numeric operator. `In` is its own complement.
    pub fn flipped(self) -> Self {
        match self {
            Operator::Gt => Operator::Lt,
            Operator::Lt => Operator::Gt,
            Operator::In => Operator::In,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operand of a split rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    /// Cutpoint of a continuous split.
    Threshold(f64),
    /// Ordered levels of a categorical split.
    Levels(Vec<String>),
}

/// A split rule: the condition on the edge between a node and one of its children.
///
/// For `In` rules, `excluded` holds the levels that were present in the
/// training data but routed to neither child at this node ("not present").
/// Both rules produced from one split share the same `excluded` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitRule {
    pub variable: String,
    pub operator: Operator,
    pub value: RuleValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded: Vec<String>,
}

impl SplitRule {
    /// Create a continuous rule (`>` or `<` against a cutpoint).
    pub fn threshold(variable: impl Into<String>, operator: Operator, cutpoint: f64) -> Self {
        debug_assert!(operator != Operator::In, "threshold rules use > or <");
        Self {
            variable: variable.into(),
            operator,
            value: RuleValue::Threshold(cutpoint),
            excluded: Vec::new(),
        }
    }

    /// Create a categorical rule (`in` a set of levels).
    pub fn categorical(
        variable: impl Into<String>,
        levels: Vec<String>,
        excluded: Vec<String>,
    ) -> Self {
        debug_assert!(
            levels.iter().all(|l| !excluded.contains(l)),
            "categorical value and excluded sets must be disjoint"
        );
        Self {
            variable: variable.into(),
            operator: Operator::In,
            value: RuleValue::Levels(levels),
            excluded,
        }
    }

    /// Split variable normalized to a configuration identity.
    pub fn identity(&self) -> String {
        normalize_identity(&self.variable)
    }

    /// Check whether the operator agrees with the operand.
    pub fn is_consistent(&self) -> bool {
        matches!(
            (self.operator, &self.value),
            (Operator::Gt | Operator::Lt, RuleValue::Threshold(_))
                | (Operator::In, RuleValue::Levels(_))
        )
    }
}

impl fmt::Display for SplitRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            RuleValue::Threshold(t) => write!(f, "{} {} {}", self.variable, self.operator, t),
            RuleValue::Levels(levels) => {
                write!(f, "{} in [{}]", self.variable, levels.join(", "))
            }
        }
    }
}

/// Normalize a model variable name (`ed.lev3`) to a configuration identity (`ed_lev3`).
///
/// Dots are not allowed in XLSForm names, and configuration keys are lower-case.
pub fn normalize_identity(variable: &str) -> String {
    variable.replace('.', "_").to_lowercase()
}
