//! Form questions and choices attached to typing tree nodes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Labels or hints keyed by language (e.g. `English (en)`).
pub type Translations = BTreeMap<String, String>;

// =============================================================================
// QuestionKind
// =============================================================================

/// Closed set of question types used by the typing form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SelectOne,
    SelectMultiple,
    Integer,
    Decimal,
    Text,
    Calculate,
    Note,
}

/// Diagram shapes available for form nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Rectangle,
    Stadium,
    Circle,
    Parallelogram,
    ParallelogramAlt,
    Trapezoid,
    TrapezoidAlt,
}

/// Per-kind behaviour: default `required` flag and diagram shape.
struct KindTraits {
    required: bool,
    shape: Shape,
}

impl QuestionKind {
    fn traits(self) -> KindTraits {
        let (required, shape) = match self {
            QuestionKind::SelectOne => (true, Shape::Rectangle),
            QuestionKind::SelectMultiple => (false, Shape::Rectangle),
            QuestionKind::Integer => (true, Shape::Trapezoid),
            QuestionKind::Decimal => (true, Shape::TrapezoidAlt),
            QuestionKind::Text => (true, Shape::Circle),
            QuestionKind::Calculate => (false, Shape::Parallelogram),
            QuestionKind::Note => (false, Shape::ParallelogramAlt),
        };
        KindTraits { required, shape }
    }

    /// Whether questions of this kind must be answered by default.
    pub fn default_required(self) -> bool {
        self.traits().required
    }

    /// Diagram shape for nodes of this kind.
    pub fn shape(self) -> Shape {
        self.traits().shape
    }

    /// `select_one` or `select_multiple`.
    pub fn is_select(self) -> bool {
        matches!(self, QuestionKind::SelectOne | QuestionKind::SelectMultiple)
    }

    /// XLSForm type keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::SelectOne => "select_one",
            QuestionKind::SelectMultiple => "select_multiple",
            QuestionKind::Integer => "integer",
            QuestionKind::Decimal => "decimal",
            QuestionKind::Text => "text",
            QuestionKind::Calculate => "calculate",
            QuestionKind::Note => "note",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Choices
// =============================================================================

/// Raw model value a choice corresponds to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelValue {
    Number(f64),
    Text(String),
}

impl ModelValue {
    /// String form used to match categorical levels.
    ///
    /// Integral numbers render without a fractional part (`1.0` → `"1"`).
    pub fn as_level(&self) -> String {
        match self {
            ModelValue::Number(n) => n.to_string(),
            ModelValue::Text(s) => s.clone(),
        }
    }

    /// Numeric form used for threshold comparisons.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ModelValue::Number(n) => Some(*n),
            ModelValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// A form question choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub list_name: String,
    pub name: String,
    #[serde(default)]
    pub label: Translations,
    #[serde(default)]
    pub model_value: Option<ModelValue>,
}

// =============================================================================
// Question
// =============================================================================

/// A form question attached to a tree node.
///
/// `conditions` are the conjuncts of the relevance expression; they are kept
/// in insertion order and deduplicated by the relevance passes.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub name: String,
    pub kind: QuestionKind,
    pub label: Translations,
    pub hint: Translations,
    pub required: bool,
    pub required_message: Translations,
    pub conditions: Vec<String>,
    pub calculation: Option<String>,
    pub choices: Option<Vec<Choice>>,
    pub choice_list: Option<String>,
    pub choice_filter: Option<String>,
    /// Parent choices leading to this question. Only used for diagrams.
    pub choices_from_parent: Option<Vec<Choice>>,
    /// Extra conjunct added by the `hide` option. Never inherited by descendants.
    pub hide_condition: Option<String>,
}

impl Question {
    pub fn new(name: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            label: Translations::new(),
            hint: Translations::new(),
            required: false,
            required_message: Translations::new(),
            conditions: Vec::new(),
            calculation: None,
            choices: None,
            choice_list: None,
            choice_filter: None,
            choices_from_parent: None,
            hide_condition: None,
        }
    }

    /// A `calculate` question storing a constant segment name.
    ///
    /// The literal is single-quoted unless the name itself contains `'`.
    pub fn segment(name: impl Into<String>, segment: &str) -> Self {
        let mut question = Self::new(name, QuestionKind::Calculate);
        question.calculation = Some(if segment.contains('\'') {
            format!("\"{segment}\"")
        } else {
            format!("'{segment}'")
        });
        question
    }

    /// A `note` question with the given label.
    pub fn note(name: impl Into<String>, label: Translations) -> Self {
        let mut question = Self::new(name, QuestionKind::Note);
        question.label = label;
        question
    }

    /// Whether the question was hidden by a `hide` option.
    pub fn is_hidden(&self) -> bool {
        self.hide_condition.is_some()
    }

    /// Relevance XPath expression built from the conditions.
    ///
    /// Each conjunct is wrapped in parentheses and joined with `and`.
    pub fn relevant(&self) -> Option<String> {
        let conjuncts: Vec<String> = self
            .conditions
            .iter()
            .chain(self.hide_condition.iter())
            .map(|c| format!("({c})"))
            .collect();
        if conjuncts.is_empty() {
            None
        } else {
            Some(conjuncts.join(" and "))
        }
    }

    /// Segment literal stored by a segment `calculate`, without quotes.
    pub fn segment_literal(&self) -> Option<&str> {
        self.calculation
            .as_deref()
            .map(|c| unquote(c, '\'').or_else(|| unquote(c, '"')).unwrap_or(c))
    }
}

fn unquote(literal: &str, quote: char) -> Option<&str> {
    literal.strip_prefix(quote)?.strip_suffix(quote)
}

/// Append `items` to `target`, skipping values already present.
pub fn extend_unique(target: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}
