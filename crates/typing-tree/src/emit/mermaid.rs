//! Mermaid flowcharts of model and form trees.
//!
//! Only a small subset of the language is emitted (plain shapes and `-->` /
//! `-.->` links) so the output imports cleanly into diagram tools with partial
//! Mermaid support. Labels are stripped of brackets for the same reason.
//!
//! See <https://mermaid.js.org/syntax/flowchart.html>.

use std::collections::BTreeMap;

use bon::Builder;

use crate::relevance::{RelevanceError, filter_choices};
use crate::repr::{
    Choice, NodeId, Operator, Question, QuestionKind, RuleValue, SEGMENT, Shape, SplitRule, TypingTree,
    top_probability,
};

const HEADER: &str = "flowchart TD";

/// Errors raised while rendering a diagram.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiagramError {
    #[error("cannot label edge with rule '{rule}': operator does not match its value")]
    InconsistentRule { rule: String },
    #[error("form node {node} has no question")]
    MissingQuestion { node: String },
    #[error(transparent)]
    Choices(#[from] RelevanceError),
}

/// Rendering options for [`form_diagram`].
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(derive(Clone, Debug))]
pub struct DiagramOptions {
    /// Label language. Default: `English (en)`.
    #[builder(into, default = "English (en)".to_string())]
    pub language: String,
    /// Leave segment notes out of the diagram.
    #[builder(default)]
    pub skip_notes: bool,
    /// Top class probability (as a fraction) below which a segment is drawn
    /// as uncertain. Default: `0`.
    #[builder(default)]
    pub low_confidence_threshold: f64,
    /// Draw the full class probability stack under each segment.
    #[builder(default)]
    pub detailed: bool,
}

impl Default for DiagramOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

// =============================================================================
// Primitives
// =============================================================================

/// Make a label safe for import: brackets become spaces, newlines are escaped.
pub fn clean_label(label: &str) -> String {
    label
        .replace(['(', ')', '[', ']'], " ")
        .replace('\n', "\\n")
}

fn delimiters(shape: Shape) -> (&'static str, &'static str) {
    match shape {
        Shape::Rectangle => ("[", "]"),
        Shape::Stadium => ("([", "])"),
        Shape::Circle => ("((", "))"),
        Shape::Parallelogram => ("[/", "/]"),
        Shape::ParallelogramAlt => ("[\\", "\\]"),
        Shape::Trapezoid => ("[/", "\\]"),
        Shape::TrapezoidAlt => ("[\\", "/]"),
    }
}

pub fn draw_shape(id: &str, label: &str, shape: Shape) -> String {
    let (begin, end) = delimiters(shape);
    format!("{id}{begin}{}{end}", clean_label(label))
}

pub fn draw_link(from: &str, to: &str, label: Option<&str>, dotted: bool) -> String {
    let arrow = if dotted { "-.->" } else { "-->" };
    match label.filter(|l| !l.is_empty()) {
        Some(label) => format!("{from} {arrow}|{}| {to}", clean_label(label)),
        None => format!("{from} {arrow} {to}"),
    }
}

fn render(shapes: Vec<String>, links: Vec<String>) -> String {
    std::iter::once(HEADER.to_string())
        .chain(shapes)
        .chain(links)
        .collect::<Vec<_>>()
        .join("\n\t")
}

/// Human-readable form of a split rule: the levels for `in`, `op value` for
/// comparisons.
pub fn rule_label(rule: &SplitRule) -> Result<String, DiagramError> {
    match (rule.operator, &rule.value) {
        (Operator::In, RuleValue::Levels(levels)) => Ok(levels.join(", ")),
        (op @ (Operator::Gt | Operator::Lt), RuleValue::Threshold(t)) => Ok(format!("{op} {t}")),
        _ => Err(DiagramError::InconsistentRule {
            rule: rule.to_string(),
        }),
    }
}

/// Shapes and links of a probability stack hanging from `id`, most probable
/// class first. The first shape reuses `id`.
fn probability_stack<F>(
    id: &str,
    probabilities: &BTreeMap<String, f64>,
    shape: Shape,
    low_confidence: bool,
    mut class_label: F,
) -> (Vec<String>, Vec<String>)
where
    F: FnMut(&str) -> String,
{
    let mut items: Vec<(&String, f64)> = probabilities
        .iter()
        .map(|(class, p)| (class, *p))
        .filter(|(_, p)| *p > 0.0)
        .collect();
    items.sort_by(|a, b| b.1.total_cmp(&a.1));

    let prefix = if low_confidence { "*" } else { "" };
    let mut shapes = Vec::with_capacity(items.len());
    let mut links = Vec::new();
    let mut prev = id.to_string();

    for (i, (class, p)) in items.into_iter().enumerate() {
        let label = format!("{prefix}{} ({:.0}%)", class_label(class), p * 100.0);
        let shape_id = if i == 0 {
            id.to_string()
        } else {
            format!("{id}_prob_{}", i + 1)
        };
        shapes.push(draw_shape(&shape_id, &label, shape));
        if i > 0 {
            links.push(draw_link(&prev, &shape_id, None, low_confidence));
        }
        prev = shape_id;
    }
    (shapes, links)
}

// =============================================================================
// Model diagram
// =============================================================================

/// Diagram of a freshly built tree: split variables as rectangles, leaves as
/// probability stacks, edges labelled with the split rules.
pub fn cart_diagram(tree: &TypingTree) -> Result<String, DiagramError> {
    let mut shapes = Vec::new();
    let mut links = Vec::new();

    for id in tree.preorder() {
        let node = tree.node(id);
        let uid = node.uid();
        let probabilities = node.class_probabilities.as_ref().filter(|p| !p.is_empty());

        match probabilities {
            Some(probabilities) if node.is_leaf() => {
                let (s, l) = probability_stack(uid, probabilities, Shape::Stadium, false, str::to_string);
                shapes.extend(s);
                links.extend(l);
            }
            _ => {
                let (label, shape) = match (&node.model, node.is_leaf()) {
                    (Some(model), true) => (model.predicted_class.as_str(), Shape::Stadium),
                    (Some(model), false) => (model.split_variable.as_str(), Shape::Rectangle),
                    (None, true) => (node.name.as_str(), Shape::Stadium),
                    (None, false) => (node.name.as_str(), Shape::Rectangle),
                };
                shapes.push(draw_shape(uid, label, shape));
            }
        }

        if let Some(parent) = node.parent() {
            let label = node.rule.as_ref().map(rule_label).transpose()?;
            links.push(draw_link(tree.node(parent).uid(), uid, label.as_deref(), false));
        }
    }
    Ok(render(shapes, links))
}

// =============================================================================
// Form diagram
// =============================================================================

fn form_question(tree: &TypingTree, id: NodeId) -> Result<&Question, DiagramError> {
    tree.question(id).ok_or_else(|| DiagramError::MissingQuestion {
        node: tree.node(id).uid().to_string(),
    })
}

/// Shape label: the segment name for segment leaves, otherwise the question
/// label, falling back to the node name.
fn form_shape_label(tree: &TypingTree, id: NodeId, language: &str) -> Result<String, DiagramError> {
    let node = tree.node(id);
    let question = form_question(tree, id)?;
    if node.name == SEGMENT {
        return Ok(question.segment_literal().unwrap_or_default().to_string());
    }
    Ok(question
        .label
        .get(language)
        .filter(|l| !l.is_empty())
        .cloned()
        .unwrap_or_else(|| node.name.clone()))
}

fn choice_labels<'a>(choices: impl IntoIterator<Item = &'a Choice>, language: &str) -> String {
    choices
        .into_iter()
        .map(|c| c.label.get(language).cloned().unwrap_or_else(|| c.name.clone()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Label of the edge into `id`.
///
/// Edges carry the labels of the parent choices leading here. Below a
/// `calculate` parent (an elided duplicate or option output) the choices are
/// recovered from the question the rule refers to, or the rule is shown as is.
fn form_link_label(tree: &TypingTree, id: NodeId, language: &str) -> Result<String, DiagramError> {
    let node = tree.node(id);
    let question = form_question(tree, id)?;
    if let Some(choices) = question.choices_from_parent.as_ref().filter(|c| !c.is_empty()) {
        return Ok(choice_labels(choices, language));
    }

    let (Some(parent), Some(rule)) = (node.parent(), node.rule.as_ref()) else {
        return Ok(String::new());
    };
    if form_question(tree, parent)?.kind != QuestionKind::Calculate {
        return Ok(String::new());
    }

    let identity = rule.identity();
    let rule_parent = tree
        .parents(id)
        .into_iter()
        .find(|&ancestor| tree.node(ancestor).name == identity);
    match rule_parent {
        Some(ancestor) => match &form_question(tree, ancestor)?.choices {
            Some(choices) if !choices.is_empty() => {
                Ok(choice_labels(&filter_choices(choices, rule)?, language))
            }
            _ => Ok(String::new()),
        },
        None => Ok(format!("'{}'", rule_label(rule)?)),
    }
}

/// Diagram of a finished form tree.
///
/// Question shapes follow their kind; segment leaves are circles, prefixed
/// with `*` and linked with a dotted arrow when their top class probability is
/// below the threshold. In detailed mode each segment shows its probability
/// stack, with model classes translated to segment names.
pub fn form_diagram(tree: &TypingTree, options: &DiagramOptions) -> Result<String, DiagramError> {
    let language = options.language.as_str();
    let segments = segment_names(tree);

    let mut shapes = Vec::new();
    let mut links = Vec::new();

    for id in tree.preorder() {
        let node = tree.node(id);
        let question = form_question(tree, id)?;
        if options.skip_notes && question.kind == QuestionKind::Note {
            continue;
        }

        let is_segment = node.name == SEGMENT;
        let probabilities = node.class_probabilities.as_ref().filter(|p| !p.is_empty());
        let mut low_confidence = false;

        match probabilities {
            Some(probabilities) if is_segment => {
                low_confidence = top_probability(probabilities)
                    .is_some_and(|top| top < options.low_confidence_threshold);
                if options.detailed {
                    let stratum = node.model.as_ref().and_then(|m| m.stratum.clone());
                    let (s, l) = probability_stack(node.uid(), probabilities, Shape::Circle, low_confidence, |class| {
                        segments
                            .get(&(stratum.clone(), class.to_string()))
                            .cloned()
                            .unwrap_or_else(|| class.to_string())
                    });
                    shapes.extend(s);
                    links.extend(l);
                } else {
                    let label = form_shape_label(tree, id, language)?;
                    let prefix = if low_confidence { "*" } else { "" };
                    shapes.push(draw_shape(node.uid(), &format!("{prefix}{label}"), Shape::Circle));
                }
            }
            _ => {
                let shape = if is_segment { Shape::Circle } else { question.kind.shape() };
                shapes.push(draw_shape(node.uid(), &form_shape_label(tree, id, language)?, shape));
            }
        }

        if let Some(parent) = node.parent() {
            let label = form_link_label(tree, id, language)?;
            links.push(draw_link(tree.node(parent).uid(), node.uid(), Some(label.as_str()), low_confidence));
        }
    }
    Ok(render(shapes, links))
}

/// Segment name of each (stratum, model class), read from the segment leaves.
fn segment_names(tree: &TypingTree) -> BTreeMap<(Option<String>, String), String> {
    tree.preorder()
        .into_iter()
        .filter(|&id| tree.node(id).name == SEGMENT)
        .filter_map(|id| {
            let node = tree.node(id);
            let model = node.model.as_ref()?;
            let segment = node.question.as_ref()?.segment_literal()?;
            Some((
                (model.stratum.clone(), model.predicted_class.clone()),
                segment.to_string(),
            ))
        })
        .collect()
}
