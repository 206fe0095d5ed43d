//! Notes announcing the assigned segment.

use tracing::{info, warn};

use crate::Result;
use crate::config::Settings;
use crate::repr::{Question, SEGMENT, SEGMENT_NOTE, Translations, TypingTree, top_probability};

/// Note label for `segment`: the configured template with `{segment}`
/// substituted, followed by the low-confidence warning when `low_confidence`.
pub fn segment_note_label(settings: &Settings, segment: &str, low_confidence: bool) -> Translations {
    settings
        .segment_note
        .iter()
        .map(|(language, template)| {
            let mut label = template.replace("{segment}", segment);
            if low_confidence {
                if let Some(warning) = settings.low_confidence_note.get(language) {
                    label.push(' ');
                    label.push_str(&warning.replace("{segment}", segment));
                }
            }
            (language.clone(), label)
        })
        .collect()
}

/// Insert a note after every segment leaf. Does nothing when no note
/// template is configured.
pub fn add_segment_notes(tree: &TypingTree, settings: &Settings) -> Result<TypingTree> {
    let mut out = tree.clone();
    if settings.segment_note.is_empty() {
        return Ok(out);
    }
    let mut added = 0usize;

    for id in out.preorder() {
        let node = out.node(id);
        if node.name != SEGMENT || !node.is_leaf() {
            continue;
        }
        let question = super::question_of(&out, id)?;
        let segment = question.segment_literal().unwrap_or_default().to_string();
        let conditions = question.conditions.clone();

        let top = node.class_probabilities.as_ref().and_then(top_probability);
        let low_confidence = top.is_some_and(|p| p < settings.low_confidence_threshold);
        if low_confidence {
            warn!(
                segment = %segment,
                probability = top.unwrap_or_default(),
                threshold = settings.low_confidence_threshold,
                "low-confidence segment"
            );
        }

        let note = out.create_node(SEGMENT_NOTE);
        let mut question = Question::note(
            out.node(note).uid(),
            segment_note_label(settings, &segment, low_confidence),
        );
        question.conditions = conditions;
        out.node_mut(note).question = Some(question);
        out.insert_after(id, note)?;
        added += 1;
    }

    info!(added, "added segment notes");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::fixtures::{education_config, education_tree};
    use crate::passes::attach_questions;
    use crate::repr::QuestionKind;

    const EN: &str = "English (en)";

    fn settings(threshold: f64) -> Settings {
        Settings::builder()
            .segment_note([(EN.to_string(), "You belong to {segment}.".to_string())].into())
            .low_confidence_note([(EN.to_string(), "Please double-check.".to_string())].into())
            .low_confidence_threshold(threshold)
            .build()
    }

    #[test]
    fn notes_follow_segments() {
        let (tree, [_, x, y]) = education_tree();
        let tree = attach_questions(&tree, &education_config(QuestionKind::SelectOne)).unwrap();
        let out = add_segment_notes(&tree, &settings(0.6)).unwrap();

        let note_x = out.node(x).children()[0];
        assert_eq!(out.node(note_x).name, SEGMENT_NOTE);
        let label = &out.question(note_x).unwrap().label;
        assert_eq!(label[EN], "You belong to X.");

        let note_y = out.node(y).children()[0];
        let label = &out.question(note_y).unwrap().label;
        assert_eq!(label[EN], "You belong to Y. Please double-check.");
        assert_eq!(out.question(note_y).unwrap().kind, QuestionKind::Note);
    }

    #[test]
    fn no_template_no_notes() {
        let (tree, _) = education_tree();
        let tree = attach_questions(&tree, &education_config(QuestionKind::SelectOne)).unwrap();
        let out = add_segment_notes(&tree, &Settings::default()).unwrap();
        assert_eq!(out.len(), tree.len());
    }

    #[test]
    fn label_without_warning_language() {
        let mut s = settings(0.9);
        s.low_confidence_note.clear();
        let label = segment_note_label(&s, "Farmers", true);
        assert_eq!(label[EN], "You belong to Farmers.");
    }
}
