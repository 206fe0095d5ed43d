//! Screening questions: asked before or after the typing group and not
//! driven by the model.

use crate::config::{ConfigError, Placement, ScreeningQuestion, Settings, TypingConfig};
use crate::repr::QuestionKind;

use super::xlsform::{ChoiceRow, SurveyRow, translated_columns};

/// `required` column for a screening question. Kinds without a meaningful
/// answer leave the column empty.
fn screening_required(kind: QuestionKind) -> Option<bool> {
    match kind {
        QuestionKind::SelectOne
        | QuestionKind::Text
        | QuestionKind::Integer
        | QuestionKind::Decimal => Some(true),
        QuestionKind::SelectMultiple => Some(false),
        QuestionKind::Calculate | QuestionKind::Note => None,
    }
}

fn screening_row(question: &ScreeningQuestion, settings: &Settings) -> SurveyRow {
    let kind = question.question_type;
    let row_type = match (&question.choice_list, kind.is_select()) {
        (Some(list), true) => format!("{kind} {list}"),
        _ => kind.to_string(),
    };
    let required = screening_required(kind);

    let mut translated = translated_columns("label", &question.label);
    translated.extend(translated_columns("hint", &question.hint));
    if required == Some(true) {
        translated.extend(translated_columns("required_message", &settings.required_message));
    }

    SurveyRow {
        row_type,
        name: question.name.clone(),
        translated,
        calculation: question.calculation.clone(),
        relevant: question.relevant.clone(),
        required,
        choice_filter: None,
    }
}

/// Put screening questions around the typing rows, keeping configuration
/// order within each placement.
pub fn add_screening_questions(
    survey: Vec<SurveyRow>,
    screening: &[ScreeningQuestion],
    settings: &Settings,
) -> Vec<SurveyRow> {
    let (begin, end): (Vec<&ScreeningQuestion>, Vec<&ScreeningQuestion>) = screening
        .iter()
        .partition(|q| q.placement == Placement::Begin);

    let mut rows: Vec<SurveyRow> = begin.into_iter().map(|q| screening_row(q, settings)).collect();
    rows.extend(survey);
    rows.extend(end.into_iter().map(|q| screening_row(q, settings)));
    rows
}

/// Append the choice lists used by screening questions, skipping rows the
/// typing questions already emitted.
///
/// # Errors
///
/// [`ConfigError::UnknownChoiceList`] if a screening question names a list
/// that is not configured.
pub fn add_screening_choices(
    mut choices: Vec<ChoiceRow>,
    config: &TypingConfig,
) -> Result<Vec<ChoiceRow>, ConfigError> {
    for question in &config.screening {
        let Some(list) = &question.choice_list else {
            continue;
        };
        let entries = config
            .choice_list(list)
            .ok_or_else(|| ConfigError::UnknownChoiceList {
                question: question.name.clone(),
                list: list.clone(),
            })?;
        for choice in &entries {
            let row = ChoiceRow::from_choice(choice);
            if !choices.contains(&row) {
                choices.push(row);
            }
        }
    }
    Ok(choices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChoiceConfig;
    use rstest::rstest;

    const EN: &str = "English (en)";

    fn screening(name: &str, kind: QuestionKind, placement: Placement) -> ScreeningQuestion {
        ScreeningQuestion {
            name: name.into(),
            question_type: kind,
            label: [(EN.to_string(), name.to_uppercase())].into(),
            hint: Default::default(),
            choice_list: kind.is_select().then(|| "yesno".to_string()),
            calculation: None,
            relevant: None,
            placement,
        }
    }

    fn typing_row() -> SurveyRow {
        SurveyRow {
            row_type: "begin_group".into(),
            name: "typing_begin".into(),
            ..SurveyRow::default()
        }
    }

    #[rstest]
    #[case(QuestionKind::SelectOne, Some(true))]
    #[case(QuestionKind::Integer, Some(true))]
    #[case(QuestionKind::SelectMultiple, Some(false))]
    #[case(QuestionKind::Calculate, None)]
    #[case(QuestionKind::Note, None)]
    fn required_by_kind(#[case] kind: QuestionKind, #[case] expected: Option<bool>) {
        assert_eq!(screening_required(kind), expected);
    }

    #[test]
    fn placement_order() {
        let questions = [
            screening("consent", QuestionKind::SelectOne, Placement::Begin),
            screening("comment", QuestionKind::Text, Placement::End),
            screening("village", QuestionKind::Text, Placement::Begin),
        ];
        let settings = Settings::builder()
            .required_message([(EN.to_string(), "Required".to_string())].into())
            .build();
        let rows = add_screening_questions(vec![typing_row()], &questions, &settings);

        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["consent", "village", "typing_begin", "comment"]);
        assert_eq!(rows[0].row_type, "select_one yesno");
        assert_eq!(rows[0].required, Some(true));
        assert_eq!(
            rows[0].translated.get("required_message::English (en)").map(String::as_str),
            Some("Required")
        );
        assert_eq!(rows[0].label(EN), Some("CONSENT"));
    }

    #[test]
    fn choices_are_appended_once() {
        let config = TypingConfig {
            choices: [(
                "yesno".to_string(),
                vec![ChoiceConfig::new("yes", None), ChoiceConfig::new("no", None)],
            )]
            .into(),
            screening: vec![
                screening("consent", QuestionKind::SelectOne, Placement::Begin),
                screening("owner", QuestionKind::SelectOne, Placement::End),
            ],
            ..TypingConfig::default()
        };
        let rows = add_screening_choices(Vec::new(), &config).unwrap();
        let values: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(values, ["yes", "no"]);
    }

    #[test]
    fn unknown_screening_list_is_an_error() {
        let config = TypingConfig {
            screening: vec![screening("consent", QuestionKind::SelectOne, Placement::Begin)],
            ..TypingConfig::default()
        };
        assert_eq!(
            add_screening_choices(Vec::new(), &config).unwrap_err(),
            ConfigError::UnknownChoiceList {
                question: "consent".into(),
                list: "yesno".into(),
            }
        );
    }
}
