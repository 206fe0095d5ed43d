//! XLSForm sheet rows.
//!
//! Rows serialize to JSON objects whose keys are XLSForm column names.
//! Translated columns use the `column::language` convention
//! (`label::English (en)`).

use std::collections::BTreeMap;

use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::config::Settings;
use crate::repr::{Choice, Question, QuestionKind, Translations, TypingTree};

/// Name of the group row opening the typing questions.
pub const GROUP_BEGIN: &str = "typing_begin";
/// Name of the group row closing the typing questions.
pub const GROUP_END: &str = "typing_end";

/// Expand translations into `column::language` columns. An empty language
/// maps to the bare column.
pub fn translated_columns(column: &str, translations: &Translations) -> BTreeMap<String, String> {
    translations
        .iter()
        .map(|(language, text)| {
            let key = if language.is_empty() {
                column.to_string()
            } else {
                format!("{column}::{language}")
            };
            (key, text.clone())
        })
        .collect()
}

// =============================================================================
// Rows
// =============================================================================

/// One row of the `survey` sheet.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SurveyRow {
    #[serde(rename = "type")]
    pub row_type: String,
    pub name: String,
    /// Label, hint and required-message columns.
    #[serde(flatten)]
    pub translated: BTreeMap<String, String>,
    pub calculation: Option<String>,
    pub relevant: Option<String>,
    pub required: Option<bool>,
    pub choice_filter: Option<String>,
}

impl SurveyRow {
    /// Row for a form question.
    pub fn from_question(question: &Question) -> Self {
        let row_type = match (&question.choice_list, question.kind.is_select()) {
            (Some(list), true) => format!("{} {list}", question.kind),
            _ => question.kind.to_string(),
        };

        let mut translated = translated_columns("label", &question.label);
        translated.extend(translated_columns("hint", &question.hint));
        translated.extend(translated_columns("required_message", &question.required_message));

        Self {
            row_type,
            name: question.name.clone(),
            translated,
            calculation: question.calculation.clone(),
            relevant: question.relevant(),
            required: Some(question.required),
            choice_filter: question.choice_filter.clone(),
        }
    }

    pub fn label(&self, language: &str) -> Option<&str> {
        self.translated
            .get(&format!("label::{language}"))
            .map(String::as_str)
    }

    pub fn is_kind(&self, kind: QuestionKind) -> bool {
        self.row_type.split(' ').next() == Some(kind.as_str())
    }
}

/// One row of the `choices` sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceRow {
    pub list_name: String,
    #[serde(rename = "value")]
    pub name: String,
    #[serde(flatten)]
    pub translated: BTreeMap<String, String>,
}

impl ChoiceRow {
    pub fn from_choice(choice: &Choice) -> Self {
        Self {
            list_name: choice.list_name.clone(),
            name: choice.name.clone(),
            translated: translated_columns("label", &choice.label),
        }
    }
}

/// The single row of the `settings` sheet.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsRow {
    pub form_title: Option<String>,
    pub form_id: Option<String>,
    pub default_language: Option<String>,
    pub allow_choice_duplicates: Option<String>,
    pub version: Option<String>,
}

// =============================================================================
// Sheets
// =============================================================================

/// `survey` rows: the typing group wrapping one row per question, in preorder.
pub fn survey_rows(
    tree: &TypingTree,
    group_label: &Translations,
    group_relevant: Option<&str>,
) -> Vec<SurveyRow> {
    let mut rows = vec![SurveyRow {
        row_type: "begin_group".to_string(),
        name: GROUP_BEGIN.to_string(),
        translated: translated_columns("label", group_label),
        relevant: group_relevant.map(str::to_string),
        ..SurveyRow::default()
    }];

    rows.extend(
        tree.preorder()
            .into_iter()
            .filter_map(|id| tree.question(id))
            .map(SurveyRow::from_question),
    );

    rows.push(SurveyRow {
        row_type: "end_group".to_string(),
        name: GROUP_END.to_string(),
        ..SurveyRow::default()
    });
    rows
}

/// `choices` rows of every question that carries choices, in preorder,
/// without duplicates. An elided duplicate has its choice list cleared but
/// keeps the choices of the first asking, so its rows are not repeated.
pub fn choice_rows(tree: &TypingTree) -> Vec<ChoiceRow> {
    let mut rows: Vec<ChoiceRow> = Vec::new();
    for id in tree.preorder() {
        let Some(question) = tree.question(id) else {
            continue;
        };
        for choice in question.choices.iter().flatten() {
            let row = ChoiceRow::from_choice(choice);
            if !rows.contains(&row) {
                rows.push(row);
            }
        }
    }
    rows
}

/// `settings` rows.
pub fn settings_rows(settings: &Settings) -> Vec<SettingsRow> {
    vec![SettingsRow {
        form_title: settings.form_title.clone(),
        form_id: settings.form_id.clone(),
        default_language: settings.default_language.clone(),
        allow_choice_duplicates: settings
            .allow_choice_duplicates
            .map(|allow| if allow { "yes" } else { "no" }.to_string()),
        version: settings.version.clone(),
    }]
}
