//! Typing form configuration.
//!
//! [`TypingConfig`] maps model variables to form questions and carries the
//! form-level settings. It is read from JSON (see [`TypingConfig::from_json_str`])
//! or assembled with the `bon` builder, which validates on `build()`.
//!
//! # Example
//!
//! ```
//! use typing_tree::config::{QuestionConfig, Settings, TypingConfig};
//! use typing_tree::repr::QuestionKind;
//!
//! let config = TypingConfig::builder()
//!     .questions([("age".to_string(), QuestionConfig::new(QuestionKind::Integer))].into())
//!     .settings(Settings::builder().low_confidence_threshold(0.5).build())
//!     .build()
//!     .unwrap();
//! assert!(config.question("age").is_ok());
//! ```

pub mod template;

use std::collections::BTreeMap;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::repr::{Choice, ModelValue, Question, QuestionKind, SEGMENT, Translations, TypingTree};

/// Default name of the variable that discriminates merged strata.
pub const DEFAULT_MERGE_VARIABLE: &str = "location";

// =============================================================================
// ConfigError
// =============================================================================

/// Errors raised while validating or querying the configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("no question configured for '{0}'")]
    UnknownQuestion(String),
    #[error("question '{question}' uses choice list '{list}', which is not configured")]
    UnknownChoiceList { question: String, list: String },
    #[error("question '{0}' is a select question without a choice list")]
    MissingChoiceList(String),
    #[error("{option} option references question '{question}', which is not configured")]
    UnknownOptionQuestion {
        option: &'static str,
        question: String,
    },
    #[error("low_confidence_threshold must be in [0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error("segment name {0:?} contains both quote characters")]
    UnquotableSegment(String),
}

// =============================================================================
// Questions and choices
// =============================================================================

/// Configuration of one question, keyed by variable identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionConfig {
    pub question_type: QuestionKind,
    #[serde(default)]
    pub label: Translations,
    #[serde(default)]
    pub hint: Translations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_list: Option<String>,
}

impl QuestionConfig {
    pub fn new(question_type: QuestionKind) -> Self {
        Self {
            question_type,
            label: Translations::new(),
            hint: Translations::new(),
            choice_list: None,
        }
    }

    /// A select question answered from `choice_list`.
    pub fn select(question_type: QuestionKind, choice_list: impl Into<String>) -> Self {
        Self {
            choice_list: Some(choice_list.into()),
            ..Self::new(question_type)
        }
    }
}

/// One entry of a choice list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceConfig {
    pub name: String,
    #[serde(default)]
    pub label: Translations,
    /// Model level or number this choice stands for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<ModelValue>,
}

impl ChoiceConfig {
    pub fn new(name: impl Into<String>, target_value: Option<ModelValue>) -> Self {
        Self {
            name: name.into(),
            label: Translations::new(),
            target_value,
        }
    }

    fn to_choice(&self, list_name: &str) -> Choice {
        Choice {
            list_name: list_name.to_string(),
            name: self.name.clone(),
            label: self.label.clone(),
            model_value: self.target_value.clone(),
        }
    }
}

// =============================================================================
// Options
// =============================================================================

/// A structural rewrite applied to every node asking `src_question`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "option", content = "config", rename_all = "snake_case")]
pub enum OptionDirective {
    /// Ask `dst_question` first and compute the source from it.
    Calculate {
        src_question: String,
        dst_question: String,
        calculation: String,
    },
    /// Ask `dst_question_a` then `dst_question_b` and compute the source from both.
    Split {
        src_question: String,
        dst_question_a: String,
        dst_question_b: String,
        calculation: String,
    },
    /// Show the source only when `condition` holds.
    Hide {
        src_question: String,
        condition: String,
    },
}

impl OptionDirective {
    pub fn name(&self) -> &'static str {
        match self {
            OptionDirective::Calculate { .. } => "calculate",
            OptionDirective::Split { .. } => "split",
            OptionDirective::Hide { .. } => "hide",
        }
    }

    pub fn src_question(&self) -> &str {
        match self {
            OptionDirective::Calculate { src_question, .. }
            | OptionDirective::Split { src_question, .. }
            | OptionDirective::Hide { src_question, .. } => src_question,
        }
    }

    /// Questions inserted into the tree by this option, in insertion order.
    pub fn inserted_questions(&self) -> Vec<&str> {
        match self {
            OptionDirective::Calculate { dst_question, .. } => vec![dst_question],
            OptionDirective::Split {
                dst_question_a,
                dst_question_b,
                ..
            } => vec![dst_question_a, dst_question_b],
            OptionDirective::Hide { .. } => Vec::new(),
        }
    }
}

// =============================================================================
// Screening
// =============================================================================

/// Where screening questions go relative to the typing group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    #[default]
    Begin,
    End,
}

/// A question asked outside the typing tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningQuestion {
    pub name: String,
    #[serde(rename = "type")]
    pub question_type: QuestionKind,
    #[serde(default)]
    pub label: Translations,
    #[serde(default)]
    pub hint: Translations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_list: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant: Option<String>,
    #[serde(default, rename = "where")]
    pub placement: Placement,
}

// =============================================================================
// Settings
// =============================================================================

/// Form-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(derive(Clone, Debug))]
#[serde(default)]
pub struct Settings {
    #[builder(into)]
    pub form_title: Option<String>,
    #[builder(into)]
    pub form_id: Option<String>,
    #[builder(into)]
    pub default_language: Option<String>,
    #[builder(into)]
    pub version: Option<String>,
    pub allow_choice_duplicates: Option<bool>,

    /// Message shown when a required question is left empty.
    #[builder(default)]
    pub required_message: Translations,
    /// Note shown once a segment is assigned; `{segment}` is replaced by its name.
    #[builder(default)]
    pub segment_note: Translations,
    /// Appended to the segment note when the assignment is uncertain.
    #[builder(default)]
    pub low_confidence_note: Translations,
    /// Top class probability below which a segment is uncertain. Default: `0`.
    #[builder(default)]
    pub low_confidence_threshold: f64,

    /// Label of the group wrapping the typing questions.
    #[builder(default)]
    pub group_label: Translations,
    #[builder(into)]
    pub group_relevant: Option<String>,

    /// Variable discriminating two merged strata. Default: `location`.
    #[builder(into, default = DEFAULT_MERGE_VARIABLE.to_string())]
    pub merge_variable: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self::builder().build()
    }
}

// =============================================================================
// TypingConfig
// =============================================================================

/// Everything the pipeline needs besides the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
#[serde(default)]
pub struct TypingConfig {
    /// Question per variable identity.
    #[builder(default)]
    pub questions: BTreeMap<String, QuestionConfig>,
    /// Choice lists by name.
    #[builder(default)]
    pub choices: BTreeMap<String, Vec<ChoiceConfig>>,
    /// Rewrites applied in order.
    #[builder(default)]
    pub options: Vec<OptionDirective>,
    /// Segment names: stratum → model class → segment.
    #[builder(default)]
    pub segments: BTreeMap<String, BTreeMap<String, String>>,
    #[builder(default)]
    pub settings: Settings,
    #[builder(default)]
    pub screening: Vec<ScreeningQuestion>,
}

impl<S: typing_config_builder::IsComplete> TypingConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is inconsistent; see
    /// [`TypingConfig::check`].
    pub fn build(self) -> Result<TypingConfig, ConfigError> {
        let config = self.__build_internal();
        config.check()?;
        Ok(config)
    }
}

impl TypingConfig {
    /// Read a configuration from JSON. Call [`check`](Self::check) before use.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }

    /// Check internal consistency:
    /// - the low-confidence threshold is in `[0, 1]`
    /// - select questions name a configured choice list
    /// - segment names can be written as a quoted literal
    /// - options only reference configured questions
    /// - screening choice lists exist
    pub fn check(&self) -> Result<(), ConfigError> {
        let threshold = self.settings.low_confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }

        for (name, question) in &self.questions {
            match &question.choice_list {
                Some(list) if !self.choices.contains_key(list) => {
                    return Err(ConfigError::UnknownChoiceList {
                        question: name.clone(),
                        list: list.clone(),
                    });
                }
                None if question.question_type.is_select() => {
                    return Err(ConfigError::MissingChoiceList(name.clone()));
                }
                _ => {}
            }
        }

        if let Some(name) = self
            .segments
            .values()
            .flat_map(BTreeMap::values)
            .find(|name| name.contains('\'') && name.contains('"'))
        {
            return Err(ConfigError::UnquotableSegment(name.clone()));
        }

        for option in &self.options {
            let referenced = std::iter::once(option.src_question())
                .chain(option.inserted_questions());
            for question in referenced {
                if !self.questions.contains_key(question) {
                    return Err(ConfigError::UnknownOptionQuestion {
                        option: option.name(),
                        question: question.to_string(),
                    });
                }
            }
        }

        for screening in &self.screening {
            if let Some(list) = &screening.choice_list {
                if !self.choices.contains_key(list) {
                    return Err(ConfigError::UnknownChoiceList {
                        question: screening.name.clone(),
                        list: list.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// [`check`](Self::check), then make sure every split node of `tree` has
    /// a configured question.
    pub fn validate(&self, tree: &TypingTree) -> Result<(), ConfigError> {
        self.check()?;
        for id in tree.preorder() {
            let node = tree.node(id);
            if node.question.is_none() && node.name != SEGMENT {
                self.question(&node.name)?;
            }
        }
        Ok(())
    }

    pub fn question(&self, name: &str) -> Result<&QuestionConfig, ConfigError> {
        self.questions
            .get(name)
            .ok_or_else(|| ConfigError::UnknownQuestion(name.to_string()))
    }

    /// Choices of a list, in configuration order.
    pub fn choice_list(&self, list: &str) -> Option<Vec<Choice>> {
        self.choices
            .get(list)
            .map(|entries| entries.iter().map(|c| c.to_choice(list)).collect())
    }

    /// Build the form question for variable `name`, named `uid`.
    pub fn build_question(&self, name: &str, uid: &str) -> Result<Question, ConfigError> {
        let config = self.question(name)?;
        let mut question = Question::new(uid, config.question_type);
        question.label = config.label.clone();
        question.hint = config.hint.clone();
        if let Some(list) = &config.choice_list {
            let choices = self
                .choice_list(list)
                .ok_or_else(|| ConfigError::UnknownChoiceList {
                    question: name.to_string(),
                    list: list.clone(),
                })?;
            question.choice_list = Some(list.clone());
            question.choices = Some(choices);
        }
        Ok(question)
    }

    /// Segment name of a model class, through the stratum's rename table.
    pub fn segment_name(&self, stratum: Option<&str>, class: &str) -> String {
        stratum
            .and_then(|s| self.segments.get(s))
            .and_then(|mapping| mapping.get(class))
            .cloned()
            .unwrap_or_else(|| class.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_json() -> &'static str {
        r#"{
            "questions": {
                "age": {"question_type": "integer", "label": {"English (en)": "Age?"}},
                "ed_lev3": {"question_type": "select_one", "choice_list": "education"}
            },
            "choices": {
                "education": [
                    {"name": "none", "label": {"English (en)": "None"}, "target_value": "none"},
                    {"name": "primary", "target_value": "primary"},
                    {"name": "level_2", "target_value": 2}
                ]
            },
            "options": [
                {"option": "hide", "config": {"src_question": "age", "condition": "${ed_lev3} = 'none'"}}
            ],
            "segments": {"rural": {"1": "Farmers"}},
            "settings": {"form_title": "Typing", "low_confidence_threshold": 0.6},
            "screening": [
                {"name": "consent", "type": "select_one", "choice_list": "education", "where": "end"}
            ]
        }"#
    }

    #[test]
    fn parses_json_config() {
        let config = TypingConfig::from_json_str(config_json()).unwrap();
        config.check().unwrap();

        assert_eq!(config.question("age").unwrap().question_type, QuestionKind::Integer);
        assert_eq!(config.settings.merge_variable, DEFAULT_MERGE_VARIABLE);
        assert_eq!(config.settings.form_title.as_deref(), Some("Typing"));
        assert!(matches!(config.options[0], OptionDirective::Hide { .. }));
        assert_eq!(config.screening[0].placement, Placement::End);

        let choices = config.choice_list("education").unwrap();
        assert_eq!(choices[2].model_value, Some(ModelValue::Number(2.0)));
        assert_eq!(choices[0].list_name, "education");
    }

    #[test]
    fn build_question_attaches_choices() {
        let config = TypingConfig::from_json_str(config_json()).unwrap();
        let q = config.build_question("ed_lev3", "ed_lev3_abc123").unwrap();
        assert_eq!(q.name, "ed_lev3_abc123");
        assert_eq!(q.kind, QuestionKind::SelectOne);
        assert_eq!(q.choice_list.as_deref(), Some("education"));
        assert_eq!(q.choices.unwrap().len(), 3);

        assert_eq!(
            config.build_question("income", "x").unwrap_err(),
            ConfigError::UnknownQuestion("income".into())
        );
    }

    #[test]
    fn segment_names_use_stratum_table() {
        let config = TypingConfig::from_json_str(config_json()).unwrap();
        assert_eq!(config.segment_name(Some("rural"), "1"), "Farmers");
        assert_eq!(config.segment_name(Some("urban"), "1"), "1");
        assert_eq!(config.segment_name(None, "2"), "2");
    }

    #[test]
    fn builder_validates_threshold() {
        let result = TypingConfig::builder()
            .settings(Settings::builder().low_confidence_threshold(70.0).build())
            .build();
        assert_eq!(result.unwrap_err(), ConfigError::InvalidThreshold(70.0));
    }

    #[test]
    fn segment_names_must_be_quotable() {
        let mut config = TypingConfig::from_json_str(config_json()).unwrap();
        config.segments.insert(
            "urban".into(),
            [("2".to_string(), "Traders' \"own\"".to_string())].into(),
        );
        assert_eq!(
            config.check().unwrap_err(),
            ConfigError::UnquotableSegment("Traders' \"own\"".into())
        );
    }

    #[test]
    fn select_without_list_is_rejected() {
        let result = TypingConfig::builder()
            .questions([("ed".to_string(), QuestionConfig::new(QuestionKind::SelectOne))].into())
            .build();
        assert_eq!(result.unwrap_err(), ConfigError::MissingChoiceList("ed".into()));
    }

    #[test]
    fn options_must_reference_configured_questions() {
        let result = TypingConfig::builder()
            .questions([("age".to_string(), QuestionConfig::new(QuestionKind::Integer))].into())
            .options(vec![OptionDirective::Calculate {
                src_question: "age".into(),
                dst_question: "birth_year".into(),
                calculation: "2024 - ${birth_year}".into(),
            }])
            .build();
        assert_eq!(
            result.unwrap_err(),
            ConfigError::UnknownOptionQuestion {
                option: "calculate",
                question: "birth_year".into()
            }
        );
    }

    #[test]
    fn validate_requires_questions_for_split_nodes() {
        let config = TypingConfig::from_json_str(config_json()).unwrap();
        let mut tree = TypingTree::new("income");
        let leaf = tree.create_node(SEGMENT);
        tree.add_child(tree.root(), leaf).unwrap();
        assert_eq!(
            config.validate(&tree).unwrap_err(),
            ConfigError::UnknownQuestion("income".into())
        );
    }
}
