//! Configuration skeleton generated from a model export.
//!
//! Lists every split variable of the model as a question, with a choice list
//! per categorical variable. Labels are left empty for the form author.

use std::collections::BTreeMap;

use crate::compat::rpart::RpartModel;
use crate::repr::{ModelValue, QuestionKind, Translations, normalize_identity};

use super::{ChoiceConfig, QuestionConfig, TypingConfig};

/// Choice list shared by binary (`0`/`1`) variables.
pub const YES_NO_LIST: &str = "yesno";

/// Make a string usable as an XLSForm name: ASCII alphanumerics and `_`,
/// lower-case, not starting with a digit.
pub fn to_ascii_name(src: &str) -> String {
    let mut name: String = src
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name.to_lowercase().replace("__", "_")
}

fn empty_translations(languages: &[&str]) -> Translations {
    languages
        .iter()
        .map(|lang| (lang.to_string(), String::new()))
        .collect()
}

fn is_binary(levels: &[String]) -> bool {
    let mut sorted: Vec<&str> = levels.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted == ["0", "1"]
}

/// Cutpoints of continuous splits on `variable`.
fn cutpoints<'a>(model: &'a RpartModel, variable: &'a str) -> impl Iterator<Item = f64> + 'a {
    model
        .nodes
        .iter()
        .filter(move |n| n.var == variable && n.ncat.abs() == 1)
        .map(|n| n.index)
}

/// Generate a configuration skeleton for `model`.
///
/// Categorical variables become `select_one` questions (binary ones share the
/// `yesno` list); continuous variables become `integer` when every cutpoint
/// falls on a half-unit (rpart splits integers between two values), otherwise
/// `decimal`.
pub fn config_template(model: &RpartModel, languages: &[&str]) -> TypingConfig {
    let mut questions = BTreeMap::new();
    let mut choices: BTreeMap<String, Vec<ChoiceConfig>> = BTreeMap::new();

    let mut variables = model.split_variables();
    variables.sort_unstable();

    for variable in variables {
        let name = to_ascii_name(&normalize_identity(variable));
        let mut question = match model.xlevels.get(variable) {
            Some(levels) if is_binary(levels) => {
                choices.entry(YES_NO_LIST.to_string()).or_insert_with(|| {
                    [("yes", 1.0), ("no", 0.0)]
                        .into_iter()
                        .map(|(choice, value)| {
                            let mut c = ChoiceConfig::new(choice, Some(ModelValue::Number(value)));
                            c.label = empty_translations(languages);
                            c
                        })
                        .collect()
                });
                QuestionConfig::select(QuestionKind::SelectOne, YES_NO_LIST)
            }
            Some(levels) => {
                let mut sorted = levels.clone();
                sorted.sort();
                let list = sorted
                    .into_iter()
                    .map(|level| {
                        let mut c = ChoiceConfig::new(
                            to_ascii_name(&level),
                            Some(ModelValue::Text(level)),
                        );
                        c.label = empty_translations(languages);
                        c
                    })
                    .collect();
                choices.insert(name.clone(), list);
                QuestionConfig::select(QuestionKind::SelectOne, name.clone())
            }
            None => {
                let integral = cutpoints(model, variable).all(|c| (c * 2.0).fract() == 0.0);
                let kind = if integral {
                    QuestionKind::Integer
                } else {
                    QuestionKind::Decimal
                };
                QuestionConfig::new(kind)
            }
        };
        question.label = empty_translations(languages);
        question.hint = empty_translations(languages);
        questions.insert(name, question);
    }

    TypingConfig {
        questions,
        choices,
        ..TypingConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Ed.Lev3", "ed_lev3")]
    #[case("2 rooms", "_2_rooms")]
    #[case("école", "_cole")]
    #[case("a  b", "a_b")]
    fn ascii_names(#[case] src: &str, #[case] expected: &str) {
        assert_eq!(to_ascii_name(src), expected);
    }

    #[test]
    fn template_covers_split_variables() {
        let json = r#"{
            "nodes": [
                {"node": 1, "var": "age", "ncat": -1, "index": 30.5, "yval": 1,
                 "yval2": [1, 6, 4, 0.6, 0.4, 1.0]},
                {"node": 2, "var": "ed.lev3", "ncat": 3, "index": 1, "yval": 1,
                 "yval2": [1, 5, 1, 0.83, 0.17, 0.6]},
                {"node": 3, "var": "owns.land", "ncat": 2, "index": 2, "yval": 2,
                 "yval2": [2, 1, 3, 0.25, 0.75, 0.4]},
                {"node": 4, "var": "income", "ncat": 1, "index": 1250.75, "yval": 1,
                 "yval2": [1, 1, 3, 0.25, 0.75, 0.4]}
            ],
            "ylevels": ["1", "2"],
            "xlevels": {"ed.lev3": ["secondary", "none", "primary"], "owns.land": ["0", "1"]},
            "csplit": [[1, 2, 3], [1, 3, 2]]
        }"#;
        let model = RpartModel::from_json_str(json).unwrap();
        let config = config_template(&model, &["English (en)"]);

        assert_eq!(
            config.questions.keys().collect::<Vec<_>>(),
            ["age", "ed_lev3", "income", "owns_land"]
        );
        assert_eq!(config.questions["age"].question_type, QuestionKind::Integer);
        assert_eq!(config.questions["income"].question_type, QuestionKind::Decimal);
        assert_eq!(config.questions["owns_land"].choice_list.as_deref(), Some(YES_NO_LIST));
        assert_eq!(config.questions["age"].label["English (en)"], "");

        let education: Vec<&str> = config.choices["ed_lev3"]
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(education, ["none", "primary", "secondary"]);
        assert_eq!(config.choices[YES_NO_LIST].len(), 2);
        config.check().unwrap();
    }
}
