//! The full model-to-form pipeline.
//!
//! # Example
//!
//! ```no_run
//! use typing_tree::compat::rpart::RpartModel;
//! use typing_tree::config::TypingConfig;
//! use typing_tree::pipeline::TypingPipeline;
//!
//! let model = RpartModel::from_json_str(&std::fs::read_to_string("model.json")?)?;
//! let config = TypingConfig::from_json_str(&std::fs::read_to_string("config.json")?)?;
//! let form = TypingPipeline::new(config).run(&[("rural", &model)])?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::Serialize;
use tracing::info;

use crate::compat::rpart::RpartModel;
use crate::config::TypingConfig;
use crate::emit::{ChoiceRow, SettingsRow, SurveyRow, choice_rows, settings_rows, survey_rows};
use crate::emit::screening::{add_screening_choices, add_screening_questions};
use crate::merge::{Discriminator, merge_trees};
use crate::passes;
use crate::repr::TypingTree;
use crate::{Error, Result};

/// Rows of the three XLSForm sheets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormRows {
    pub survey: Vec<SurveyRow>,
    pub choices: Vec<ChoiceRow>,
    pub settings: Vec<SettingsRow>,
}

/// Runs the rewrite passes in their fixed order under one configuration.
#[derive(Debug, Clone)]
pub struct TypingPipeline {
    config: TypingConfig,
}

impl TypingPipeline {
    pub fn new(config: TypingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TypingConfig {
        &self.config
    }

    /// Build one tree per stratum, merging two strata under the configured
    /// merge variable.
    pub fn build(&self, strata: &[(&str, &RpartModel)]) -> Result<TypingTree> {
        let trees = strata
            .iter()
            .map(|(label, model)| model.to_typing_tree(label))
            .collect::<Result<Vec<_>>>()?;

        match (trees.as_slice(), strata) {
            ([tree], _) => Ok(tree.clone()),
            ([left, right], [(left_label, _), (right_label, _)]) => {
                let discriminator = Discriminator::new(
                    &self.config.settings.merge_variable,
                    *left_label,
                    *right_label,
                );
                Ok(merge_trees(left, right, &discriminator)?)
            }
            _ => Err(Error::StrataCount(strata.len())),
        }
    }

    /// Build the tree for `strata` and rewrite it into the final form tree.
    pub fn run(&self, strata: &[(&str, &RpartModel)]) -> Result<TypingTree> {
        let tree = self.build(strata)?;
        info!(strata = strata.len(), nodes = tree.len(), "built model tree");
        self.rewrite(&tree)
    }

    /// Apply every pass to an already built tree.
    pub fn rewrite(&self, tree: &TypingTree) -> Result<TypingTree> {
        let config = &self.config;
        config.validate(tree)?;

        let tree = passes::attach_questions(tree, config)?;
        let tree = passes::derive_conditions(&tree)?;
        let tree = passes::apply_options(&tree, config)?;
        let tree = passes::set_choice_filters(&tree);
        let tree = passes::skip_duplicate_questions(&tree);
        let tree = passes::resolve_dead_ends(&tree, config)?;
        let tree = passes::add_segment_notes(&tree, &config.settings)?;
        let tree = passes::enforce_relevance(&tree)?;
        let tree = passes::mark_required(&tree, &config.settings);

        info!(nodes = tree.len(), "form tree ready");
        Ok(tree)
    }

    /// Sheet rows for a form tree, including screening questions.
    pub fn rows(&self, tree: &TypingTree) -> Result<FormRows> {
        let settings = &self.config.settings;
        let survey = survey_rows(tree, &settings.group_label, settings.group_relevant.as_deref());
        let survey = add_screening_questions(survey, &self.config.screening, settings);
        let choices = add_screening_choices(choice_rows(tree), &self.config)?;
        Ok(FormRows {
            survey,
            choices,
            settings: settings_rows(settings),
        })
    }
}
