//! Output adapters for a finished form tree.
//!
//! - [`xlsform`]: `survey`, `choices` and `settings` sheet rows
//! - [`screening`]: questions asked outside the typing group
//! - [`mermaid`]: flowchart text for the model and the form

pub mod mermaid;
pub mod screening;
pub mod xlsform;

pub use mermaid::{DiagramError, DiagramOptions, cart_diagram, form_diagram};
pub use xlsform::{ChoiceRow, SettingsRow, SurveyRow, choice_rows, settings_rows, survey_rows};
