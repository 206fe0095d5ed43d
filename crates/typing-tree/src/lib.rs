//! typing-tree: survey typing forms from classification trees.
//!
//! Turns a fitted `rpart` classification tree into the logic of an XLSForm
//! questionnaire that assigns respondents to segments: question order,
//! per-question relevance, choice filtering and segment notes.
//!
//! # Key Types
//!
//! - [`RpartModel`] - Model export as read from JSON
//! - [`TypingTree`](repr::TypingTree) - Arena tree every rewrite pass works on
//! - [`TypingConfig`] - Questions, choices, options and form settings
//! - [`TypingPipeline`] - Runs the passes in order and produces sheet rows
//!
//! # Pipeline
//!
//! Build one tree per stratum with [`TypingPipeline::build`] (two strata are
//! merged under a location question), then rewrite it with
//! [`TypingPipeline::rewrite`]. See the [`passes`] module for the order.
//!
//! # Output
//!
//! [`emit`] turns the finished tree into `survey`, `choices` and `settings`
//! rows and Mermaid flowcharts.

pub mod compat;
pub mod config;
pub mod emit;
pub mod error;
pub mod merge;
pub mod passes;
pub mod pipeline;
pub mod relevance;
pub mod repr;
pub mod testing;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use compat::rpart::RpartModel;
pub use config::{Settings, TypingConfig};
pub use error::{Error, Result};
pub use pipeline::{FormRows, TypingPipeline};
