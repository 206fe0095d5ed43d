//! Crate-level error type.

use crate::compat::rpart::{BuildError, ParseError};
use crate::config::ConfigError;
use crate::emit::mermaid::DiagramError;
use crate::relevance::RelevanceError;
use crate::repr::TreeError;

/// Any error raised while turning a model into a typing form.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid model export: {0}")]
    Parse(#[from] ParseError),
    #[error("cannot build tree: {0}")]
    Build(#[from] BuildError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Relevance(#[from] RelevanceError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Diagram(#[from] DiagramError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("expected one or two strata, got {0}")]
    StrataCount(usize),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
