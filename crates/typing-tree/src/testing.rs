//! Fixture loading for tests and benchmarks.
//!
//! Fixtures live under `tests/test-cases/` of this crate:
//!
//! - `rpart/<name>.json`: model exports
//! - `config/<name>.json`: typing configurations
//! - `expected/<name>.json`: [`ExpectedForm`] for end-to-end cases

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use serde::Deserialize;

use crate::Result;
use crate::compat::rpart::RpartModel;
use crate::config::TypingConfig;

/// Root of the fixture tree.
pub const CASES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/test-cases");

pub fn case_path(kind: &str, name: &str) -> PathBuf {
    PathBuf::from(CASES_DIR).join(kind).join(format!("{name}.json"))
}

fn reader(kind: &str, name: &str) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(case_path(kind, name))?))
}

pub fn load_model(name: &str) -> Result<RpartModel> {
    Ok(RpartModel::from_reader(reader("rpart", name)?)?)
}

/// Load and check a configuration fixture.
pub fn load_config(name: &str) -> Result<TypingConfig> {
    let config = TypingConfig::from_reader(reader("config", name)?)?;
    config.check()?;
    Ok(config)
}

pub fn load_expected(name: &str) -> Result<ExpectedForm> {
    Ok(serde_json::from_reader(reader("expected", name)?)?)
}

/// Expected outcome of an end-to-end case.
///
/// Question names are random, so rows are compared by type and segment.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpectedForm {
    /// `type` column of every survey row, in order.
    pub row_types: Vec<String>,
    /// Segment literal of every segment `calculate`, in order.
    pub segments: Vec<String>,
    /// `value` column of every choices row, in order.
    #[serde(default)]
    pub choice_values: Vec<String>,
}
