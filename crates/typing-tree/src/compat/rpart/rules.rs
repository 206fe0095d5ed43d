//! Split rule extraction from rpart split records.
//!
//! rpart encodes the split of a node with two numbers:
//! - `ncat`: `-1` or `1` for continuous variables (the sign gives the
//!   direction of the left branch), otherwise the number of levels of a
//!   categorical variable;
//! - `index`: the cutpoint for continuous variables, or a 1-based row of the
//!   `csplit` partition matrix for categorical ones.
//!
//! Each `csplit` row carries one code per level: `1` sends the level left,
//! `3` sends it right and `2` marks a level with no observations at the node.

use ndarray::{Array2, ArrayView1};

use crate::repr::{Operator, SplitRule};

/// Errors raised while decoding rpart records.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("variable '{variable}': ncat = {ncat} is neither ±1 nor a level count")]
    InvalidCategoryCount { variable: String, ncat: i32 },
    #[error("variable '{variable}': csplit index {index} is not a positive integer")]
    InvalidPartitionIndex { variable: String, index: f64 },
    #[error("variable '{variable}': csplit row {row} out of range ({n_rows} rows)")]
    PartitionRowOutOfRange { variable: String, row: usize, n_rows: usize },
    #[error("variable '{variable}' has a categorical split but no levels")]
    MissingLevels { variable: String },
    #[error("variable '{variable}': invalid partition code {code} at level position {position}")]
    InvalidPartitionCode { variable: String, position: usize, code: i32 },
    #[error("variable '{variable}': {levels} levels but csplit rows have {row_len} columns")]
    LevelCountMismatch { variable: String, levels: usize, row_len: usize },
    #[error("csplit row {row} has {actual} columns, expected {expected}")]
    RaggedPartitionTable { row: usize, expected: usize, actual: usize },
    #[error("node {node}: yval {yval} is not a valid index into {n_classes} classes")]
    InvalidClassIndex { node: u32, yval: f64, n_classes: usize },
    #[error("node {node}: yval2 has {actual} values, expected at least {expected}")]
    ShortClassVector { node: u32, expected: usize, actual: usize },
    #[error("node index {0} appears more than once")]
    DuplicateNode(u32),
}

// =============================================================================
// Partition table
// =============================================================================

/// Routing of one categorical level at a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionCode {
    Left,
    Excluded,
    Right,
}

impl PartitionCode {
    /// Decode an rpart `csplit` code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(PartitionCode::Left),
            2 => Some(PartitionCode::Excluded),
            3 => Some(PartitionCode::Right),
            _ => None,
        }
    }
}

/// The `csplit` matrix: one row per categorical split, one column per level.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionTable {
    codes: Array2<i32>,
}

impl PartitionTable {
    /// A table for models without categorical splits.
    pub fn empty() -> Self {
        Self {
            codes: Array2::zeros((0, 0)),
        }
    }

    /// Build the table from row vectors. All rows must have the same length.
    pub fn from_rows(rows: &[Vec<i32>]) -> Result<Self, ParseError> {
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut flat = Vec::with_capacity(rows.len() * n_cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(ParseError::RaggedPartitionTable {
                    row: i + 1,
                    expected: n_cols,
                    actual: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }
        let codes = Array2::from_shape_vec((rows.len(), n_cols), flat)
            .map_err(|_| ParseError::RaggedPartitionTable {
                row: rows.len(),
                expected: n_cols,
                actual: 0,
            })?;
        Ok(Self { codes })
    }

    pub fn n_rows(&self) -> usize {
        self.codes.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.codes.ncols()
    }

    /// Row for a 1-based rpart `index`.
    pub fn row(&self, variable: &str, index: f64) -> Result<ArrayView1<'_, i32>, ParseError> {
        if index < 1.0 || index.fract() != 0.0 || !index.is_finite() {
            return Err(ParseError::InvalidPartitionIndex {
                variable: variable.to_string(),
                index,
            });
        }
        let row = index as usize;
        if row > self.n_rows() {
            return Err(ParseError::PartitionRowOutOfRange {
                variable: variable.to_string(),
                row,
                n_rows: self.n_rows(),
            });
        }
        Ok(self.codes.row(row - 1))
    }
}

// =============================================================================
// Rule extraction
// =============================================================================

/// Comparison operator implied by `ncat`.
pub fn operator_for(variable: &str, ncat: i32) -> Result<Operator, ParseError> {
    match ncat {
        -1 => Ok(Operator::Lt),
        1 => Ok(Operator::Gt),
        n if n >= 2 => Ok(Operator::In),
        _ => Err(ParseError::InvalidCategoryCount {
            variable: variable.to_string(),
            ncat,
        }),
    }
}

/// Levels routed left, right and to neither branch by one partition row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoricalPartition {
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub excluded: Vec<String>,
}

/// Distribute `levels` according to a partition row.
///
/// rpart pads rows with code `2` up to the largest level count of any
/// variable, so trailing positions beyond `levels` must be `2`.
pub fn partition_levels(
    variable: &str,
    row: ArrayView1<'_, i32>,
    levels: &[String],
) -> Result<CategoricalPartition, ParseError> {
    if row.len() < levels.len() {
        return Err(ParseError::LevelCountMismatch {
            variable: variable.to_string(),
            levels: levels.len(),
            row_len: row.len(),
        });
    }

    let mut partition = CategoricalPartition::default();
    for (position, &code) in row.iter().enumerate() {
        let decoded = PartitionCode::from_code(code).ok_or_else(|| {
            ParseError::InvalidPartitionCode {
                variable: variable.to_string(),
                position,
                code,
            }
        })?;

        let Some(level) = levels.get(position) else {
            if decoded == PartitionCode::Excluded {
                continue;
            }
            return Err(ParseError::InvalidPartitionCode {
                variable: variable.to_string(),
                position,
                code,
            });
        };

        let bucket = match decoded {
            PartitionCode::Left => &mut partition.left,
            PartitionCode::Excluded => &mut partition.excluded,
            PartitionCode::Right => &mut partition.right,
        };
        bucket.push(level.clone());
    }
    Ok(partition)
}

/// Extract the left and right rules of one split (in that order).
///
/// Continuous splits produce two rules on the same cutpoint with opposite
/// operators: `ncat == 1` sends `>` left, `ncat == -1` sends `<` left.
/// Categorical splits produce two `in` rules sharing the same excluded set.
pub fn split_rules(
    variable: &str,
    ncat: i32,
    index: f64,
    levels: Option<&[String]>,
    table: &PartitionTable,
) -> Result<(SplitRule, SplitRule), ParseError> {
    let operator = operator_for(variable, ncat)?;

    if operator == Operator::In {
        let levels = levels.ok_or_else(|| ParseError::MissingLevels {
            variable: variable.to_string(),
        })?;
        let row = table.row(variable, index)?;
        let CategoricalPartition {
            left,
            right,
            excluded,
        } = partition_levels(variable, row, levels)?;
        return Ok((
            SplitRule::categorical(variable, left, excluded.clone()),
            SplitRule::categorical(variable, right, excluded),
        ));
    }

    let left = SplitRule::threshold(variable, operator, index);
    let right = SplitRule::threshold(variable, operator.flipped(), index);
    Ok((left, right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::RuleValue;
    use rstest::rstest;

    fn levels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case(-1, Operator::Lt, Operator::Gt)]
    #[case(1, Operator::Gt, Operator::Lt)]
    fn continuous_rules_follow_ncat_sign(
        #[case] ncat: i32,
        #[case] left_op: Operator,
        #[case] right_op: Operator,
    ) {
        let (left, right) =
            split_rules("age", ncat, 10.0, None, &PartitionTable::empty()).unwrap();
        assert_eq!(left.operator, left_op);
        assert_eq!(right.operator, right_op);
        assert_eq!(left.value, RuleValue::Threshold(10.0));
        assert_eq!(right.value, RuleValue::Threshold(10.0));
        assert!(left.excluded.is_empty());
    }

    #[rstest]
    #[case(0)]
    #[case(-2)]
    fn invalid_ncat_is_a_parse_error(#[case] ncat: i32) {
        let err = split_rules("age", ncat, 1.0, None, &PartitionTable::empty()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidCategoryCount { .. }));
    }

    #[test]
    fn categorical_rules_share_excluded_levels() {
        let table = PartitionTable::from_rows(&[vec![3, 3, 1, 2], vec![1, 2, 3, 1]]).unwrap();
        let lv = levels(&["a", "b", "c", "d"]);

        let (left, right) = split_rules("region", 4, 2.0, Some(&lv), &table).unwrap();
        assert_eq!(left.value, RuleValue::Levels(levels(&["a", "d"])));
        assert_eq!(right.value, RuleValue::Levels(levels(&["c"])));
        assert_eq!(left.excluded, ["b"]);
        assert_eq!(right.excluded, ["b"]);
        assert_eq!(left.operator, Operator::In);
    }

    #[test]
    fn padding_beyond_levels_is_skipped() {
        let table = PartitionTable::from_rows(&[vec![1, 3, 2, 2]]).unwrap();
        let lv = levels(&["yes", "no"]);
        let (left, right) = split_rules("flag", 2, 1.0, Some(&lv), &table).unwrap();
        assert_eq!(left.value, RuleValue::Levels(levels(&["yes"])));
        assert_eq!(right.value, RuleValue::Levels(levels(&["no"])));
        assert!(left.excluded.is_empty());
    }

    #[test]
    fn routed_code_beyond_levels_is_rejected() {
        let table = PartitionTable::from_rows(&[vec![1, 3, 1]]).unwrap();
        let lv = levels(&["yes", "no"]);
        let err = split_rules("flag", 2, 1.0, Some(&lv), &table).unwrap_err();
        assert!(matches!(err, ParseError::InvalidPartitionCode { position: 2, .. }));
    }

    #[test]
    fn unknown_code_is_rejected() {
        let table = PartitionTable::from_rows(&[vec![1, 4]]).unwrap();
        let lv = levels(&["a", "b"]);
        let err = split_rules("x", 2, 1.0, Some(&lv), &table).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidPartitionCode {
                variable: "x".into(),
                position: 1,
                code: 4
            }
        );
    }

    #[test]
    fn short_rows_would_drop_levels() {
        let table = PartitionTable::from_rows(&[vec![1, 3]]).unwrap();
        let lv = levels(&["a", "b", "c"]);
        let err = split_rules("x", 3, 1.0, Some(&lv), &table).unwrap_err();
        assert!(matches!(err, ParseError::LevelCountMismatch { .. }));
    }

    #[rstest]
    #[case(0.0)]
    #[case(1.5)]
    #[case(3.0)]
    fn bad_partition_index(#[case] index: f64) {
        let table = PartitionTable::from_rows(&[vec![1, 3], vec![3, 1]]).unwrap();
        let lv = levels(&["a", "b"]);
        assert!(split_rules("x", 2, index, Some(&lv), &table).is_err());
    }

    #[test]
    fn missing_levels_for_categorical() {
        let table = PartitionTable::from_rows(&[vec![1, 3]]).unwrap();
        let err = split_rules("x", 2, 1.0, None, &table).unwrap_err();
        assert!(matches!(err, ParseError::MissingLevels { .. }));
    }

    #[test]
    fn ragged_table_is_rejected() {
        let err = PartitionTable::from_rows(&[vec![1, 3], vec![1]]).unwrap_err();
        assert_eq!(
            err,
            ParseError::RaggedPartitionTable {
                row: 2,
                expected: 2,
                actual: 1
            }
        );
    }
}
