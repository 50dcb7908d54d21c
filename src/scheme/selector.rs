//! Index/range selector applied to match candidates
//!
//! Grammar: a non-negative index `N`, or a half-open range `A:B` where either
//! bound may be omitted (`A:`, `:B`). Anything else compiles to
//! [`Selector::Invalid`], which never selects anything.

use super::types::SelectorSpec;
use thiserror::Error;

/// A compiled `"[]"` selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Index(usize),
    Range {
        start: Option<usize>,
        end: Option<usize>,
    },
    Invalid(String),
}

/// Reasons a selector yields no candidates
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("index {index} out of range for {len} candidates")]
    OutOfRange { index: usize, len: usize },

    #[error("range selects no candidates out of {len}")]
    EmptyRange { len: usize },

    #[error("unsupported selector '{0}'")]
    Unsupported(String),
}

impl Selector {
    /// Parses a selector expression such as `"0"`, `"1:3"` or `"2:"`
    pub fn parse(expr: &str) -> Self {
        let trimmed = expr.trim();

        match trimmed.split_once(':') {
            None => match trimmed.parse::<usize>() {
                Ok(index) => Selector::Index(index),
                Err(_) => Selector::Invalid(expr.to_string()),
            },
            Some((start, end)) => {
                let start = parse_bound(start);
                let end = parse_bound(end);
                match (start, end) {
                    (Ok(start), Ok(end)) => Selector::Range { start, end },
                    _ => Selector::Invalid(expr.to_string()),
                }
            }
        }
    }

    /// Applies the selector to a candidate list
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<T>)` - The selected, non-empty subset in original order
    /// * `Err(SelectorError)` - Nothing could be selected
    pub fn apply<T: Clone>(&self, candidates: &[T]) -> Result<Vec<T>, SelectorError> {
        let len = candidates.len();

        match self {
            Selector::Index(index) => candidates
                .get(*index)
                .map(|item| vec![item.clone()])
                .ok_or(SelectorError::OutOfRange { index: *index, len }),
            Selector::Range { start, end } => {
                let start = start.unwrap_or(0).min(len);
                let end = end.unwrap_or(len).min(len);
                if start >= end {
                    return Err(SelectorError::EmptyRange { len });
                }
                Ok(candidates[start..end].to_vec())
            }
            Selector::Invalid(expr) => Err(SelectorError::Unsupported(expr.clone())),
        }
    }
}

impl From<&SelectorSpec> for Selector {
    fn from(spec: &SelectorSpec) -> Self {
        match spec {
            SelectorSpec::Index(index) => match usize::try_from(*index) {
                Ok(index) => Selector::Index(index),
                Err(_) => Selector::Invalid(index.to_string()),
            },
            SelectorSpec::Signed(value) => Selector::Invalid(value.to_string()),
            SelectorSpec::Expr(expr) => Selector::parse(expr),
        }
    }
}

fn parse_bound(bound: &str) -> Result<Option<usize>, ()> {
    let bound = bound.trim();
    if bound.is_empty() {
        return Ok(None);
    }
    bound.parse::<usize>().map(Some).map_err(|_| ())
}
