//! Numeric range predicates such as `"5-100"` or `"< 100, 150-175, > 200"`.
//!
//! An expression is a comma-separated list of clauses and a value satisfies
//! the expression when it satisfies any clause:
//!
//! - `lower-upper` - inclusive on both ends
//! - `>n` - strictly greater than `n`
//! - `<n` - strictly less than `n`
//!
//! Evaluation is tolerant. A clause that fits none of the shapes never
//! matches and never fails; use [`RangeExpression::validate`] to surface
//! such clauses to the user.

use serde::{Deserialize, Serialize};

use crate::text::first_integer;

/// A parsed-on-demand range expression taken from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeExpression(String);

impl RangeExpression {
    /// Wraps an expression string.
    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        Self(expression.into())
    }

    /// Returns the raw expression text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the expression is blank and therefore places no
    /// constraint on the value.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Tests `value` against the expression.
    #[must_use]
    pub fn matches(&self, value: u64) -> bool {
        evaluate(value, &self.0)
    }

    /// Returns every clause that cannot match any value.
    ///
    /// A blank expression has no clauses and validates cleanly.
    #[must_use]
    pub fn validate(&self) -> Vec<RangeClauseError> {
        if self.is_unconstrained() {
            return Vec::new();
        }

        self.0
            .split(',')
            .map(str::trim)
            .filter(|clause| Clause::parse(clause).is_empty())
            .map(|clause| RangeClauseError {
                clause: clause.to_string(),
            })
            .collect()
    }
}

impl std::fmt::Display for RangeExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RangeExpression {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A clause in a range expression that fits none of the accepted shapes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("range clause '{clause}' is not a bound pair, '>n' or '<n' and will never match")]
pub struct RangeClauseError {
    /// The offending clause, trimmed.
    pub clause: String,
}

/// Returns `true` if `value` satisfies at least one clause of `expression`.
///
/// A blank expression is satisfied by every value.
#[must_use]
pub fn evaluate(value: u64, expression: &str) -> bool {
    if expression.trim().is_empty() {
        return true;
    }

    expression
        .split(',')
        .any(|clause| Clause::parse(clause.trim()).iter().any(|c| c.contains(value)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Between(u64, u64),
    Above(u64),
    Below(u64),
}

impl Clause {
    /// A clause may carry more than one marker (`"4-6 >"`); each recognised
    /// reading is returned and any of them may match.
    fn parse(text: &str) -> Vec<Self> {
        let mut readings = Vec::with_capacity(1);

        if let Some((lower, upper)) = text.split_once('-')
            && let (Ok(lower), Ok(upper)) = (lower.trim().parse(), upper.trim().parse())
        {
            readings.push(Self::Between(lower, upper));
        }

        if text.contains('>')
            && let Some(bound) = first_integer(text)
        {
            readings.push(Self::Above(bound));
        }

        if text.contains('<')
            && let Some(bound) = first_integer(text)
        {
            readings.push(Self::Below(bound));
        }

        readings
    }

    const fn contains(self, value: u64) -> bool {
        match self {
            Self::Between(lower, upper) => lower <= value && value <= upper,
            Self::Above(bound) => value > bound,
            Self::Below(bound) => value < bound,
        }
    }
}
