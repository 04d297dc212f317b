//! SQL operator types and conversions

use crate::{Error, Result};
use std::fmt::{self, Display};

/// Operator of a leaf condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator(&'static str);

impl Operator {
    pub const EQ: Self = Operator("=");
    pub const NEQ: Self = Operator("!=");
    pub const GT: Self = Operator(">");
    pub const LT: Self = Operator("<");
    pub const GTE: Self = Operator(">=");
    pub const LTE: Self = Operator("<=");
    pub const LIKE: Self = Operator("like");
    pub const NOT_LIKE: Self = Operator("not like");
    pub const IN: Self = Operator("in");
    pub const NOT_IN: Self = Operator("not in");
    pub const BETWEEN: Self = Operator("between");
    pub const NOT_BETWEEN: Self = Operator("not between");
    pub const IS_NULL: Self = Operator("is null");
    pub const IS_NOT_NULL: Self = Operator("is not null");

    /// Operators that compare a column with exactly one bound value
    pub const COMPARISONS: [Operator; 8] = [
        Self::EQ,
        Self::NEQ,
        Self::GT,
        Self::LT,
        Self::GTE,
        Self::LTE,
        Self::LIKE,
        Self::NOT_LIKE,
    ];

    /// Get the string representation of the operator
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Parse one of the single-value comparison operators
    ///
    /// ```
    /// use ferrule_core::Operator;
    ///
    /// assert_eq!(Operator::parse(">=").unwrap(), Operator::GTE);
    /// assert_eq!(Operator::parse("NOT LIKE").unwrap(), Operator::NOT_LIKE);
    /// assert!(Operator::parse("<=>").is_err());
    /// ```
    pub fn parse(op: &str) -> Result<Self> {
        let normalized = op.trim().to_lowercase();
        Self::COMPARISONS
            .into_iter()
            .find(|candidate| candidate.0 == normalized)
            .ok_or_else(|| {
                Error::invalid_input(format!(
                    "unknown comparison operator '{}', expected one of = != > < >= <= like, not like",
                    op
                ))
            })
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_constants() {
        assert_eq!(Operator::EQ.as_str(), "=");
        assert_eq!(Operator::NEQ.as_str(), "!=");
        assert_eq!(Operator::NOT_LIKE.as_str(), "not like");
        assert_eq!(Operator::IS_NOT_NULL.as_str(), "is not null");
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Operator::GT), ">");
        assert_eq!(format!("{}", Operator::BETWEEN), "between");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Operator::parse("LIKE").unwrap(), Operator::LIKE);
        assert_eq!(Operator::parse(" != ").unwrap(), Operator::NEQ);
    }

    #[test]
    fn test_parse_rejects_non_comparisons() {
        assert!(matches!(
            Operator::parse("in"),
            Err(Error::InvalidInput { .. })
        ));
        assert!(Operator::parse("is null").is_err());
    }
}
