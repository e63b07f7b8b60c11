//! Time predicates.
//!
//! Operands are timestamps carried on the wire as seconds since the Unix
//! epoch, either as a JSON number or a numeric string. Comparison is at
//! second granularity, matching the attribute exports.

use std::time::SystemTime;

use serde_json::{json, Value};

use prism_core::entry::{epoch_secs, from_epoch_secs};

use crate::error::{ParseError, ParseResult};
use crate::expression;
use crate::matcher::{head_op, mismatch};
use crate::predicate::numeric::Comparison;

const FORMAT: &str = "[<comparison-op>, <epoch-seconds>]";

/// Predicate over timestamps.
#[derive(Debug, Clone, PartialEq)]
pub enum TimePredicate {
    /// A comparison against a reference instant.
    Cmp {
        /// The comparison operator.
        op: Comparison,
        /// The reference instant.
        operand: SystemTime,
    },
    /// Negation.
    Not(Box<TimePredicate>),
    /// Conjunction.
    And(Vec<TimePredicate>),
    /// Disjunction.
    Or(Vec<TimePredicate>),
}

impl TimePredicate {
    /// Build a comparison predicate.
    pub fn cmp(op: Comparison, operand: SystemTime) -> Self {
        Self::Cmp { op, operand }
    }

    /// Parse a time-predicate expression from the wire form.
    pub fn parse(input: &Value) -> ParseResult<Self> {
        expression::parse(
            input,
            &Self::parse_atom,
            &|inner| Self::Not(Box::new(inner)),
            &Self::And,
            &Self::Or,
        )
    }

    fn parse_atom(input: &Value) -> ParseResult<Self> {
        let Some((token, args)) = head_op(input) else {
            return Err(mismatch("time predicate", FORMAT));
        };
        let Some(op) = Comparison::from_token(token) else {
            return Err(mismatch("time predicate", FORMAT));
        };
        let arg = match args {
            [arg] => arg,
            [] => {
                return Err(ParseError::syntax(format!(
                    "{token}: must be formatted as {FORMAT} (missing the timestamp)"
                )))
            }
            _ => {
                return Err(ParseError::syntax(format!(
                    "{token}: must be formatted as {FORMAT}"
                )))
            }
        };
        let secs = parse_epoch(arg).ok_or_else(|| {
            ParseError::syntax(format!("{token}: {arg} is not a valid timestamp"))
        })?;
        Ok(Self::Cmp {
            op,
            operand: from_epoch_secs(secs),
        })
    }

    /// Marshal back to the wire form.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Cmp { op, operand } => json!([op.token(), epoch_secs(*operand)]),
            Self::Not(inner) => expression::marshal_not(inner.to_value()),
            Self::And(parts) => {
                expression::marshal_nary("AND", parts.iter().map(Self::to_value).collect())
            }
            Self::Or(parts) => {
                expression::marshal_nary("OR", parts.iter().map(Self::to_value).collect())
            }
        }
    }

    /// Evaluate against a timestamp, at second granularity.
    pub fn eval(&self, t: SystemTime) -> bool {
        match self {
            Self::Cmp { op, operand } => {
                op.compare(epoch_secs(t).into(), epoch_secs(*operand).into())
            }
            Self::Not(inner) => !inner.eval(t),
            Self::And(parts) => parts.iter().all(|p| p.eval(t)),
            Self::Or(parts) => parts.iter().any(|p| p.eval(t)),
        }
    }
}

fn parse_epoch(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_eval() {
        let wire = json!(["<", 1_550_611_500]);
        let p = TimePredicate::parse(&wire).unwrap();
        assert!(p.eval(from_epoch_secs(1_550_611_448)));
        assert!(!p.eval(from_epoch_secs(1_550_611_510)));
        assert_eq!(p.to_value(), wire);
    }

    #[test]
    fn test_string_operand() {
        let p = TimePredicate::parse(&json!([">=", "100"])).unwrap();
        assert!(p.eval(from_epoch_secs(100)));
        assert!(!p.eval(from_epoch_secs(99)));
    }

    #[test]
    fn test_bad_operand_is_syntax_error() {
        let err = TimePredicate::parse(&json!(["<", "yesterday"])).unwrap_err();
        assert!(!err.is_match());
        assert!(err.to_string().contains("timestamp"), "{err}");
    }

    #[test]
    fn test_not_round_trip() {
        let wire = json!(["NOT", ["=", 100]]);
        let p = TimePredicate::parse(&wire).unwrap();
        assert_eq!(p.to_value(), wire);
        assert!(p.eval(from_epoch_secs(101)));
        assert!(!p.eval(from_epoch_secs(100)));
    }
}
