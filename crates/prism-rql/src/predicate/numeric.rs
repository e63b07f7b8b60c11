//! Numeric predicates with decimal semantics.
//!
//! Operands are arbitrary-precision decimals so comparisons never drift
//! through floats at the predicate boundary. The wire form carries the
//! operand as a string (`["<=", "42"]`); plain JSON numbers are also
//! accepted.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::error::{ParseError, ParseResult};
use crate::expression;
use crate::matcher::{head_op, mismatch};

const FORMAT: &str = "[<comparison-op>, <number>]";

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Equal.
    Eql,
    /// Not equal.
    Neql,
}

impl Comparison {
    /// The operator's wire token.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Eql => "=",
            Self::Neql => "!=",
        }
    }

    /// Parse a wire token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Lte),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Gte),
            "=" => Some(Self::Eql),
            "!=" => Some(Self::Neql),
            _ => None,
        }
    }

    /// Apply the comparison.
    pub fn compare(&self, lhs: Decimal, rhs: Decimal) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Lte => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Gte => lhs >= rhs,
            Self::Eql => lhs == rhs,
            Self::Neql => lhs != rhs,
        }
    }
}

/// Predicate over numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericPredicate {
    /// A comparison against a decimal operand.
    Cmp {
        /// The comparison operator.
        op: Comparison,
        /// The right-hand operand.
        operand: Decimal,
    },
    /// Negation.
    Not(Box<NumericPredicate>),
    /// Conjunction.
    And(Vec<NumericPredicate>),
    /// Disjunction.
    Or(Vec<NumericPredicate>),
}

impl NumericPredicate {
    /// Build a comparison predicate.
    pub fn cmp(op: Comparison, operand: Decimal) -> Self {
        Self::Cmp { op, operand }
    }

    /// Parse a numeric-predicate expression from the wire form.
    pub fn parse(input: &Value) -> ParseResult<Self> {
        Self::parse_mode(input, false)
    }

    /// Parse with the unsigned refinement: negative operands are rejected
    /// at unmarshal time. Used for sizes and modes.
    pub fn parse_unsigned(input: &Value) -> ParseResult<Self> {
        Self::parse_mode(input, true)
    }

    fn parse_mode(input: &Value, unsigned: bool) -> ParseResult<Self> {
        expression::parse(
            input,
            &|v| Self::parse_atom(v, unsigned),
            &|inner| Self::Not(Box::new(inner)),
            &Self::And,
            &Self::Or,
        )
    }

    fn parse_atom(input: &Value, unsigned: bool) -> ParseResult<Self> {
        let Some((token, args)) = head_op(input) else {
            return Err(mismatch("numeric predicate", FORMAT));
        };
        let Some(op) = Comparison::from_token(token) else {
            return Err(mismatch("numeric predicate", FORMAT));
        };
        let arg = match args {
            [arg] => arg,
            [] => {
                return Err(ParseError::syntax(format!(
                    "{token}: must be formatted as {FORMAT} (missing the number)"
                )))
            }
            _ => {
                return Err(ParseError::syntax(format!(
                    "{token}: must be formatted as {FORMAT}"
                )))
            }
        };
        let operand = parse_decimal(arg).ok_or_else(|| {
            ParseError::syntax(format!("{token}: {arg} is not a valid number"))
        })?;
        if unsigned && operand.is_sign_negative() && !operand.is_zero() {
            return Err(ParseError::syntax(format!(
                "{token}: {operand} must be an unsigned (non-negative) number"
            )));
        }
        Ok(Self::Cmp { op, operand })
    }

    /// Marshal back to the wire form. The operand goes out as a string to
    /// preserve precision.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Cmp { op, operand } => json!([op.token(), operand.to_string()]),
            Self::Not(inner) => expression::marshal_not(inner.to_value()),
            Self::And(parts) => {
                expression::marshal_nary("AND", parts.iter().map(Self::to_value).collect())
            }
            Self::Or(parts) => {
                expression::marshal_nary("OR", parts.iter().map(Self::to_value).collect())
            }
        }
    }

    /// Evaluate against a decimal.
    pub fn eval(&self, n: Decimal) -> bool {
        match self {
            Self::Cmp { op, operand } => op.compare(n, *operand),
            Self::Not(inner) => !inner.eval(n),
            Self::And(parts) => parts.iter().all(|p| p.eval(n)),
            Self::Or(parts) => parts.iter().any(|p| p.eval(n)),
        }
    }

    /// Evaluate against a JSON number.
    pub fn eval_json(&self, n: &serde_json::Number) -> bool {
        match decimal_of_json(n) {
            Some(d) => self.eval(d),
            None => false,
        }
    }
}

/// Convert a wire operand (string or JSON number) into a decimal.
fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => decimal_of_json(n),
        _ => None,
    }
}

/// Convert a JSON number into a decimal, exactly for integers and via the
/// shortest decimal rendering for floats.
pub fn decimal_of_json(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    Decimal::from_str(&n.to_string()).ok()
}
