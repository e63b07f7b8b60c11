//! String predicates: glob, regex, and (folded) equality.

use glob::Pattern;
use regex::Regex;
use serde_json::{json, Value};

use crate::error::{ParseError, ParseResult};
use crate::expression;
use crate::matcher::{mismatch, string_arg, unary};

const FORMAT: &str = "[\"glob\", <pattern>] | [\"regex\", <pattern>] | [\"=\"|\"=i\", <string>]";

/// Predicate over strings.
#[derive(Debug, Clone)]
pub enum StringPredicate {
    /// Shell-style glob match.
    Glob {
        /// Compiled pattern.
        pattern: Pattern,
        /// Source text, for marshaling and equality.
        raw: String,
    },
    /// Regular-expression match.
    Regex {
        /// Compiled expression.
        regex: Box<Regex>,
        /// Source text, for marshaling and equality.
        raw: String,
    },
    /// Literal equality, optionally case-folded.
    Equal {
        /// Expected value.
        value: String,
        /// True for case-insensitive comparison.
        fold: bool,
    },
    /// Negation.
    Not(Box<StringPredicate>),
    /// Conjunction.
    And(Vec<StringPredicate>),
    /// Disjunction.
    Or(Vec<StringPredicate>),
}

impl PartialEq for StringPredicate {
    fn eq(&self, other: &Self) -> bool {
        use StringPredicate::*;
        match (self, other) {
            (Glob { raw: a, .. }, Glob { raw: b, .. }) => a == b,
            (Regex { raw: a, .. }, Regex { raw: b, .. }) => a == b,
            (
                Equal { value: a, fold: fa },
                Equal { value: b, fold: fb },
            ) => a == b && fa == fb,
            (Not(a), Not(b)) => a == b,
            (And(a), And(b)) | (Or(a), Or(b)) => a == b,
            _ => false,
        }
    }
}

impl StringPredicate {
    /// Build a glob predicate.
    pub fn glob(pattern: &str) -> ParseResult<Self> {
        let compiled = Pattern::new(pattern)
            .map_err(|e| ParseError::syntax(format!("glob: bad pattern {pattern:?}: {e}")))?;
        Ok(Self::Glob {
            pattern: compiled,
            raw: pattern.to_string(),
        })
    }

    /// Build a regex predicate.
    pub fn regex(pattern: &str) -> ParseResult<Self> {
        let compiled = Regex::new(pattern)
            .map_err(|e| ParseError::syntax(format!("regex: bad pattern {pattern:?}: {e}")))?;
        Ok(Self::Regex {
            regex: Box::new(compiled),
            raw: pattern.to_string(),
        })
    }

    /// Build an equality predicate.
    pub fn equal(value: impl Into<String>) -> Self {
        Self::Equal {
            value: value.into(),
            fold: false,
        }
    }

    /// Build a case-folded equality predicate.
    pub fn equal_fold(value: impl Into<String>) -> Self {
        Self::Equal {
            value: value.into(),
            fold: true,
        }
    }

    /// Parse a string-predicate expression from the wire form.
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
        if let Some(arg) = unary(input, "glob", FORMAT) {
            return Self::glob(&string_arg("glob", &arg?, "the pattern")?);
        }
        if let Some(arg) = unary(input, "regex", FORMAT) {
            return Self::regex(&string_arg("regex", &arg?, "the pattern")?);
        }
        if let Some(arg) = unary(input, "=", FORMAT) {
            return Ok(Self::equal(string_arg("=", &arg?, "the operand")?));
        }
        if let Some(arg) = unary(input, "=i", FORMAT) {
            return Ok(Self::equal_fold(string_arg("=i", &arg?, "the operand")?));
        }
        Err(mismatch("string predicate", FORMAT))
    }

    /// Marshal back to the wire form.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Glob { raw, .. } => json!(["glob", raw]),
            Self::Regex { raw, .. } => json!(["regex", raw]),
            Self::Equal { value, fold: false } => json!(["=", value]),
            Self::Equal { value, fold: true } => json!(["=i", value]),
            Self::Not(inner) => expression::marshal_not(inner.to_value()),
            Self::And(parts) => {
                expression::marshal_nary("AND", parts.iter().map(Self::to_value).collect())
            }
            Self::Or(parts) => {
                expression::marshal_nary("OR", parts.iter().map(Self::to_value).collect())
            }
        }
    }

    /// Evaluate against a string.
    pub fn eval(&self, s: &str) -> bool {
        match self {
            Self::Glob { pattern, .. } => pattern.matches(s),
            Self::Regex { regex, .. } => regex.is_match(s),
            Self::Equal { value, fold: false } => s == value,
            Self::Equal { value, fold: true } => s.eq_ignore_ascii_case(value),
            Self::Not(inner) => !inner.eval(s),
            Self::And(parts) => parts.iter().all(|p| p.eval(s)),
            Self::Or(parts) => parts.iter().any(|p| p.eval(s)),
        }
    }
}
