//! Value predicates: recursive predicates over JSON-like values.
//!
//! Wire shapes:
//!
//! - `null` and `true`/`false` literals for the null and boolean atoms,
//! - `["string", <string-predicate>]`,
//! - `["number", <numeric-predicate>]`,
//! - `["object", [["key", <name>], <value-predicate>]]`,
//! - `["array", ["any", <value-predicate>]]` or
//!   `["array", [["index", <n>], <value-predicate>]]`.

use serde_json::{json, Value};

use crate::error::{ParseError, ParseResult};
use crate::expression;
use crate::matcher::{mismatch, unary};
use crate::predicate::numeric::NumericPredicate;
use crate::predicate::string::StringPredicate;

const FORMAT: &str = "null | <boolean> | [\"string\"|\"number\"|\"object\"|\"array\", ...]";

/// Selector for array-element predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArraySelector {
    /// Logical OR over all elements.
    Any,
    /// A single element by index; out-of-range evaluates to false.
    Index(usize),
}

/// Predicate over JSON values.
#[derive(Debug, Clone, PartialEq)]
pub enum ValuePredicate {
    /// Matches JSON null. Marshals as the literal `null`.
    Null,
    /// Matches a boolean literal.
    Boolean(bool),
    /// Matches strings against a string predicate.
    String(StringPredicate),
    /// Matches numbers against a numeric predicate.
    Number(NumericPredicate),
    /// Descends into the first (case-folded) matching object key.
    Object {
        /// The key selector.
        key: String,
        /// Predicate over the selected value.
        predicate: Box<ValuePredicate>,
    },
    /// Descends into array elements.
    Array {
        /// Which element(s) to test.
        selector: ArraySelector,
        /// Predicate over the selected element(s).
        predicate: Box<ValuePredicate>,
    },
    /// Negation.
    Not(Box<ValuePredicate>),
    /// Conjunction.
    And(Vec<ValuePredicate>),
    /// Disjunction.
    Or(Vec<ValuePredicate>),
}

impl ValuePredicate {
    /// Build an object-key predicate.
    pub fn object(key: impl Into<String>, predicate: ValuePredicate) -> Self {
        Self::Object {
            key: key.into(),
            predicate: Box::new(predicate),
        }
    }

    /// Build an array-element predicate.
    pub fn array(selector: ArraySelector, predicate: ValuePredicate) -> Self {
        Self::Array {
            selector,
            predicate: Box::new(predicate),
        }
    }

    /// Parse a value-predicate expression from the wire form.
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
        match input {
            Value::Null => return Ok(Self::Null),
            Value::Bool(b) => return Ok(Self::Boolean(*b)),
            _ => {}
        }
        if let Some(arg) = unary(input, "string", "[\"string\", <string-predicate>]") {
            let parsed = StringPredicate::parse(&arg?).map_err(|e| {
                ParseError::syntax(format!("string: error unmarshaling the string predicate: {e}"))
            })?;
            return Ok(Self::String(parsed));
        }
        if let Some(arg) = unary(input, "number", "[\"number\", <numeric-predicate>]") {
            let parsed = NumericPredicate::parse(&arg?).map_err(|e| {
                ParseError::syntax(format!(
                    "number: error unmarshaling the numeric predicate: {e}"
                ))
            })?;
            return Ok(Self::Number(parsed));
        }
        if let Some(arg) = unary(
            input,
            "object",
            "[\"object\", [[\"key\", <name>], <value-predicate>]]",
        ) {
            return Self::parse_object(&arg?);
        }
        if let Some(arg) = unary(
            input,
            "array",
            "[\"array\", [<selector>, <value-predicate>]]",
        ) {
            return Self::parse_array(&arg?);
        }
        Err(mismatch("value predicate", FORMAT))
    }

    fn parse_object(element: &Value) -> ParseResult<Self> {
        const EFMT: &str = "object: must be formatted as [[\"key\", <name>], <value-predicate>]";
        let parts = element
            .as_array()
            .ok_or_else(|| ParseError::syntax(EFMT))?;
        let [selector, predicate] = parts.as_slice() else {
            return Err(ParseError::syntax(if parts.len() < 2 {
                format!("{EFMT} (missing the value predicate)")
            } else {
                EFMT.to_string()
            }));
        };
        let selector = selector
            .as_array()
            .ok_or_else(|| ParseError::syntax(EFMT))?;
        match selector.as_slice() {
            [head, key] if head == "key" => {
                let key = key
                    .as_str()
                    .ok_or_else(|| ParseError::syntax("object: the key must be a string"))?;
                let predicate = Self::parse(predicate).map_err(ParseError::into_syntax)?;
                Ok(Self::object(key, predicate))
            }
            [head] if head == "key" => {
                Err(ParseError::syntax("object: missing the key in the selector"))
            }
            _ => Err(ParseError::syntax(EFMT)),
        }
    }

    fn parse_array(element: &Value) -> ParseResult<Self> {
        const EFMT: &str =
            "array: must be formatted as [\"any\" | [\"index\", <n>], <value-predicate>]";
        let parts = element
            .as_array()
            .ok_or_else(|| ParseError::syntax(EFMT))?;
        let [selector, predicate] = parts.as_slice() else {
            return Err(ParseError::syntax(if parts.len() < 2 {
                format!("{EFMT} (missing the value predicate)")
            } else {
                EFMT.to_string()
            }));
        };
        let selector = match selector {
            Value::String(s) if s == "any" => ArraySelector::Any,
            Value::Array(indexed) => match indexed.as_slice() {
                [head, index] if head == "index" => {
                    let index = index.as_u64().ok_or_else(|| {
                        ParseError::syntax("array: the index must be a non-negative integer")
                    })?;
                    ArraySelector::Index(index as usize)
                }
                _ => return Err(ParseError::syntax(EFMT)),
            },
            _ => return Err(ParseError::syntax(EFMT)),
        };
        let predicate = Self::parse(predicate).map_err(ParseError::into_syntax)?;
        Ok(Self::array(selector, predicate))
    }

    /// Marshal back to the wire form.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Boolean(b) => json!(b),
            Self::String(sp) => json!(["string", sp.to_value()]),
            Self::Number(np) => json!(["number", np.to_value()]),
            Self::Object { key, predicate } => {
                json!(["object", [["key", key], predicate.to_value()]])
            }
            Self::Array {
                selector: ArraySelector::Any,
                predicate,
            } => json!(["array", ["any", predicate.to_value()]]),
            Self::Array {
                selector: ArraySelector::Index(n),
                predicate,
            } => json!(["array", [["index", n], predicate.to_value()]]),
            Self::Not(inner) => expression::marshal_not(inner.to_value()),
            Self::And(parts) => {
                expression::marshal_nary("AND", parts.iter().map(Self::to_value).collect())
            }
            Self::Or(parts) => {
                expression::marshal_nary("OR", parts.iter().map(Self::to_value).collect())
            }
        }
    }

    /// Evaluate against a JSON value.
    pub fn eval(&self, value: &Value) -> bool {
        match self {
            Self::Null => value.is_null(),
            Self::Boolean(b) => value.as_bool() == Some(*b),
            Self::String(sp) => value.as_str().is_some_and(|s| sp.eval(s)),
            Self::Number(np) => match value {
                Value::Number(n) => np.eval_json(n),
                _ => false,
            },
            Self::Object { key, predicate } => match value.as_object() {
                // First case-folded key match wins; evaluation stops there
                // even if the value fails the predicate.
                Some(map) => map
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, v)| predicate.eval(v))
                    .unwrap_or(false),
                None => false,
            },
            Self::Array {
                selector,
                predicate,
            } => match value.as_array() {
                Some(items) => match selector {
                    ArraySelector::Any => items.iter().any(|item| predicate.eval(item)),
                    ArraySelector::Index(n) => {
                        items.get(*n).map(|item| predicate.eval(item)).unwrap_or(false)
                    }
                },
                None => false,
            },
            Self::Not(inner) => !inner.eval(value),
            Self::And(parts) => parts.iter().all(|p| p.eval(value)),
            Self::Or(parts) => parts.iter().any(|p| p.eval(value)),
        }
    }
}
