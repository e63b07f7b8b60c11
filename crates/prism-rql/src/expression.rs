//! Expression dispatch: atoms composed with NOT / AND / OR.
//!
//! Every predicate category parses the same way: try the atomic form
//! first, then `["NOT", e]`, then the n-ary connectives. Connective
//! operators are uppercase so they can never collide with atom operators.

use serde_json::{json, Value};

use crate::error::{ParseError, ParseResult};
use crate::matcher::head_op;

/// Parse an expression over some predicate category.
///
/// `atom` parses the category's atomic forms; `not`/`and`/`or` build the
/// category's connective nodes. An atom match-miss falls through to the
/// connectives; an unknown leading operator re-raises the atom's match
/// error so parents can keep dispatching.
pub fn parse<T>(
    input: &Value,
    atom: &dyn Fn(&Value) -> ParseResult<T>,
    not: &dyn Fn(T) -> T,
    and: &dyn Fn(Vec<T>) -> T,
    or: &dyn Fn(Vec<T>) -> T,
) -> ParseResult<T> {
    let miss = match atom(input) {
        Ok(parsed) => return Ok(parsed),
        Err(err @ ParseError::Syntax(_)) => return Err(err),
        Err(miss) => miss,
    };

    let Some((op, args)) = head_op(input) else {
        return Err(miss);
    };
    match op {
        "NOT" => match args {
            [inner] => Ok(not(parse(inner, atom, not, and, or)?)),
            _ => Err(ParseError::syntax(
                "NOT: must be formatted as [\"NOT\", <predicate>]",
            )),
        },
        "AND" | "OR" => {
            if args.len() < 2 {
                return Err(ParseError::syntax(format!(
                    "{op}: must be formatted as [\"{op}\", <predicate>, <predicate>, ...]"
                )));
            }
            let mut parts = Vec::with_capacity(args.len());
            for arg in args {
                parts.push(parse(arg, atom, not, and, or).map_err(ParseError::into_syntax)?);
            }
            Ok(if op == "AND" { and(parts) } else { or(parts) })
        }
        _ => Err(miss),
    }
}

/// Marshal a NOT node.
pub fn marshal_not(inner: Value) -> Value {
    json!(["NOT", inner])
}

/// Marshal an n-ary connective node.
pub fn marshal_nary(op: &str, parts: Vec<Value>) -> Value {
    let mut array = vec![json!(op)];
    array.extend(parts);
    Value::Array(array)
}

/// Three-valued logic over schema shapes: `Some(b)` when the truth of a
/// predicate is the same for every entry the schema can produce, `None`
/// when it depends on the instance. [`resolve`] collapses to the
/// conservative boolean (never prune what might match).
pub mod truth {
    /// NOT over a certainty.
    pub fn negate(inner: Option<bool>) -> Option<bool> {
        inner.map(|b| !b)
    }

    /// AND over certainties: false wins, then uncertainty, then true.
    pub fn all(parts: impl IntoIterator<Item = Option<bool>>) -> Option<bool> {
        let mut out = Some(true);
        for part in parts {
            match part {
                Some(false) => return Some(false),
                None => out = None,
                Some(true) => {}
            }
        }
        out
    }

    /// OR over certainties: true wins, then uncertainty, then false.
    pub fn any(parts: impl IntoIterator<Item = Option<bool>>) -> Option<bool> {
        let mut out = Some(false);
        for part in parts {
            match part {
                Some(true) => return Some(true),
                None => out = None,
                Some(false) => {}
            }
        }
        out
    }

    /// Collapse to the conservative pruning answer.
    pub fn resolve(truth: Option<bool>) -> bool {
        truth.unwrap_or(true)
    }
}
