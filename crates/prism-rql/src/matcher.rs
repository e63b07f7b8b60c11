//! Shape-matching helpers for the wire form.
//!
//! The wire form is nested JSON arrays with a leading operator string,
//! e.g. `["name", ["glob", "foo"]]`. These helpers classify shapes without
//! committing to an operator, so callers can produce match errors for
//! foreign shapes and syntax errors for malformed known ones.

use serde_json::Value;

use crate::error::{ParseError, ParseResult};

/// Split `["op", args...]`, if the input has that shape at all.
pub fn head_op(input: &Value) -> Option<(&str, &[Value])> {
    let array = input.as_array()?;
    let op = array.first()?.as_str()?;
    Some((op, &array[1..]))
}

/// Match `[op, arg]` for a specific operator. `None` means the shape
/// belongs to someone else; `Some(Err)` means the operator matched with
/// bad arguments.
pub fn unary(input: &Value, op: &str, format: &str) -> Option<ParseResult<Value>> {
    let (head, args) = head_op(input)?;
    if head != op {
        return None;
    }
    Some(match args {
        [arg] => Ok(arg.clone()),
        [] => Err(ParseError::syntax(format!(
            "{op}: must be formatted as {format} (missing the operand)"
        ))),
        _ => Err(ParseError::syntax(format!(
            "{op}: must be formatted as {format}"
        ))),
    })
}

/// The standard match error for a primary that did not recognize `input`.
pub fn mismatch(op: &str, format: &str) -> ParseError {
    ParseError::match_err(format!("{op}: must be formatted as {format}"))
}

/// Require a string argument, promoting to syntax errors (the operator was
/// already recognized).
pub fn string_arg(op: &str, arg: &Value, what: &str) -> ParseResult<String> {
    arg.as_str()
        .map(str::to_string)
        .ok_or_else(|| ParseError::syntax(format!("{op}: {what} must be a string")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_head_op() {
        assert_eq!(
            head_op(&json!(["glob", "foo"])).map(|(op, args)| (op, args.len())),
            Some(("glob", 1))
        );
        assert!(head_op(&json!("glob")).is_none());
        assert!(head_op(&json!([1, 2])).is_none());
        assert!(head_op(&json!([])).is_none());
    }

    #[test]
    fn test_unary() {
        assert!(unary(&json!(["glob", "foo"]), "glob", "<fmt>").unwrap().is_ok());
        assert!(unary(&json!(["regex", "x"]), "glob", "<fmt>").is_none());
        assert!(unary(&json!(["glob"]), "glob", "<fmt>").unwrap().is_err());
        assert!(unary(&json!(["glob", "a", "b"]), "glob", "<fmt>")
            .unwrap()
            .is_err());
    }
}
