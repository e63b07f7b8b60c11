//! Action predicates: membership in an entry's supported-action set.

use serde_json::{json, Value};

use prism_core::entry::{Action, ActionSet};

use crate::error::{ParseError, ParseResult};
use crate::expression;

const FORMAT: &str = "<action-name>";

/// Predicate over action sets.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionPredicate {
    /// The set contains this action.
    Is(Action),
    /// Negation.
    Not(Box<ActionPredicate>),
    /// Conjunction.
    And(Vec<ActionPredicate>),
    /// Disjunction.
    Or(Vec<ActionPredicate>),
}

impl ActionPredicate {
    /// Build a membership predicate.
    pub fn is(action: Action) -> Self {
        Self::Is(action)
    }

    /// Parse an action-predicate expression from the wire form. The atom
    /// is a bare action name.
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
        let Some(name) = input.as_str() else {
            return Err(ParseError::match_err(format!(
                "action predicate: must be formatted as {FORMAT}"
            )));
        };
        match Action::from_name(name) {
            Some(action) => Ok(Self::Is(action)),
            None => Err(ParseError::syntax(format!(
                "action predicate: {name:?} is not a valid action"
            ))),
        }
    }

    /// Marshal back to the wire form.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Is(action) => json!(action.name()),
            Self::Not(inner) => expression::marshal_not(inner.to_value()),
            Self::And(parts) => {
                expression::marshal_nary("AND", parts.iter().map(Self::to_value).collect())
            }
            Self::Or(parts) => {
                expression::marshal_nary("OR", parts.iter().map(Self::to_value).collect())
            }
        }
    }

    /// Evaluate against a set of supported actions.
    pub fn eval(&self, actions: ActionSet) -> bool {
        match self {
            Self::Is(action) => actions.supports(*action),
            Self::Not(inner) => !inner.eval(actions),
            Self::And(parts) => parts.iter().all(|p| p.eval(actions)),
            Self::Or(parts) => parts.iter().any(|p| p.eval(actions)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_eval() {
        let p = ActionPredicate::parse(&json!("read")).unwrap();
        let readable = ActionSet::empty().with(Action::Read);
        let listable = ActionSet::empty().with(Action::List);
        assert!(p.eval(readable));
        assert!(!p.eval(listable));
        assert_eq!(p.to_value(), json!("read"));
    }

    #[test]
    fn test_unknown_action_is_syntax_error() {
        let err = ActionPredicate::parse(&json!("chmod")).unwrap_err();
        assert!(!err.is_match());
    }

    #[test]
    fn test_non_string_is_match_error() {
        assert!(ActionPredicate::parse(&json!(7)).unwrap_err().is_match());
    }

    #[test]
    fn test_connectives() {
        let wire = json!(["AND", "read", ["NOT", "write"]]);
        let p = ActionPredicate::parse(&wire).unwrap();
        assert_eq!(p.to_value(), wire);
        let read_only = ActionSet::empty().with(Action::Read);
        let read_write = ActionSet::empty().with(Action::Read).with(Action::Write);
        assert!(p.eval(read_only));
        assert!(!p.eval(read_write));
    }
}
