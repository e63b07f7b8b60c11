//! Entry-schema predicates: match entry kinds by label, type-id, or
//! supported action.
//!
//! Wire shapes: `["label", <string-predicate>]`,
//! `["type", <string-predicate>]`, `["action", <action-predicate>]`.

use serde_json::{json, Value};

use prism_core::entry::ActionSet;
use prism_core::schema::SchemaNode;

use crate::error::{ParseError, ParseResult};
use crate::expression;
use crate::matcher::{mismatch, unary};
use crate::predicate::action::ActionPredicate;
use crate::predicate::string::StringPredicate;

const FORMAT: &str =
    "[\"label\", <string-predicate>] | [\"type\", <string-predicate>] | [\"action\", <action-predicate>]";

/// What predicates see of an entry kind: the schema node's identity plus
/// its action set. Built from a live entry or from a schema-graph node.
#[derive(Debug, Clone, Copy)]
pub struct KindInfo<'a> {
    /// The kind's type-id.
    pub type_id: &'a str,
    /// The kind's label.
    pub label: &'a str,
    /// Actions entries of this kind support.
    pub actions: ActionSet,
}

impl<'a> KindInfo<'a> {
    /// View a schema-graph node as a kind.
    pub fn of_node(type_id: &'a str, node: &'a SchemaNode) -> Self {
        Self {
            type_id,
            label: &node.label,
            actions: node.actions,
        }
    }
}

/// Predicate over entry kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaPredicate {
    /// Match the kind's label.
    Label(StringPredicate),
    /// Match the kind's type-id.
    TypeId(StringPredicate),
    /// Match the kind's supported actions.
    Action(ActionPredicate),
    /// Negation.
    Not(Box<SchemaPredicate>),
    /// Conjunction.
    And(Vec<SchemaPredicate>),
    /// Disjunction.
    Or(Vec<SchemaPredicate>),
}

impl SchemaPredicate {
    /// Parse a schema-predicate expression from the wire form.
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
        if let Some(arg) = unary(input, "label", "[\"label\", <string-predicate>]") {
            let parsed = StringPredicate::parse(&arg?).map_err(|e| {
                ParseError::syntax(format!("label: error unmarshaling the string predicate: {e}"))
            })?;
            return Ok(Self::Label(parsed));
        }
        if let Some(arg) = unary(input, "type", "[\"type\", <string-predicate>]") {
            let parsed = StringPredicate::parse(&arg?).map_err(|e| {
                ParseError::syntax(format!("type: error unmarshaling the string predicate: {e}"))
            })?;
            return Ok(Self::TypeId(parsed));
        }
        if let Some(arg) = unary(input, "action", "[\"action\", <action-predicate>]") {
            let parsed = ActionPredicate::parse(&arg?).map_err(|e| {
                ParseError::syntax(format!("action: error unmarshaling the action predicate: {e}"))
            })?;
            return Ok(Self::Action(parsed));
        }
        Err(mismatch("entry-schema predicate", FORMAT))
    }

    /// Marshal back to the wire form.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Label(sp) => json!(["label", sp.to_value()]),
            Self::TypeId(sp) => json!(["type", sp.to_value()]),
            Self::Action(ap) => json!(["action", ap.to_value()]),
            Self::Not(inner) => expression::marshal_not(inner.to_value()),
            Self::And(parts) => {
                expression::marshal_nary("AND", parts.iter().map(Self::to_value).collect())
            }
            Self::Or(parts) => {
                expression::marshal_nary("OR", parts.iter().map(Self::to_value).collect())
            }
        }
    }

    /// Evaluate against a kind. Labels, type-ids, and action sets are
    /// exact per kind, so this is a definite answer, usable for pruning.
    pub fn eval(&self, kind: &KindInfo<'_>) -> bool {
        match self {
            Self::Label(sp) => sp.eval(kind.label),
            Self::TypeId(sp) => sp.eval(kind.type_id),
            Self::Action(ap) => ap.eval(kind.actions),
            Self::Not(inner) => !inner.eval(kind),
            Self::And(parts) => parts.iter().all(|p| p.eval(kind)),
            Self::Or(parts) => parts.iter().any(|p| p.eval(kind)),
        }
    }
}
