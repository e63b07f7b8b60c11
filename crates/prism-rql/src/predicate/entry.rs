//! Entry predicates — the primaries of the query language.
//!
//! Wire shapes: `["name"|"cname"|"path", <string-predicate>]`,
//! `["kind", <schema-predicate>]`, `["meta", <value-predicate>]`,
//! `["mtime"|"atime"|"ctime"|"crtime", <time-predicate>]`,
//! `["size"|"mode", <unsigned-numeric-predicate>]`,
//! `["action", <action-predicate>]`, composed with NOT / AND / OR.

use std::time::SystemTime;

use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::error::{ParseError, ParseResult};
use crate::expression::{self, truth};
use crate::matcher::{mismatch, unary};
use crate::predicate::action::ActionPredicate;
use crate::predicate::numeric::NumericPredicate;
use crate::predicate::schema::{KindInfo, SchemaPredicate};
use crate::predicate::string::StringPredicate;
use crate::predicate::time::TimePredicate;
use crate::predicate::value::ValuePredicate;
use crate::view::EntryView;

const FORMAT: &str = "[<primary>, <predicate>] where <primary> is one of \
name, cname, path, kind, meta, mtime, atime, ctime, crtime, size, mode, action";

/// Which attribute timestamp a time primary selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    /// Modification time.
    Mtime,
    /// Access time.
    Atime,
    /// Status-change time.
    Ctime,
    /// Creation time.
    Crtime,
}

impl TimeField {
    fn name(&self) -> &'static str {
        match self {
            Self::Mtime => "mtime",
            Self::Atime => "atime",
            Self::Ctime => "ctime",
            Self::Crtime => "crtime",
        }
    }

    fn select(&self, view: &EntryView) -> Option<SystemTime> {
        match self {
            Self::Mtime => view.attributes.mtime,
            Self::Atime => view.attributes.atime,
            Self::Ctime => view.attributes.ctime,
            Self::Crtime => view.attributes.crtime,
        }
    }
}

/// Predicate over entries. The root node of every query.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryPredicate {
    /// Match the display name.
    Name(StringPredicate),
    /// Match the canonical name.
    CName(StringPredicate),
    /// Match the absolute path.
    Path(StringPredicate),
    /// Match the entry's kind.
    Kind(SchemaPredicate),
    /// Match the entry's metadata.
    Meta(ValuePredicate),
    /// Match an attribute timestamp.
    Time(TimeField, TimePredicate),
    /// Match the size attribute.
    Size(NumericPredicate),
    /// Match the mode attribute.
    Mode(NumericPredicate),
    /// Match the supported actions.
    Action(ActionPredicate),
    /// Negation.
    Not(Box<EntryPredicate>),
    /// Conjunction.
    And(Vec<EntryPredicate>),
    /// Disjunction.
    Or(Vec<EntryPredicate>),
}

impl EntryPredicate {
    /// Parse a query from the wire form.
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
        for (primary, build) in [
            ("name", Self::Name as fn(StringPredicate) -> Self),
            ("cname", Self::CName),
            ("path", Self::Path),
        ] {
            if let Some(arg) = unary(input, primary, FORMAT) {
                let parsed = StringPredicate::parse(&arg?).map_err(|e| {
                    ParseError::syntax(format!(
                        "{primary}: error unmarshaling the string predicate: {e}"
                    ))
                })?;
                return Ok(build(parsed));
            }
        }
        if let Some(arg) = unary(input, "kind", FORMAT) {
            let parsed = SchemaPredicate::parse(&arg?).map_err(|e| {
                ParseError::syntax(format!("kind: error unmarshaling the schema predicate: {e}"))
            })?;
            return Ok(Self::Kind(parsed));
        }
        if let Some(arg) = unary(input, "meta", FORMAT) {
            let parsed = ValuePredicate::parse(&arg?).map_err(|e| {
                ParseError::syntax(format!("meta: error unmarshaling the value predicate: {e}"))
            })?;
            return Ok(Self::Meta(parsed));
        }
        for field in [
            TimeField::Mtime,
            TimeField::Atime,
            TimeField::Ctime,
            TimeField::Crtime,
        ] {
            if let Some(arg) = unary(input, field.name(), FORMAT) {
                let parsed = TimePredicate::parse(&arg?).map_err(|e| {
                    ParseError::syntax(format!(
                        "{}: error unmarshaling the time predicate: {e}",
                        field.name()
                    ))
                })?;
                return Ok(Self::Time(field, parsed));
            }
        }
        for (primary, build) in [
            ("size", Self::Size as fn(NumericPredicate) -> Self),
            ("mode", Self::Mode),
        ] {
            if let Some(arg) = unary(input, primary, FORMAT) {
                let parsed = NumericPredicate::parse_unsigned(&arg?).map_err(|e| {
                    ParseError::syntax(format!(
                        "{primary}: error unmarshaling the numeric predicate: {e}"
                    ))
                })?;
                return Ok(build(parsed));
            }
        }
        if let Some(arg) = unary(input, "action", FORMAT) {
            let parsed = ActionPredicate::parse(&arg?).map_err(|e| {
                ParseError::syntax(format!("action: error unmarshaling the action predicate: {e}"))
            })?;
            return Ok(Self::Action(parsed));
        }
        Err(mismatch("entry predicate", FORMAT))
    }

    /// Marshal back to the wire form.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Name(sp) => json!(["name", sp.to_value()]),
            Self::CName(sp) => json!(["cname", sp.to_value()]),
            Self::Path(sp) => json!(["path", sp.to_value()]),
            Self::Kind(kp) => json!(["kind", kp.to_value()]),
            Self::Meta(vp) => json!(["meta", vp.to_value()]),
            Self::Time(field, tp) => json!([field.name(), tp.to_value()]),
            Self::Size(np) => json!(["size", np.to_value()]),
            Self::Mode(np) => json!(["mode", np.to_value()]),
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

    /// Evaluate against a materialized entry. Missing attributes never
    /// match their selector.
    pub fn eval_entry(&self, view: &EntryView) -> bool {
        match self {
            Self::Name(sp) => sp.eval(&view.name),
            Self::CName(sp) => sp.eval(&view.cname),
            Self::Path(sp) => sp.eval(view.path.as_str()),
            Self::Kind(kp) => kp.eval(&view.kind()),
            Self::Meta(vp) => vp.eval(&Value::Object(view.metadata.clone())),
            Self::Time(field, tp) => field.select(view).is_some_and(|t| tp.eval(t)),
            Self::Size(np) => view
                .attributes
                .size
                .is_some_and(|size| np.eval(Decimal::from(size))),
            Self::Mode(np) => view
                .attributes
                .mode
                .is_some_and(|mode| np.eval(Decimal::from(mode))),
            Self::Action(ap) => ap.eval(view.actions),
            Self::Not(inner) => !inner.eval_entry(view),
            Self::And(parts) => parts.iter().all(|p| p.eval_entry(view)),
            Self::Or(parts) => parts.iter().any(|p| p.eval_entry(view)),
        }
    }

    /// Evaluate against a schema shape: false only when no entry of this
    /// kind can possibly match, so walkers may prune the subtree.
    pub fn eval_schema(&self, kind: &KindInfo<'_>) -> bool {
        truth::resolve(self.schema_truth(kind))
    }

    /// Three-valued schema evaluation. Kind and action predicates are
    /// exact per kind; everything else depends on the instance.
    fn schema_truth(&self, kind: &KindInfo<'_>) -> Option<bool> {
        match self {
            Self::Kind(kp) => Some(kp.eval(kind)),
            Self::Action(ap) => Some(ap.eval(kind.actions)),
            Self::Not(inner) => truth::negate(inner.schema_truth(kind)),
            Self::And(parts) => truth::all(parts.iter().map(|p| p.schema_truth(kind))),
            Self::Or(parts) => truth::any(parts.iter().map(|p| p.schema_truth(kind))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::entry::{Action, ActionSet, Attributes, EntryId};
    use prism_core::entry::from_epoch_secs;

    fn sample_view(name: &str) -> EntryView {
        EntryView {
            name: name.to_string(),
            cname: name.to_string(),
            path: EntryId::new(format!("/fs/{name}")),
            attributes: Attributes::new()
                .with_size(5)
                .with_mode(0o644)
                .with_mtime(from_epoch_secs(1_550_611_453)),
            actions: ActionSet::empty().with(Action::Read),
            metadata: serde_json::from_str(r#"{"labels": {"app": "web"}}"#).unwrap(),
            type_id: "prism_volume::file::VolumeFile".to_string(),
            label: "file".to_string(),
        }
    }

    #[test]
    fn test_name_round_trip_and_eval() {
        let wire = json!(["name", ["glob", "foo"]]);
        let p = EntryPredicate::parse(&wire).unwrap();
        assert_eq!(p.to_value(), wire);
        assert!(!p.eval_entry(&sample_view("bar")));
        assert!(p.eval_entry(&sample_view("foo")));
    }

    #[test]
    fn test_not_cname_composition() {
        let p = EntryPredicate::parse(&json!(["NOT", ["cname", ["glob", "foo"]]])).unwrap();
        assert!(!p.eval_entry(&sample_view("foo")));
        assert!(p.eval_entry(&sample_view("bar")));
    }

    #[test]
    fn test_meta_predicate() {
        let p = EntryPredicate::parse(&json!([
            "meta",
            [
                "object",
                [
                    ["key", "labels"],
                    ["object", [["key", "app"], ["string", ["=", "web"]]]]
                ]
            ]
        ]))
        .unwrap();
        assert!(p.eval_entry(&sample_view("x")));
    }

    #[test]
    fn test_attribute_selectors() {
        let view = sample_view("f");
        assert!(EntryPredicate::parse(&json!(["size", ["=", "5"]]))
            .unwrap()
            .eval_entry(&view));
        assert!(EntryPredicate::parse(&json!(["mode", ["=", "420"]]))
            .unwrap()
            .eval_entry(&view));
        assert!(EntryPredicate::parse(&json!(["mtime", ["<", 1_550_611_500]]))
            .unwrap()
            .eval_entry(&view));
        // Missing attribute never matches.
        assert!(!EntryPredicate::parse(&json!(["atime", [">", 0]]))
            .unwrap()
            .eval_entry(&view));
    }

    #[test]
    fn test_size_is_unsigned() {
        let err = EntryPredicate::parse(&json!(["size", ["<", "-1"]])).unwrap_err();
        assert!(!err.is_match());
        assert!(err.to_string().contains("unsigned"), "{err}");
    }

    #[test]
    fn test_action_primary() {
        let p = EntryPredicate::parse(&json!(["action", "read"])).unwrap();
        assert!(p.eval_entry(&sample_view("f")));
        let p = EntryPredicate::parse(&json!(["action", "exec"])).unwrap();
        assert!(!p.eval_entry(&sample_view("f")));
    }

    #[test]
    fn test_unknown_primary_is_match_error() {
        let err = EntryPredicate::parse(&json!(["frobnicate", ["glob", "x"]])).unwrap_err();
        assert!(err.is_match());
    }

    #[test]
    fn test_nested_error_is_syntax() {
        let err = EntryPredicate::parse(&json!(["name", ["glob", "["]])).unwrap_err();
        assert!(!err.is_match());
        assert!(err.to_string().contains("name"), "{err}");
    }

    #[test]
    fn test_schema_eval_action_pruning() {
        let p = EntryPredicate::parse(&json!(["action", "read"])).unwrap();
        let no_read = KindInfo {
            type_id: "t",
            label: "dir",
            actions: ActionSet::empty().with(Action::List),
        };
        let with_read = KindInfo {
            type_id: "t",
            label: "file",
            actions: ActionSet::empty().with(Action::Read),
        };
        assert!(!p.eval_schema(&no_read));
        assert!(p.eval_schema(&with_read));
    }

    #[test]
    fn test_schema_eval_is_conservative() {
        // Name predicates depend on the instance: schema eval says true.
        let p = EntryPredicate::parse(&json!(["name", ["glob", "nope-*"]])).unwrap();
        let kind = KindInfo {
            type_id: "t",
            label: "file",
            actions: ActionSet::empty().with(Action::Read),
        };
        assert!(p.eval_schema(&kind));
        // And so does its negation.
        let p = EntryPredicate::parse(&json!(["NOT", ["name", ["glob", "nope-*"]]])).unwrap();
        assert!(p.eval_schema(&kind));
    }

    #[test]
    fn test_schema_eval_not_action_is_exact() {
        let p = EntryPredicate::parse(&json!(["NOT", ["action", "list"]])).unwrap();
        let group = KindInfo {
            type_id: "t",
            label: "dir",
            actions: ActionSet::empty().with(Action::List),
        };
        assert!(!p.eval_schema(&group));
    }

    #[test]
    fn test_pruning_soundness_on_samples() {
        // If eval_schema is false, eval_entry must be false for any entry
        // of that kind.
        let queries = [
            json!(["action", "exec"]),
            json!(["AND", ["action", "exec"], ["name", ["glob", "f*"]]]),
            json!(["OR", ["action", "exec"], ["kind", ["label", ["=", "dir"]]]]),
            json!(["NOT", ["action", "read"]]),
        ];
        let view = sample_view("foo");
        for wire in queries {
            let p = EntryPredicate::parse(&wire).unwrap();
            if !p.eval_schema(&view.kind()) {
                assert!(!p.eval_entry(&view), "pruning unsound for {wire}");
            }
        }
    }

    #[test]
    fn test_round_trip_corpus() {
        for wire in [
            json!(["name", ["glob", "foo"]]),
            json!(["cname", ["regex", "^x"]]),
            json!(["path", ["glob", "/fs/*"]]),
            json!(["kind", ["label", ["=", "container"]]]),
            json!(["meta", ["object", [["key", "labels"], null]]]),
            json!(["mtime", ["<", 1_550_611_500]]),
            json!(["crtime", [">=", 0]]),
            json!(["size", ["<=", "42"]]),
            json!(["mode", ["=", "420"]]),
            json!(["action", "stream"]),
            json!(["NOT", ["cname", ["regex", "^x"]]]),
            json!([
                "AND",
                ["name", ["glob", "*.log"]],
                ["OR", ["size", [">", "1024"]], ["action", "stream"]]
            ]),
        ] {
            let parsed = EntryPredicate::parse(&wire).unwrap();
            assert_eq!(parsed.to_value(), wire, "round trip of {wire}");
            assert_eq!(EntryPredicate::parse(&wire).unwrap(), parsed);
        }
    }
}
