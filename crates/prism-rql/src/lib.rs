//! # prism-rql
//!
//! The resource query language: a predicate AST that round-trips through
//! a nested-array wire form and evaluates in two domains — against live
//! entries, and against schema shapes so walkers can prune subtrees that
//! cannot contain matches.
//!
//! A query is an [`EntryPredicate`]; parse one from the wire form with
//! [`parse_query`] and run it over a hierarchy with [`walk`]:
//!
//! ```ignore
//! let query = parse_query(&serde_json::json!(["name", ["glob", "*.log"]]))?;
//! let matches = walk(&ctx, &cache, &root, &query, WalkOptions::default()).await?;
//! ```

pub mod error;
pub mod expression;
pub mod matcher;
pub mod predicate;
pub mod view;
pub mod walk;

pub use error::{ParseError, ParseResult};
pub use predicate::action::ActionPredicate;
pub use predicate::entry::{EntryPredicate, TimeField};
pub use predicate::numeric::{Comparison, NumericPredicate};
pub use predicate::schema::{KindInfo, SchemaPredicate};
pub use predicate::string::StringPredicate;
pub use predicate::time::TimePredicate;
pub use predicate::value::{ArraySelector, ValuePredicate};
pub use view::EntryView;
pub use walk::{walk, WalkOptions};

use serde_json::Value;

/// Parse a query from its wire form.
pub fn parse_query(input: &Value) -> ParseResult<EntryPredicate> {
    EntryPredicate::parse(input)
}
