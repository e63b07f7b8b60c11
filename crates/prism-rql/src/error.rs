//! RQL parse errors.
//!
//! Two classes: *match* errors mean the input shape does not belong to the
//! node that tried to parse it — parents use them to try alternatives and
//! they are never user-visible on their own. *Syntax* errors mean the
//! shape matched but the content is invalid; they are fatal for the
//! subtree and carry a message referencing the recognized operator.

use thiserror::Error;

/// Error produced while unmarshaling a predicate tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input shape does not belong to this node; try alternatives.
    #[error("{0}")]
    Match(String),

    /// Shape matched but content is invalid; fatal for this subtree.
    #[error("{0}")]
    Syntax(String),
}

impl ParseError {
    /// Build a match error.
    pub fn match_err(msg: impl Into<String>) -> Self {
        Self::Match(msg.into())
    }

    /// Build a syntax error.
    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::Syntax(msg.into())
    }

    /// True for the match class.
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match(_))
    }

    /// Promote a match error to a syntax error, keeping the message. Used
    /// once an operator has been recognized: nested shape mismatches are
    /// then real errors, not dispatch misses.
    pub fn into_syntax(self) -> Self {
        match self {
            Self::Match(msg) => Self::Syntax(msg),
            syntax => syntax,
        }
    }
}

/// Result alias for unmarshaling.
pub type ParseResult<T> = Result<T, ParseError>;
