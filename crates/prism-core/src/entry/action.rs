//! Actions an entry can support.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of actions an entry can support.
///
/// Actions are discovered from an entry's capability traits in
/// [`supported_actions`](crate::entry::supported_actions); they are never
/// declared independently of the capabilities backing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Enumerate children (the entry is a group).
    List,
    /// Open random-access content.
    Read,
    /// Stream content as it is produced.
    Stream,
    /// Write bytes to the backend object.
    Write,
    /// Execute a command on the backend object.
    Exec,
    /// Delete the backend object.
    Delete,
    /// Send a named signal to the backend object.
    Signal,
    /// Exec with stderr reported on a separate stream.
    Execerr,
}

impl Action {
    /// All actions, in declaration order.
    pub const ALL: [Action; 8] = [
        Action::List,
        Action::Read,
        Action::Stream,
        Action::Write,
        Action::Exec,
        Action::Delete,
        Action::Signal,
        Action::Execerr,
    ];

    /// The action's wire name.
    pub fn name(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Read => "read",
            Action::Stream => "stream",
            Action::Write => "write",
            Action::Exec => "exec",
            Action::Delete => "delete",
            Action::Signal => "signal",
            Action::Execerr => "execerr",
        }
    }

    /// Parse a wire name back into an action.
    pub fn from_name(name: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.name() == name)
    }

    fn bit(&self) -> u8 {
        1 << (*self as u8)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of actions, stored as a bitset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionSet {
    bits: u8,
}

impl ActionSet {
    /// The empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add an action.
    pub fn insert(&mut self, action: Action) {
        self.bits |= action.bit();
    }

    /// Builder-style insert.
    pub fn with(mut self, action: Action) -> Self {
        self.insert(action);
        self
    }

    /// True if the set contains `action`.
    pub fn supports(&self, action: Action) -> bool {
        self.bits & action.bit() != 0
    }

    /// True if no actions are present.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Iterate the contained actions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        Action::ALL.into_iter().filter(|a| self.supports(*a))
    }

    /// The contained actions as wire names, in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|a| a.name()).collect()
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut set = ActionSet::empty();
        for a in iter {
            set.insert(a);
        }
        set
    }
}

impl Serialize for ActionSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for ActionSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let actions = Vec::<Action>::deserialize(deserializer)?;
        Ok(actions.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_supports() {
        let mut set = ActionSet::empty();
        assert!(set.is_empty());
        set.insert(Action::List);
        set.insert(Action::Read);
        assert!(set.supports(Action::List));
        assert!(set.supports(Action::Read));
        assert!(!set.supports(Action::Exec));
    }

    #[test]
    fn test_iteration_order() {
        let set = ActionSet::empty().with(Action::Exec).with(Action::List);
        // Declaration order, not insertion order.
        assert_eq!(set.names(), vec!["list", "exec"]);
    }

    #[test]
    fn test_wire_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(Action::from_name(action.name()), Some(action));
        }
        assert_eq!(Action::from_name("chmod"), None);
    }

    #[test]
    fn test_serde() {
        let set = ActionSet::empty().with(Action::List).with(Action::Stream);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["list","stream"]"#);
        let back: ActionSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
