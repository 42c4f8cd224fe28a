//! Node hierarchy.
//!
//! Every object a property can be bound to is a [`Node`]. Only the root
//! [`Session`](crate::session::Session) owns a transport; every other node holds
//! a borrowed reference to its parent and forwards [`Node::session`] one hop up,
//! so the lookup always terminates at exactly one root and can never form a
//! cycle.

use crate::session::Session;
use std::collections::HashMap;

/// Identity variables of a node used to resolve command addresses.
///
/// Channels expose `n` (their 1-based index); measurements expose `name` and
/// `sources`. Children inherit the variables of their parents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressVars {
    vars: HashMap<String, String>,
}

impl AddressVars {
    /// No variables; the identity of a root node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a variable (builder form).
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.vars.insert(key.into(), value.to_string());
        self
    }

    /// Value of `key`, if the node or one of its ancestors set it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// The 1-based channel index, if this node is (or lives under) a channel.
    pub fn index(&self) -> Option<usize> {
        self.get("n").and_then(|n| n.parse().ok())
    }

    pub(crate) fn as_map(&self) -> &HashMap<String, String> {
        &self.vars
    }
}

/// An object in an instrument's node tree.
pub trait Node {
    /// The session of the root instrument that owns the live transport.
    fn session(&self) -> &Session;

    /// Identity variables for command address resolution.
    fn address_vars(&self) -> AddressVars {
        AddressVars::default()
    }
}

impl<N: Node + ?Sized> Node for &N {
    fn session(&self) -> &Session {
        (**self).session()
    }

    fn address_vars(&self) -> AddressVars {
        (**self).address_vars()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_values_replace_inherited_ones() {
        let vars = AddressVars::new().with("n", 1).with("n", 3);
        assert_eq!(vars.get("n"), Some("3"));
        assert_eq!(vars.index(), Some(3));
    }

    #[test]
    fn index_is_absent_without_channel() {
        let vars = AddressVars::new().with("name", "VPP");
        assert_eq!(vars.index(), None);
    }
}
