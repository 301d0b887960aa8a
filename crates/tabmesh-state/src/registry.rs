//! Registry of declared message and variable names
//!
//! Purely local: it records which names this instance's UI exposes, nothing
//! more. Peers can broadcast or replicate names that were never declared
//! here - delivery is keyed by name, not by registry membership. The
//! registry only feeds menu listings, so it is never replicated.

use std::collections::BTreeSet;

/// Placeholder listing entry shown when nothing is declared.
pub const EMPTY_PLACEHOLDER: &str = "";

/// Declared broadcast and variable names
#[derive(Debug, Default)]
pub struct Registry {
    messages: BTreeSet<String>,
    variables: BTreeSet<String>,
}

/// Immutable view of the registry handed to the host after each change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrySnapshot {
    pub messages: Vec<String>,
    pub variables: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Declare a broadcast name. Duplicates and the empty string are no-ops.
    /// Returns whether membership changed.
    pub fn declare_message(&mut self, name: &str) -> bool {
        declare(&mut self.messages, name)
    }

    /// Remove a broadcast name. Absent names are a no-op.
    pub fn remove_message(&mut self, name: &str) -> bool {
        self.messages.remove(name)
    }

    /// Declare a variable name. Duplicates and the empty string are no-ops.
    pub fn declare_variable(&mut self, name: &str) -> bool {
        declare(&mut self.variables, name)
    }

    /// Remove a variable name. Absent names are a no-op.
    pub fn remove_variable(&mut self, name: &str) -> bool {
        self.variables.remove(name)
    }

    pub fn has_message(&self, name: &str) -> bool {
        self.messages.contains(name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains(name)
    }

    /// Declared broadcast names in sorted order, or a single empty
    /// placeholder so menus always have something to render.
    pub fn list_messages(&self) -> Vec<String> {
        list(&self.messages)
    }

    /// Declared variable names, same contract as [`list_messages`].
    ///
    /// [`list_messages`]: Registry::list_messages
    pub fn list_variables(&self) -> Vec<String> {
        list(&self.variables)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            messages: self.list_messages(),
            variables: self.list_variables(),
        }
    }

    /// Forget every declared name. Used on program reset.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.variables.clear();
    }
}

fn declare(set: &mut BTreeSet<String>, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    set.insert(name.to_string())
}

fn list(set: &BTreeSet<String>) -> Vec<String> {
    if set.is_empty() {
        vec![EMPTY_PLACEHOLDER.to_string()]
    } else {
        set.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_list_sorted() {
        let mut reg = Registry::new();
        assert!(reg.declare_message("zeta"));
        assert!(reg.declare_message("alpha"));
        assert!(reg.declare_message("mid"));

        assert_eq!(reg.list_messages(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_duplicate_declare_is_noop() {
        let mut reg = Registry::new();
        assert!(reg.declare_message("ping-test"));
        assert!(!reg.declare_message("ping-test"));
        assert_eq!(reg.list_messages().len(), 1);
    }

    #[test]
    fn test_empty_string_never_registers() {
        let mut reg = Registry::new();
        assert!(!reg.declare_message(""));
        assert!(!reg.declare_variable(""));
        assert_eq!(reg.list_messages(), vec![EMPTY_PLACEHOLDER]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut reg = Registry::new();
        assert!(!reg.remove_message("never-declared"));
    }

    #[test]
    fn test_empty_listing_has_placeholder() {
        let reg = Registry::new();
        assert_eq!(reg.list_messages(), vec![EMPTY_PLACEHOLDER]);
        assert_eq!(reg.list_variables(), vec![EMPTY_PLACEHOLDER]);
    }

    #[test]
    fn test_messages_and_variables_are_separate() {
        let mut reg = Registry::new();
        reg.declare_message("shared-name");
        assert!(reg.has_message("shared-name"));
        assert!(!reg.has_variable("shared-name"));
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut reg = Registry::new();
        reg.declare_message("go");
        reg.declare_variable("score");

        let snap = reg.snapshot();
        assert_eq!(snap.messages, vec!["go"]);
        assert_eq!(snap.variables, vec!["score"]);
    }

    #[test]
    fn test_clear() {
        let mut reg = Registry::new();
        reg.declare_message("go");
        reg.declare_variable("score");
        reg.clear();
        assert_eq!(reg.list_messages(), vec![EMPTY_PLACEHOLDER]);
        assert_eq!(reg.list_variables(), vec![EMPTY_PLACEHOLDER]);
    }
}
