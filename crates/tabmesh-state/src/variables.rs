//! Variable store - the local replica
//!
//! A flat name-to-value map. Local writes and remote applications both
//! overwrite unconditionally: the last write applied wins, with no version
//! or timestamp comparison. Concurrent writers converge on whichever update
//! each replica applied last; that is defined behavior, not a conflict to
//! resolve.

use std::collections::HashMap;

use tabmesh_core::Value;

/// Local variable replica
#[derive(Debug, Default)]
pub struct VariableStore {
    values: HashMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        VariableStore::default()
    }

    /// Read a variable. Never touches the bus; an absent name reads as the
    /// empty default value.
    pub fn get(&self, name: &str) -> Value {
        self.values.get(name).cloned().unwrap_or_default()
    }

    /// Write a variable locally.
    pub fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Add a delta to a variable, numerically coercing both sides.
    ///
    /// Returns the resulting absolute value - peers are sent the sum, not
    /// the increment, so a lost or reordered update cannot make replicas
    /// drift apart by a delta.
    pub fn change(&mut self, name: &str, delta: &Value) -> Value {
        let sum = self.get(name).to_number() + delta.to_number();
        let value = Value::Num(sum);
        self.set(name, value.clone());
        value
    }

    /// Apply a replicated write from a peer. Unconditional overwrite.
    pub fn apply_remote(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Whether a variable has ever been written.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop every variable. Used on program reset.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}
