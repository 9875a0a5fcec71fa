//! Per-engine variable store.

use serde_json::Value;
use std::collections::HashMap;

pub const VAR_SYSTEM_VERSION: &str = "system.version";
pub const VAR_GHOST_NAME: &str = "system.ghost.name";
pub const VAR_REQUEST_COUNTER: &str = "system.request.counter";
pub const VAR_USERNAME: &str = "username";

/// String/number/array values keyed by name. Owned by exactly one engine instance.
#[derive(Debug, Default, Clone)]
pub struct VariableStore {
    values: HashMap<String, Value>,
}

impl VariableStore {
    /// Value of `name`, or an empty string when absent.
    pub fn get(&self, name: &str) -> Value {
        self.values
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()))
    }

    /// Text form of `name`: strings unquoted, other values as JSON.
    pub fn get_text(&self, name: &str) -> String {
        match self.values.get(name) {
            None => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Value {
        self.values.insert(name.into(), value.clone());
        value
    }

    /// Increment `system.request.counter` by one and return the new count.
    pub fn bump_request_counter(&mut self) -> u64 {
        let next = self
            .values
            .get(VAR_REQUEST_COUNTER)
            .and_then(Value::as_u64)
            .unwrap_or(0)
            + 1;
        self.values.insert(VAR_REQUEST_COUNTER.to_string(), Value::from(next));
        next
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_is_empty_string() {
        let store = VariableStore::default();
        assert_eq!(store.get("nope"), Value::String(String::new()));
        assert_eq!(store.get_text("nope"), "");
    }

    #[test]
    fn test_counter_bumps_from_zero() {
        let mut store = VariableStore::default();
        store.set(VAR_REQUEST_COUNTER, Value::from(0));
        assert_eq!(store.bump_request_counter(), 1);
        assert_eq!(store.bump_request_counter(), 2);
        assert_eq!(store.get(VAR_REQUEST_COUNTER), Value::from(2));
        assert_eq!(store.get_text(VAR_REQUEST_COUNTER), "2");
    }
}
