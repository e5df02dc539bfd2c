use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// String-keyed local variables of a dialog session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Storage {
    values: BTreeMap<String, Value>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_get_value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Stores a float, bool or string. Void values are ignored.
    pub fn set_value(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if value.is_void() {
            log::warn!("Ignoring void assignment to storage variable {}", name);
            return;
        }
        self.values.insert(name, value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut storage = Storage::new();
        storage.set_value("gold", Value::Float(10.0));
        storage.set_value("met_king", Value::Bool(true));
        storage.set_value("nothing", Value::Void);

        assert_eq!(storage.try_get_value("gold"), Some(&Value::Float(10.0)));
        assert!(storage.contains("met_king"));
        assert!(!storage.contains("nothing"));
        assert_eq!(storage.len(), 2);

        storage.clear();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let mut storage = Storage::new();
        storage.set_value("a", Value::Float(1.5));
        storage.set_value("b", Value::from("x"));
        let json = serde_json::to_string(&storage).unwrap();
        assert_eq!(json, r#"{"a":1.5,"b":"x"}"#);
        let back: Storage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, storage);
    }
}
