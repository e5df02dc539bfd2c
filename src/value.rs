use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a bridge property, method parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VarType {
    #[default]
    Void,
    Float,
    Bool,
    String,
}

/// Result of evaluating an instruction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Void,
    Float(f32),
    Bool(bool),
    String(String),
}

impl Value {
    pub fn var_type(&self) -> VarType {
        match self {
            Value::Void => VarType::Void,
            Value::Float(_) => VarType::Float,
            Value::Bool(_) => VarType::Bool,
            Value::String(_) => VarType::String,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    pub fn as_float(&self) -> Option<f32> {
        if let Value::Float(f) = self {
            Some(*f)
        } else {
            None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Lossy numeric view; unparsable strings and void become `0.0`.
    pub fn to_float(&self) -> f32 {
        match self {
            Value::Void => 0.0,
            Value::Float(f) => *f,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::String(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    pub fn to_bool(&self) -> bool {
        match self {
            Value::Void => false,
            Value::Float(f) => *f != 0.0,
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
        }
    }

    /// Converts into the given type, `Void` discards the value.
    pub fn coerce(self, ty: VarType) -> Value {
        match ty {
            VarType::Void => Value::Void,
            VarType::Float => Value::Float(self.to_float()),
            VarType::Bool => Value::Bool(self.to_bool()),
            VarType::String => match self {
                Value::String(s) => Value::String(s),
                other => Value::String(other.to_string()),
            },
        }
    }

    pub fn default_for(ty: VarType) -> Value {
        match ty {
            VarType::Void => Value::Void,
            VarType::Float => Value::Float(0.0),
            VarType::Bool => Value::Bool(false),
            VarType::String => Value::String(String::new()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => Ok(()),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce() {
        assert_eq!(Value::Bool(true).coerce(VarType::Float), Value::Float(1.0));
        assert_eq!(Value::from("2.5").coerce(VarType::Float), Value::Float(2.5));
        assert_eq!(Value::from("abc").coerce(VarType::Float), Value::Float(0.0));
        assert_eq!(Value::Float(2.0).coerce(VarType::String), Value::from("2"));
        assert_eq!(Value::Void.coerce(VarType::Bool), Value::Bool(false));
        assert_eq!(Value::Float(3.0).coerce(VarType::Void), Value::Void);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(3.5).to_string(), "3.5");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::Void.to_string(), "");
    }
}
