// SPDX-License-Identifier: MIT OR Apache-2.0
//! Implicit conversions between port value kinds.
//!
//! A connection whose endpoint kinds differ is only valid when a conversion
//! is registered for the (source, target) pair; the runtime applies it each
//! time a value is propagated along that connection.

use crate::port::{Value, ValueKind};
use std::collections::HashMap;
use std::fmt;

/// Conversion applied when a connection crosses value kinds
pub type ConvertFn = fn(&Value) -> Value;

/// Registry of implicit conversions keyed by (source, target) kind
#[derive(Clone)]
pub struct ConversionRegistry {
    converters: HashMap<(ValueKind, ValueKind), ConvertFn>,
}

impl ConversionRegistry {
    /// Create an empty registry (same-kind connections only)
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Create a registry with the builtin conversions
    ///
    /// Builtins: Number→Text, Bool→Text, Bool→Number (0/1), Number→Bool
    /// (non-zero), Number→Vec3 (splat).
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(ValueKind::Number, ValueKind::Text, |v| match v {
            Value::Number(n) => Value::Text(n.to_string()),
            other => other.clone(),
        });
        registry.register(ValueKind::Bool, ValueKind::Text, |v| match v {
            Value::Bool(b) => Value::Text(b.to_string()),
            other => other.clone(),
        });
        registry.register(ValueKind::Bool, ValueKind::Number, |v| match v {
            Value::Bool(b) => Value::Number(if *b { 1.0 } else { 0.0 }),
            other => other.clone(),
        });
        registry.register(ValueKind::Number, ValueKind::Bool, |v| match v {
            Value::Number(n) => Value::Bool(*n != 0.0),
            other => other.clone(),
        });
        registry.register(ValueKind::Number, ValueKind::Vec3, |v| match v {
            Value::Number(n) => Value::Vec3([*n; 3]),
            other => other.clone(),
        });
        registry
    }

    /// Register a conversion for a (source, target) kind pair
    pub fn register(&mut self, from: ValueKind, to: ValueKind, convert: ConvertFn) {
        self.converters.insert((from, to), convert);
    }

    /// Check whether a value of kind `from` can feed a port of kind `to`
    pub fn compatible(&self, from: ValueKind, to: ValueKind) -> bool {
        from == to || self.converters.contains_key(&(from, to))
    }

    /// Convert `value` for a port of kind `to`
    ///
    /// Returns `None` when the kinds differ and no conversion is registered.
    pub fn convert(&self, value: &Value, to: ValueKind) -> Option<Value> {
        if value.kind() == to {
            return Some(value.clone());
        }
        self.converters
            .get(&(value.kind(), to))
            .map(|convert| convert(value))
    }
}

impl Default for ConversionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ConversionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRegistry")
            .field("registered", &self.converters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_number_to_text() {
        let registry = ConversionRegistry::with_builtins();
        let converted = registry.convert(&Value::Number(2.5), ValueKind::Text);
        assert_eq!(converted, Some(Value::Text("2.5".to_string())));
    }

    #[test]
    fn test_same_kind_passes_through() {
        let registry = ConversionRegistry::empty();
        let v = Value::Number(1.0);
        assert_eq!(registry.convert(&v, ValueKind::Number), Some(v));
    }

    #[test]
    fn test_unregistered_pair_rejected() {
        let registry = ConversionRegistry::with_builtins();
        assert!(!registry.compatible(ValueKind::Text, ValueKind::Number));
        assert_eq!(
            registry.convert(&Value::Text("3".into()), ValueKind::Number),
            None
        );
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = ConversionRegistry::empty();
        registry.register(ValueKind::Text, ValueKind::Number, |v| match v {
            Value::Text(s) => Value::Number(s.parse().unwrap_or(0.0)),
            other => other.clone(),
        });
        assert_eq!(
            registry.convert(&Value::Text("4.5".into()), ValueKind::Number),
            Some(Value::Number(4.5))
        );
    }
}
