// SPDX-License-Identifier: MIT OR Apache-2.0
//! Named, typed variable slots: the blackboard and parameter stores.
//!
//! Bindings and run values address slots by stable [`VariableId`], so
//! renaming a variable in the authoring tool never breaks a graph.

use crate::port::{Value, ValueKind};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier for a variable slot, immutable once created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableId(pub Uuid);

impl VariableId {
    /// Create a new random variable ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VariableId {
    fn default() -> Self {
        Self::new()
    }
}

/// A named, typed variable slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableSlot {
    /// Stable identity
    pub id: VariableId,
    /// Display name, renameable but unique within its store
    pub name: String,
    /// Declared kind
    pub kind: ValueKind,
    /// Current value
    pub value: Value,
}

/// Error raised by variable store operations
#[derive(Debug, Error)]
pub enum VariableError {
    /// A slot with this display name already exists in the store
    #[error("Variable name already in use: '{0}'")]
    DuplicateName(String),

    /// No slot with this ID
    #[error("Unknown variable: {0:?}")]
    UnknownVariable(VariableId),

    /// No slot with this display name
    #[error("Unknown variable name: '{0}'")]
    UnknownName(String),

    /// Assigned value does not match the slot's declared kind
    #[error("Kind mismatch for '{name}': slot is {declared:?}, value is {got:?}")]
    KindMismatch {
        /// Display name of the slot
        name: String,
        /// Kind the slot was declared with
        declared: ValueKind,
        /// Kind of the rejected value
        got: ValueKind,
    },
}

/// Store of variable slots addressed by stable ID or display name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableStore {
    slots: IndexMap<VariableId, VariableSlot>,
}

impl VariableStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new slot; the declared kind follows the initial value
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        initial: Value,
    ) -> Result<VariableId, VariableError> {
        let name = name.into();
        if self.slot_named(&name).is_some() {
            return Err(VariableError::DuplicateName(name));
        }
        let id = VariableId::new();
        self.slots.insert(
            id,
            VariableSlot {
                id,
                name,
                kind: initial.kind(),
                value: initial,
            },
        );
        Ok(id)
    }

    /// Get a slot by ID
    pub fn slot(&self, id: VariableId) -> Option<&VariableSlot> {
        self.slots.get(&id)
    }

    /// Get the current value of a slot by ID
    pub fn get(&self, id: VariableId) -> Option<&Value> {
        self.slots.get(&id).map(|slot| &slot.value)
    }

    /// Assign a slot by ID, rejecting kind mismatches
    pub fn set(&mut self, id: VariableId, value: Value) -> Result<(), VariableError> {
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or(VariableError::UnknownVariable(id))?;
        if value.kind() != slot.kind {
            return Err(VariableError::KindMismatch {
                name: slot.name.clone(),
                declared: slot.kind,
                got: value.kind(),
            });
        }
        slot.value = value;
        Ok(())
    }

    /// Get a slot by display name
    pub fn slot_named(&self, name: &str) -> Option<&VariableSlot> {
        self.slots.values().find(|slot| slot.name == name)
    }

    /// Get the current value of a slot by display name
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.slot_named(name).map(|slot| &slot.value)
    }

    /// Assign a slot by display name, rejecting kind mismatches
    pub fn set_named(&mut self, name: &str, value: Value) -> Result<(), VariableError> {
        let id = self
            .slot_named(name)
            .map(|slot| slot.id)
            .ok_or_else(|| VariableError::UnknownName(name.to_string()))?;
        self.set(id, value)
    }

    /// Change a slot's display name; its ID and existing bindings are unaffected
    pub fn rename(
        &mut self,
        id: VariableId,
        new_name: impl Into<String>,
    ) -> Result<(), VariableError> {
        let new_name = new_name.into();
        if self
            .slot_named(&new_name)
            .is_some_and(|slot| slot.id != id)
        {
            return Err(VariableError::DuplicateName(new_name));
        }
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or(VariableError::UnknownVariable(id))?;
        slot.name = new_name;
        Ok(())
    }

    /// Remove a slot, returning it if it existed
    ///
    /// Bindings referencing the removed ID become dangling; scheduling a
    /// graph with such a binding fails.
    pub fn remove(&mut self, id: VariableId) -> Option<VariableSlot> {
        self.slots.shift_remove(&id)
    }

    /// Declared kind of a slot, if it exists
    pub fn kind_of(&self, id: VariableId) -> Option<ValueKind> {
        self.slots.get(&id).map(|slot| slot.kind)
    }

    /// Iterate over all slots in declaration order
    pub fn slots(&self) -> impl Iterator<Item = &VariableSlot> {
        self.slots.values()
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the store has no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Wrap this store in a shared handle usable across runners
    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    fn insert_slot(&mut self, slot: VariableSlot) {
        self.slots.insert(slot.id, slot);
    }
}

/// Shared, lockable store handle
///
/// Runners constructed with the same handle observe each other's blackboard
/// writes; runners with an instanced blackboard get a private copy instead.
pub type SharedStore = Arc<RwLock<VariableStore>>;

/// Declaration of one per-run parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Stable identity; run values are matched by this ID, never by name
    pub id: VariableId,
    /// Display name
    pub name: String,
    /// Declared kind
    pub kind: ValueKind,
    /// Value used when a run supplies nothing for this parameter
    pub default: Value,
}

impl ParameterDef {
    /// Create a definition; the declared kind follows the default value
    pub fn new(name: impl Into<String>, default: Value) -> Self {
        Self {
            id: VariableId::new(),
            name: name.into(),
            kind: default.kind(),
            default,
        }
    }
}

/// Build a live parameter store seeded with blueprint defaults
pub fn instantiate_parameters(blueprint: &[ParameterDef]) -> VariableStore {
    let mut store = VariableStore::new();
    for def in blueprint {
        store.insert_slot(VariableSlot {
            id: def.id,
            name: def.name.clone(),
            kind: def.kind,
            value: def.default.clone(),
        });
    }
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_lookup() {
        let mut store = VariableStore::new();
        let id = store.declare("health", Value::Number(100.0)).unwrap();

        assert_eq!(store.get(id), Some(&Value::Number(100.0)));
        assert_eq!(store.get_named("health"), Some(&Value::Number(100.0)));
        assert_eq!(store.kind_of(id), Some(ValueKind::Number));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut store = VariableStore::new();
        store.declare("flag", Value::Bool(false)).unwrap();
        assert!(matches!(
            store.declare("flag", Value::Bool(true)),
            Err(VariableError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_set_checks_kind() {
        let mut store = VariableStore::new();
        let id = store.declare("speed", Value::Number(1.0)).unwrap();

        assert!(store.set(id, Value::Number(2.0)).is_ok());
        assert!(matches!(
            store.set(id, Value::Bool(true)),
            Err(VariableError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_rename_keeps_id_lookup() {
        let mut store = VariableStore::new();
        let id = store.declare("old_name", Value::Text("v".into())).unwrap();

        store.rename(id, "new_name").unwrap();
        assert_eq!(store.get(id), Some(&Value::Text("v".into())));
        assert_eq!(store.get_named("old_name"), None);
        assert_eq!(store.get_named("new_name"), Some(&Value::Text("v".into())));
    }

    #[test]
    fn test_blueprint_instantiation_matches_by_id() {
        let p1 = ParameterDef::new("Initial Speed", Value::Number(3.5));
        let p2 = ParameterDef::new("Invincible", Value::Bool(true));
        let blueprint = vec![p1.clone(), p2.clone()];

        let store = instantiate_parameters(&blueprint);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(p1.id), Some(&Value::Number(3.5)));
        assert_eq!(store.get(p2.id), Some(&Value::Bool(true)));
    }
}
