// SPDX-License-Identifier: MIT OR Apache-2.0
//! Builtin node catalog.
//!
//! Each builtin pairs a `Node` constructor (ports and default bindings, the
//! graph side) with a [`Behavior`] implementation (the runtime side)
//! registered under the same type name. Hosts add their own node types the
//! same way through [`BehaviorRegistry::register`].
//!
//! [`Behavior`]: crate::behavior::Behavior
//! [`BehaviorRegistry::register`]: crate::behavior::BehaviorRegistry::register

pub mod action;
pub mod branch;
pub mod data;
pub mod entry;

pub use action::{counter_bump, log, set_variable, wait};
pub use branch::{branch, switch_text};
pub use data::{constant, formula, get_variable, predicate, tick_probe};
pub use entry::{start, trigger, update};

use crate::behavior::BehaviorRegistry;

/// Register every builtin behavior into `registry`
pub fn register_builtins(registry: &mut BehaviorRegistry) {
    entry::register(registry);
    action::register(registry);
    data::register(registry);
    branch::register(registry);
}
