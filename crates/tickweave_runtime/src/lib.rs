// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tick-driven interpreter for Tickweave behavior graphs.
//!
//! This crate executes graphs authored with `tickweave_graph`:
//! - Compute-order scheduling per entry category
//! - A single-threaded runner with one resumable cursor per entry chain
//! - Stateful node behaviors behind the [`behavior::Behavior`] trait
//! - A catalog of builtin node constructors and behaviors
//! - A small formula language for data-node expressions
//!
//! The host owns the loop: it calls [`runner::GraphRunner::drive`] once per
//! tick (or per event, for trigger categories) and reads results back
//! through the blackboard and published node outputs.

pub mod behavior;
pub mod formula;
pub mod nodes;
pub mod runner;
pub mod schedule;
pub mod status;

pub use behavior::{Behavior, BehaviorRegistry, EvalContext, EvalError};
pub use formula::{Formula, FormulaError};
pub use nodes::register_builtins;
pub use runner::{BlackboardMode, Cursor, GraphRunner, RunnerOptions, RuntimeError};
pub use schedule::{Schedule, ScheduleError};
pub use status::{AbortPolicy, CategoryStatus, NodeStatus};
