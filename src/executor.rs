//! Materializing query operators and the join-tree planner.
//!
//! Execution is a two-phase, single-threaded pull. A top-down `require`
//! sweep announces every column a parent will read; a single `run` then
//! pulls data up the tree, each operator running its children before doing
//! its own work. After `run` returns, an operator's output is frozen:
//! `results` hands out the materialized columns and `resolve` maps a
//! required column to its output index.
//!
//! The operators:
//!
//! - [`Scan`]: leaf exposing relation columns zero-copy
//! - [`FilterScan`]: leaf copying out the rows that pass its constant filters
//! - [`Join`]: hash equi-join, building on the smaller input
//! - [`SelfJoin`]: equality filter between two columns of one input
//! - [`Checksum`]: the root, reducing each selected column to a wrapping sum
//!
//! [`planner::plan_query`] assembles these into a left-deep tree, one join
//! predicate at a time.

mod checksum;
mod join;
mod node;
pub mod planner;
mod scan;
mod self_join;

pub use checksum::Checksum;
pub use join::Join;
pub use node::Operator;
pub use planner::{plan_query, PlanError};
pub use scan::{FilterScan, Scan};
pub use self_join::SelfJoin;
