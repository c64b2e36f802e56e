//! The operator tree node.

use crate::query::SelectInfo;

use super::join::Join;
use super::scan::{FilterScan, Scan};
use super::self_join::SelfJoin;

/// A node of the operator tree.
///
/// Uses enum dispatch instead of `dyn Trait`: the operator set is small and
/// fixed, and the planner needs to own nodes and move them around freely
/// while it grows the tree. `'r` is the lifetime of the relation store;
/// every borrowed column ultimately points into it.
///
/// The checksum root is a separate type ([`super::Checksum`]) because it is
/// the one node that columns can never be required from.
pub enum Operator<'r> {
    Scan(Scan<'r>),
    FilterScan(FilterScan<'r>),
    Join(Join<'r>),
    SelfJoin(SelfJoin<'r>),
}

impl<'r> Operator<'r> {
    /// Requests that column `info` be present in this operator's output.
    ///
    /// Returns `false` when the column's binding is not reachable in this
    /// subtree. Idempotent: repeated requests for the same column never
    /// allocate a second output column. Must only be called before [`run`].
    ///
    /// [`run`]: Operator::run
    pub fn require(&mut self, info: SelectInfo) -> bool {
        match self {
            Operator::Scan(op) => op.require(info),
            Operator::FilterScan(op) => op.require(info),
            Operator::Join(op) => op.require(info),
            Operator::SelfJoin(op) => op.require(info),
        }
    }

    /// Executes the subtree rooted at this node, materializing every
    /// required column. Must be called exactly once; afterwards the result
    /// size and output columns are frozen.
    pub fn run(&mut self) {
        match self {
            Operator::Scan(op) => op.run(),
            Operator::FilterScan(op) => op.run(),
            Operator::Join(op) => op.run(),
            Operator::SelfJoin(op) => op.run(),
        }
    }

    /// The number of tuples produced; zero until [`run`] completes.
    ///
    /// [`run`]: Operator::run
    pub fn result_size(&self) -> u64 {
        match self {
            Operator::Scan(op) => op.result_size(),
            Operator::FilterScan(op) => op.result_size(),
            Operator::Join(op) => op.result_size(),
            Operator::SelfJoin(op) => op.result_size(),
        }
    }

    /// The materialized output columns, indexed as [`resolve`] reports.
    ///
    /// [`resolve`]: Operator::resolve
    pub fn results(&self) -> Vec<&[u64]> {
        match self {
            Operator::Scan(op) => op.results(),
            Operator::FilterScan(op) => op.results(),
            Operator::Join(op) => op.results(),
            Operator::SelfJoin(op) => op.results(),
        }
    }

    /// The output column index of a previously required column.
    ///
    /// # Panics
    ///
    /// Panics if `info` was never accepted by [`require`] — that is a
    /// planner bug, not a recoverable condition.
    ///
    /// [`require`]: Operator::require
    pub fn resolve(&self, info: SelectInfo) -> usize {
        match self {
            Operator::Scan(op) => op.resolve(info),
            Operator::FilterScan(op) => op.resolve(info),
            Operator::Join(op) => op.resolve(info),
            Operator::SelfJoin(op) => op.resolve(info),
        }
    }
}
