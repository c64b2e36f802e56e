//! The checksum root operator.

use crate::query::SelectInfo;

use super::node::Operator;

/// Root of every operator tree: reduces each selected column of its input
/// to an unsigned 64-bit wrapping sum.
///
/// Checksum is deliberately not an [`Operator`] variant — it sits on top of
/// the tree and no parent can require columns from it.
pub struct Checksum<'r> {
    input: Operator<'r>,
    selections: Vec<SelectInfo>,
    sums: Vec<u64>,
    result_size: u64,
}

impl<'r> Checksum<'r> {
    pub fn new(input: Operator<'r>, selections: Vec<SelectInfo>) -> Self {
        Self {
            input,
            selections,
            sums: Vec::new(),
            result_size: 0,
        }
    }

    /// Requires every selected column on the input, runs it, and computes
    /// the per-column sums in selection order.
    pub fn run(&mut self) {
        for info in &self.selections {
            self.input.require(*info);
        }
        self.input.run();
        self.result_size = self.input.result_size();

        let results = self.input.results();
        for info in &self.selections {
            let column = results[self.input.resolve(*info)];
            self.sums
                .push(column.iter().fold(0u64, |sum, &value| sum.wrapping_add(value)));
        }
    }

    /// The per-column sums, in selection order. Empty before [`run`].
    ///
    /// [`run`]: Checksum::run
    pub fn check_sums(&self) -> &[u64] {
        &self.sums
    }

    /// The input's row count, shared by all sums.
    pub fn result_size(&self) -> u64 {
        self.result_size
    }
}
