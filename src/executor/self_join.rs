//! Intra-operator equality predicate.

use hashbrown::HashMap;

use crate::query::{PredicateInfo, SelectInfo};

use super::node::Operator;

/// Filters one input's rows to those where two of its columns are equal.
///
/// The planner reaches for this when a join predicate's bindings are both
/// already part of the tree (a cycle in the query graph, or a second
/// predicate over an existing join). The two predicate columns are required
/// on the child for the comparison but are not automatically part of the
/// output.
pub struct SelfJoin<'r> {
    input: Box<Operator<'r>>,
    predicate: PredicateInfo,
    required: Vec<SelectInfo>,
    output: Vec<Vec<u64>>,
    resolved: HashMap<SelectInfo, usize>,
    result_size: u64,
}

impl<'r> SelfJoin<'r> {
    pub fn new(input: Operator<'r>, predicate: PredicateInfo) -> Self {
        Self {
            input: Box::new(input),
            predicate,
            required: Vec::new(),
            output: Vec::new(),
            resolved: HashMap::new(),
            result_size: 0,
        }
    }

    pub(crate) fn require(&mut self, info: SelectInfo) -> bool {
        if self.required.contains(&info) {
            return true;
        }
        if self.input.require(info) {
            self.output.push(Vec::new());
            self.required.push(info);
            return true;
        }
        false
    }

    pub(crate) fn run(&mut self) {
        self.input.require(self.predicate.left);
        self.input.require(self.predicate.right);
        self.input.run();

        let results = self.input.results();
        let mut copy = Vec::with_capacity(self.required.len());
        for (index, info) in self.required.iter().enumerate() {
            copy.push(results[self.input.resolve(*info)]);
            self.resolved.insert(*info, index);
        }

        let left = results[self.input.resolve(self.predicate.left)];
        let right = results[self.input.resolve(self.predicate.right)];
        for row in 0..self.input.result_size() as usize {
            if left[row] == right[row] {
                for (column, source) in copy.iter().enumerate() {
                    self.output[column].push(source[row]);
                }
                self.result_size += 1;
            }
        }
    }

    pub(crate) fn result_size(&self) -> u64 {
        self.result_size
    }

    pub(crate) fn results(&self) -> Vec<&[u64]> {
        self.output.iter().map(|column| column.as_slice()).collect()
    }

    pub(crate) fn resolve(&self, info: SelectInfo) -> usize {
        *self
            .resolved
            .get(&info)
            .expect("column was never required on this self join")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Scan;
    use crate::relation::Relation;

    #[test]
    fn test_self_join_without_required_columns() {
        let relation = Relation::sequential(5, 3);
        let binding = 5;

        // Columns 1 and 2 are identical in the sequential fixture: every
        // row passes, but nothing was required so nothing is exposed.
        let predicate = PredicateInfo::new(
            SelectInfo::resolved(1, binding, 1),
            SelectInfo::resolved(1, binding, 2),
        );
        let mut op = Operator::SelfJoin(SelfJoin::new(
            Operator::Scan(Scan::new(&relation, binding)),
            predicate,
        ));
        op.run();

        assert_eq!(op.result_size(), relation.row_count());
        assert!(op.results().is_empty());
    }

    #[test]
    fn test_self_join_exposes_required_columns() {
        let relation = Relation::sequential(5, 3);
        let binding = 5;

        let predicate = PredicateInfo::new(
            SelectInfo::resolved(1, binding, 1),
            SelectInfo::resolved(1, binding, 2),
        );
        let mut op = Operator::SelfJoin(SelfJoin::new(
            Operator::Scan(Scan::new(&relation, binding)),
            predicate,
        ));
        assert!(op.require(SelectInfo::new(binding, 0)));
        op.run();

        assert_eq!(op.result_size(), relation.row_count());
        let results = op.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[op.resolve(SelectInfo::new(binding, 0))], relation.column(0));
    }

    #[test]
    fn test_self_join_filters_unequal_rows() {
        // Columns agree on rows 0 and 2 only.
        let relation = Relation::new(4, vec![vec![7, 1, 9, 3], vec![7, 2, 9, 4], vec![0, 1, 2, 3]]);

        let predicate = PredicateInfo::new(
            SelectInfo::resolved(0, 0, 0),
            SelectInfo::resolved(0, 0, 1),
        );
        let mut op = Operator::SelfJoin(SelfJoin::new(
            Operator::Scan(Scan::new(&relation, 0)),
            predicate,
        ));
        assert!(op.require(SelectInfo::new(0, 2)));
        op.run();

        assert_eq!(op.result_size(), 2);
        let results = op.results();
        assert_eq!(results[op.resolve(SelectInfo::new(0, 2))], &[0, 2]);
    }

    #[test]
    fn test_self_join_repeated_require_is_noop() {
        let relation = Relation::sequential(5, 3);
        let predicate = PredicateInfo::new(
            SelectInfo::resolved(0, 0, 1),
            SelectInfo::resolved(0, 0, 2),
        );
        let mut op = Operator::SelfJoin(SelfJoin::new(
            Operator::Scan(Scan::new(&relation, 0)),
            predicate,
        ));
        assert!(op.require(SelectInfo::new(0, 0)));
        assert!(op.require(SelectInfo::new(0, 0)));
        op.run();
        assert_eq!(op.results().len(), 1);
    }

    #[test]
    fn test_self_join_rejects_foreign_binding() {
        let relation = Relation::sequential(5, 3);
        let predicate = PredicateInfo::new(
            SelectInfo::resolved(0, 0, 1),
            SelectInfo::resolved(0, 0, 2),
        );
        let mut op = Operator::SelfJoin(SelfJoin::new(
            Operator::Scan(Scan::new(&relation, 0)),
            predicate,
        ));
        assert!(!op.require(SelectInfo::new(3, 0)));
    }
}
