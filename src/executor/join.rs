//! Hash equi-join.

use std::mem;

use hashbrown::{HashMap, HashSet};

use crate::query::{PredicateInfo, SelectInfo};

use super::node::Operator;

/// Hash join of two operator subtrees on a single equality predicate.
///
/// `require` forwards each column request to whichever child can satisfy it
/// (left side first) and allocates an owned output column for it. `run`
/// executes both children, builds a multimap over the smaller input's key
/// column, and probes it with the larger input, emitting one combined row
/// per matching pair: left-side columns first, right-side columns after.
pub struct Join<'r> {
    left: Box<Operator<'r>>,
    right: Box<Operator<'r>>,
    predicate: PredicateInfo,
    requested: HashSet<SelectInfo>,
    requested_left: Vec<SelectInfo>,
    requested_right: Vec<SelectInfo>,
    output: Vec<Vec<u64>>,
    resolved: HashMap<SelectInfo, usize>,
    result_size: u64,
}

impl<'r> Join<'r> {
    pub fn new(left: Operator<'r>, right: Operator<'r>, predicate: PredicateInfo) -> Self {
        Self {
            left: Box::new(left),
            right: Box::new(right),
            predicate,
            requested: HashSet::new(),
            requested_left: Vec::new(),
            requested_right: Vec::new(),
            output: Vec::new(),
            resolved: HashMap::new(),
            result_size: 0,
        }
    }

    pub(crate) fn require(&mut self, info: SelectInfo) -> bool {
        if self.requested.contains(&info) {
            return true;
        }
        if self.left.require(info) {
            self.requested_left.push(info);
        } else if self.right.require(info) {
            self.requested_right.push(info);
        } else {
            return false;
        }
        self.output.push(Vec::new());
        self.requested.insert(info);
        true
    }

    pub(crate) fn run(&mut self) {
        self.left.require(self.predicate.left);
        self.right.require(self.predicate.right);
        self.left.run();
        self.right.run();

        // Build on the smaller input. The predicate is symmetric, so the
        // sides, the predicate ends, and the requested lists swap together.
        if self.left.result_size() > self.right.result_size() {
            mem::swap(&mut self.left, &mut self.right);
            mem::swap(&mut self.predicate.left, &mut self.predicate.right);
            mem::swap(&mut self.requested_left, &mut self.requested_right);
        }

        let left_results = self.left.results();
        let right_results = self.right.results();

        // Capture the source columns to copy and number the output columns:
        // left requests first, right requests after.
        let mut copy_left = Vec::with_capacity(self.requested_left.len());
        let mut copy_right = Vec::with_capacity(self.requested_right.len());
        let mut out_col = 0;
        for info in &self.requested_left {
            copy_left.push(left_results[self.left.resolve(*info)]);
            self.resolved.insert(*info, out_col);
            out_col += 1;
        }
        for info in &self.requested_right {
            copy_right.push(right_results[self.right.resolve(*info)]);
            self.resolved.insert(*info, out_col);
            out_col += 1;
        }

        let left_keys = left_results[self.left.resolve(self.predicate.left)];
        let right_keys = right_results[self.right.resolve(self.predicate.right)];

        // Build phase. Per-key row lists keep insertion order, so probe
        // output order is deterministic.
        let mut table: HashMap<u64, Vec<u64>> =
            HashMap::with_capacity(self.left.result_size() as usize * 2);
        for (row, &key) in left_keys.iter().enumerate() {
            table.entry(key).or_default().push(row as u64);
        }

        // Probe phase.
        for (right_row, &key) in right_keys.iter().enumerate() {
            let Some(left_rows) = table.get(&key) else {
                continue;
            };
            for &left_row in left_rows {
                for (column, source) in copy_left.iter().enumerate() {
                    self.output[column].push(source[left_row as usize]);
                }
                for (column, source) in copy_right.iter().enumerate() {
                    self.output[copy_left.len() + column].push(source[right_row]);
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
            .expect("column was never required on this join")
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::executor::Scan;
    use crate::relation::Relation;

    fn scan<'r>(relation: &'r Relation, binding: usize) -> Operator<'r> {
        Operator::Scan(Scan::new(relation, binding))
    }

    #[test]
    fn test_join_without_required_columns() {
        let r1 = Relation::sequential(5, 3);
        let r2 = Relation::sequential(10, 5);

        let predicate = PredicateInfo::new(
            SelectInfo::resolved(0, 0, 1),
            SelectInfo::resolved(1, 1, 3),
        );
        let mut join = Operator::Join(Join::new(scan(&r1, 0), scan(&r2, 1), predicate));
        join.run();

        // Keys 0..4 match once each; no output columns were requested.
        assert_eq!(join.result_size(), 5);
        assert!(join.results().is_empty());
    }

    #[test]
    fn test_join_same_relation_two_bindings() {
        let r1 = Relation::sequential(5, 3);

        let predicate = PredicateInfo::new(
            SelectInfo::resolved(0, 0, 1),
            SelectInfo::resolved(0, 1, 2),
        );
        let mut join = Operator::Join(Join::new(scan(&r1, 0), scan(&r1, 1), predicate));
        assert!(join.require(SelectInfo::new(0, 0)));
        join.run();

        assert_eq!(join.result_size(), r1.row_count());
        let results = join.results();
        assert_eq!(results.len(), 1);
        let column = results[join.resolve(SelectInfo::new(0, 0))];
        assert_eq!(column, r1.column(0));
    }

    #[test]
    fn test_join_swaps_build_to_smaller_side() {
        let r1 = Relation::sequential(5, 3);
        let r2 = Relation::sequential(10, 5);

        // Left child is the larger input; the join must still resolve
        // columns correctly after swapping the build side.
        let predicate = PredicateInfo::new(
            SelectInfo::resolved(1, 1, 1),
            SelectInfo::resolved(0, 0, 2),
        );
        let mut join = Operator::Join(Join::new(scan(&r2, 1), scan(&r1, 0), predicate));
        assert!(join.require(SelectInfo::new(0, 1)));
        assert!(join.require(SelectInfo::new(1, 3)));
        // Requesting a column twice must not add a second output column.
        assert!(join.require(SelectInfo::new(1, 3)));
        join.run();

        assert_eq!(join.result_size(), r1.row_count());
        let results = join.results();
        assert_eq!(results.len(), 2);
        let column = results[join.resolve(SelectInfo::new(1, 3))];
        assert_eq!(column, r1.column(0));
    }

    #[test]
    fn test_join_emits_probe_order_times_insertion_order() {
        // Duplicate keys on both sides: one output row per matching (i, j)
        // pair, ordered by probe row then by build insertion.
        let left = Relation::new(3, vec![vec![1, 1, 2], vec![10, 11, 12]]);
        let right = Relation::new(3, vec![vec![1, 2, 1], vec![20, 21, 22]]);

        let predicate = PredicateInfo::new(
            SelectInfo::resolved(0, 0, 0),
            SelectInfo::resolved(1, 1, 0),
        );
        let mut join = Operator::Join(Join::new(scan(&left, 0), scan(&right, 1), predicate));
        assert!(join.require(SelectInfo::new(0, 1)));
        assert!(join.require(SelectInfo::new(1, 1)));
        join.run();

        assert_eq!(join.result_size(), 5);
        let results = join.results();
        assert_eq!(
            results[join.resolve(SelectInfo::new(0, 1))],
            &[10, 11, 12, 10, 11]
        );
        assert_eq!(
            results[join.resolve(SelectInfo::new(1, 1))],
            &[20, 20, 21, 22, 22]
        );
    }

    #[test]
    fn test_join_matches_nested_loop_reference() {
        let mut rng = StdRng::seed_from_u64(42);
        let left_rows = 50;
        let right_rows = 70;

        let left_keys: Vec<u64> = (0..left_rows).map(|_| rng.gen_range(0..10)).collect();
        let right_keys: Vec<u64> = (0..right_rows).map(|_| rng.gen_range(0..10)).collect();
        let left = Relation::new(
            left_rows,
            vec![left_keys.clone(), (0..left_rows).collect()],
        );
        let right = Relation::new(
            right_rows,
            vec![right_keys.clone(), (0..right_rows).collect()],
        );

        let predicate = PredicateInfo::new(
            SelectInfo::resolved(0, 0, 0),
            SelectInfo::resolved(1, 1, 0),
        );
        let mut join = Operator::Join(Join::new(scan(&left, 0), scan(&right, 1), predicate));
        assert!(join.require(SelectInfo::new(0, 1)));
        assert!(join.require(SelectInfo::new(1, 1)));
        join.run();

        let mut expected: Vec<(u64, u64)> = Vec::new();
        for (i, &lk) in left_keys.iter().enumerate() {
            for (j, &rk) in right_keys.iter().enumerate() {
                if lk == rk {
                    expected.push((i as u64, j as u64));
                }
            }
        }

        assert_eq!(join.result_size(), expected.len() as u64);
        assert!(join.result_size() <= left_rows * right_rows);

        let results = join.results();
        let left_ids = results[join.resolve(SelectInfo::new(0, 1))];
        let right_ids = results[join.resolve(SelectInfo::new(1, 1))];
        let mut actual: Vec<(u64, u64)> = left_ids
            .iter()
            .zip(right_ids)
            .map(|(&l, &r)| (l, r))
            .collect();

        actual.sort_unstable();
        expected.sort_unstable();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_join_disjoint_keys_is_empty() {
        let left = Relation::new(2, vec![vec![1, 2]]);
        let right = Relation::new(2, vec![vec![3, 4]]);

        let predicate = PredicateInfo::new(
            SelectInfo::resolved(0, 0, 0),
            SelectInfo::resolved(1, 1, 0),
        );
        let mut join = Operator::Join(Join::new(scan(&left, 0), scan(&right, 1), predicate));
        assert!(join.require(SelectInfo::new(0, 0)));
        join.run();

        assert_eq!(join.result_size(), 0);
        assert!(join.results()[0].is_empty());
    }
}
