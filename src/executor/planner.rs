//! Left-deep join-tree construction.

use std::collections::HashSet;
use std::fmt;

use crate::query::{FilterInfo, QueryInfo, SelectInfo};
use crate::relation::{Relation, RelationId};

use super::checksum::Checksum;
use super::join::Join;
use super::node::Operator;
use super::scan::{FilterScan, Scan};
use super::self_join::SelfJoin;

/// Errors raised while planning a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// The query references a relation id beyond the loaded set.
    RelationNotFound { rel_id: RelationId, loaded: usize },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::RelationNotFound { rel_id, loaded } => {
                write!(f, "relation {rel_id} is not loaded ({loaded} relations available)")
            }
        }
    }
}

impl std::error::Error for PlanError {}

/// Builds the operator tree for a query, rooted in a [`Checksum`].
///
/// Predicates are consumed in order, growing a left-deep tree: the first
/// predicate joins two fresh leaves; each later predicate either joins a
/// fresh leaf onto the current root (exactly one of its bindings is already
/// in the tree), wraps the root in a [`SelfJoin`] (both bindings are — a
/// cycle or a redundant predicate), or is pushed to the back of the list
/// until one of its bindings shows up. No join-order optimization happens
/// here; queries are trusted to contain no cross products, so every
/// deferred predicate eventually connects.
pub fn plan_query<'r>(
    relations: &'r [Relation],
    query: &QueryInfo,
) -> Result<Checksum<'r>, PlanError> {
    let mut used: HashSet<usize> = HashSet::new();
    let mut pending = query.predicates.clone();

    let first = *pending
        .first()
        .expect("query contains at least one join predicate");
    let left = make_leaf(relations, &mut used, first.left, query)?;
    let right = make_leaf(relations, &mut used, first.right, query)?;
    let mut root = Operator::Join(Join::new(left, right, first));

    let mut next = 1;
    while next < pending.len() {
        let predicate = pending[next];
        let left_used = used.contains(&predicate.left.binding);
        let right_used = used.contains(&predicate.right.binding);

        root = match (left_used, right_used) {
            (true, false) => {
                let leaf = make_leaf(relations, &mut used, predicate.right, query)?;
                Operator::Join(Join::new(root, leaf, predicate))
            }
            (false, true) => {
                let leaf = make_leaf(relations, &mut used, predicate.left, query)?;
                Operator::Join(Join::new(leaf, root, predicate))
            }
            // Both bindings are already joined in: a cycle in the query
            // graph, or a second predicate over the same pair.
            (true, true) => Operator::SelfJoin(SelfJoin::new(root, predicate)),
            // Neither binding is reachable yet; retry once the tree has
            // grown.
            (false, false) => {
                pending.push(predicate);
                root
            }
        };
        next += 1;
    }

    Ok(Checksum::new(root, query.selections.clone()))
}

/// Builds the leaf for one relation occurrence: a [`FilterScan`] when any
/// filter references the binding, a plain [`Scan`] otherwise.
fn make_leaf<'r>(
    relations: &'r [Relation],
    used: &mut HashSet<usize>,
    info: SelectInfo,
    query: &QueryInfo,
) -> Result<Operator<'r>, PlanError> {
    used.insert(info.binding);

    let rel_id = info
        .rel_id
        .expect("column references are resolved before planning");
    let relation = relations.get(rel_id).ok_or(PlanError::RelationNotFound {
        rel_id,
        loaded: relations.len(),
    })?;

    let filters: Vec<FilterInfo> = query
        .filters
        .iter()
        .filter(|f| f.column.binding == info.binding)
        .copied()
        .collect();

    Ok(if filters.is_empty() {
        Operator::Scan(Scan::new(relation, info.binding))
    } else {
        Operator::FilterScan(FilterScan::new(relation, filters))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Vec<Relation> {
        (0..5).map(|_| Relation::sequential(10, 3)).collect()
    }

    fn run(relations: &[Relation], line: &str) -> (Vec<u64>, u64) {
        let query = QueryInfo::parse(line).unwrap();
        let mut checksum = plan_query(relations, &query).unwrap();
        checksum.run();
        (checksum.check_sums().to_vec(), checksum.result_size())
    }

    #[test]
    fn test_plan_two_way_join() {
        let relations = store();
        let (sums, size) = run(&relations, "1 2|0.0=1.1|1.2");
        assert_eq!(sums, vec![45]);
        assert_eq!(size, 10);
    }

    #[test]
    fn test_plan_uses_filter_scan_leaves() {
        let relations = store();
        let (sums, _) = run(&relations, "0 1|0.0=1.1&0.0>1&0.0<3|1.0");
        assert_eq!(sums, vec![2]);
    }

    #[test]
    fn test_plan_cyclic_predicate_becomes_self_join() {
        let relations = store();
        // The third predicate closes a cycle: both bindings are in the tree.
        let (sums, _) = run(&relations, "0 1 2|0.0=1.1&1.1=2.0&2.2=0.1|1.0");
        assert_eq!(sums, vec![45]);
    }

    #[test]
    fn test_plan_defers_unconnected_predicate() {
        let relations = store();
        // 2.1=3.0 touches neither binding of the initial join and must wait
        // for 0.2=2.1 to bring binding 2 in.
        let (sums, _) = run(&relations, "0 1 2 3|0.0=1.1&2.1=3.0&0.2=2.1|1.0");
        assert_eq!(sums, vec![45]);
    }

    #[test]
    fn test_plan_rejects_missing_relation() {
        let relations = store();
        let query = QueryInfo::parse("0 9|0.0=1.1|1.0").unwrap();
        assert!(matches!(
            plan_query(&relations, &query),
            Err(PlanError::RelationNotFound { rel_id: 9, loaded: 5 })
        ));
    }
}
