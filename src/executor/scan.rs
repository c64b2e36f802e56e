//! Leaf operators over a single relation binding.

use hashbrown::HashMap;

use crate::query::{FilterInfo, SelectInfo};
use crate::relation::Relation;

/// Full scan of one relation occurrence.
///
/// Output columns are borrowed straight from relation storage; `run` only
/// publishes the row count. Requiring a column is free.
pub struct Scan<'r> {
    relation: &'r Relation,
    binding: usize,
    columns: Vec<&'r [u64]>,
    resolved: HashMap<SelectInfo, usize>,
    result_size: u64,
}

impl<'r> Scan<'r> {
    pub fn new(relation: &'r Relation, binding: usize) -> Self {
        Self {
            relation,
            binding,
            columns: Vec::new(),
            resolved: HashMap::new(),
            result_size: 0,
        }
    }

    pub(crate) fn require(&mut self, info: SelectInfo) -> bool {
        if info.binding != self.binding {
            return false;
        }
        assert!(
            info.col_id < self.relation.column_count(),
            "column {} out of range for relation with {} columns",
            info.col_id,
            self.relation.column_count()
        );
        if !self.resolved.contains_key(&info) {
            self.columns.push(self.relation.column(info.col_id));
            self.resolved.insert(info, self.columns.len() - 1);
        }
        true
    }

    pub(crate) fn run(&mut self) {
        self.result_size = self.relation.row_count();
    }

    pub(crate) fn result_size(&self) -> u64 {
        self.result_size
    }

    pub(crate) fn results(&self) -> Vec<&[u64]> {
        self.columns.clone()
    }

    pub(crate) fn resolve(&self, info: SelectInfo) -> usize {
        *self
            .resolved
            .get(&info)
            .expect("column was never required on this scan")
    }
}

/// Scan of one relation occurrence through a conjunction of constant
/// filters.
///
/// Unlike [`Scan`], output columns are owned: `run` copies the required
/// columns of every row that passes all filters, in ascending row order.
/// Filters are evaluated against relation storage directly, so a filter
/// column does not need to be required.
pub struct FilterScan<'r> {
    relation: &'r Relation,
    binding: usize,
    filters: Vec<FilterInfo>,
    input: Vec<&'r [u64]>,
    output: Vec<Vec<u64>>,
    resolved: HashMap<SelectInfo, usize>,
    result_size: u64,
}

impl<'r> FilterScan<'r> {
    /// Creates a filtering scan. All filters must reference the same
    /// binding; the first filter names it.
    pub fn new(relation: &'r Relation, filters: Vec<FilterInfo>) -> Self {
        assert!(!filters.is_empty(), "FilterScan requires at least one filter");
        let binding = filters[0].column.binding;
        debug_assert!(filters.iter().all(|f| f.column.binding == binding));
        Self {
            relation,
            binding,
            filters,
            input: Vec::new(),
            output: Vec::new(),
            resolved: HashMap::new(),
            result_size: 0,
        }
    }

    pub(crate) fn require(&mut self, info: SelectInfo) -> bool {
        if info.binding != self.binding {
            return false;
        }
        assert!(
            info.col_id < self.relation.column_count(),
            "column {} out of range for relation with {} columns",
            info.col_id,
            self.relation.column_count()
        );
        if !self.resolved.contains_key(&info) {
            self.input.push(self.relation.column(info.col_id));
            self.output.push(Vec::new());
            self.resolved.insert(info, self.output.len() - 1);
        }
        true
    }

    pub(crate) fn run(&mut self) {
        let filter_columns: Vec<&[u64]> = self
            .filters
            .iter()
            .map(|f| self.relation.column(f.column.col_id))
            .collect();

        // The row loop runs even with no required columns: result_size must
        // reflect the passing rows either way.
        for row in 0..self.relation.row_count() as usize {
            let pass = self
                .filters
                .iter()
                .zip(&filter_columns)
                .all(|(filter, column)| filter.matches(column[row]));
            if pass {
                for (out, input) in self.output.iter_mut().zip(&self.input) {
                    out.push(input[row]);
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
            .expect("column was never required on this filter scan")
    }
}
