//! Query model types: column references, filters, join predicates, and the
//! parsed query itself.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::relation::RelationId;

/// A reference to one column of one relation occurrence.
///
/// `binding` is the query-local alias (position in the FROM list); `rel_id`
/// is the underlying relation, filled in once the reference has been
/// resolved against the binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectInfo {
    /// The resolved relation id, if resolution has happened.
    pub rel_id: Option<RelationId>,
    /// The relation's binding within the query.
    pub binding: usize,
    /// The column within the relation.
    pub col_id: usize,
}

/// Operator column maps key on the in-query position only; two references
/// to the same `binding.col_id` must land in the same bucket whether or not
/// their relation ids have been filled in. Unequal values sharing a hash is
/// fine for `HashMap`.
impl Hash for SelectInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.binding.hash(state);
        self.col_id.hash(state);
    }
}

impl SelectInfo {
    /// Creates an unresolved column reference.
    pub fn new(binding: usize, col_id: usize) -> Self {
        Self {
            rel_id: None,
            binding,
            col_id,
        }
    }

    /// Creates a column reference with a known relation id.
    pub fn resolved(rel_id: RelationId, binding: usize, col_id: usize) -> Self {
        Self {
            rel_id: Some(rel_id),
            binding,
            col_id,
        }
    }

    /// Renders the reference in query-text form, `binding.col`.
    pub fn dump_text(&self) -> String {
        format!("{}.{}", self.binding, self.col_id)
    }

    /// Renders the reference in SQL form, optionally wrapped in `SUM(...)`.
    pub fn dump_sql(&self, add_sum: bool) -> String {
        let inner = format!("\"{}\".c{}", self.binding, self.col_id);
        if add_sum {
            format!("SUM({inner})")
        } else {
            inner
        }
    }
}

/// The comparison operators of a constant filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    Greater,
    Equal,
}

impl Comparison {
    /// All comparisons, in the order the parser probes a predicate token.
    pub const ALL: [Comparison; 3] = [Comparison::Less, Comparison::Greater, Comparison::Equal];

    /// The wire-format character.
    pub fn as_char(self) -> char {
        match self {
            Comparison::Less => '<',
            Comparison::Greater => '>',
            Comparison::Equal => '=',
        }
    }
}

/// A comparison between one binding's column and a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterInfo {
    pub column: SelectInfo,
    pub constant: u64,
    pub comparison: Comparison,
}

impl FilterInfo {
    /// Evaluates the filter against a single column value.
    pub fn matches(&self, value: u64) -> bool {
        match self.comparison {
            Comparison::Less => value < self.constant,
            Comparison::Greater => value > self.constant,
            Comparison::Equal => value == self.constant,
        }
    }

    /// Renders the filter in query-text form.
    pub fn dump_text(&self) -> String {
        format!(
            "{}{}{}",
            self.column.dump_text(),
            self.comparison.as_char(),
            self.constant
        )
    }

    /// Renders the filter in SQL form.
    pub fn dump_sql(&self) -> String {
        format!(
            "{}{}{}",
            self.column.dump_sql(false),
            self.comparison.as_char(),
            self.constant
        )
    }
}

/// An equi-join condition between two bindings' columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredicateInfo {
    pub left: SelectInfo,
    pub right: SelectInfo,
}

impl PredicateInfo {
    pub fn new(left: SelectInfo, right: SelectInfo) -> Self {
        Self { left, right }
    }

    /// Renders the predicate in query-text form.
    pub fn dump_text(&self) -> String {
        format!("{}={}", self.left.dump_text(), self.right.dump_text())
    }

    /// Renders the predicate in SQL form.
    pub fn dump_sql(&self) -> String {
        format!("{}={}", self.left.dump_sql(false), self.right.dump_sql(false))
    }
}

/// A parsed query: binding table, join predicates, constant filters, and
/// output selections, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryInfo {
    /// Relation ids by binding (position = binding).
    pub relation_ids: Vec<RelationId>,
    /// Join predicates, in source order.
    pub predicates: Vec<PredicateInfo>,
    /// Constant filters, in source order.
    pub filters: Vec<FilterInfo>,
    /// Output columns, in source order.
    pub selections: Vec<SelectInfo>,
}

impl QueryInfo {
    /// Renders the query in canonical text form: predicates precede filters,
    /// otherwise source order is kept.
    pub fn dump_text(&self) -> String {
        let mut text = String::new();
        for (i, rel_id) in self.relation_ids.iter().enumerate() {
            if i > 0 {
                text.push(' ');
            }
            text.push_str(&rel_id.to_string());
        }
        text.push('|');

        let predicates: Vec<String> = self.predicates.iter().map(|p| p.dump_text()).collect();
        let filters: Vec<String> = self.filters.iter().map(|f| f.dump_text()).collect();
        text.push_str(&predicates.join("&"));
        if !predicates.is_empty() && !filters.is_empty() {
            text.push('&');
        }
        text.push_str(&filters.join("&"));

        text.push('|');
        let selections: Vec<String> = self.selections.iter().map(|s| s.dump_text()).collect();
        text.push_str(&selections.join(" "));
        text
    }

    /// Renders the query as a SQL `SELECT SUM(...)` statement. Bindings
    /// become quoted table aliases and columns are named `cN`.
    pub fn dump_sql(&self) -> String {
        let mut sql = String::from("SELECT ");
        let sums: Vec<String> = self.selections.iter().map(|s| s.dump_sql(true)).collect();
        sql.push_str(&sums.join(", "));

        sql.push_str(" FROM ");
        let tables: Vec<String> = self
            .relation_ids
            .iter()
            .enumerate()
            .map(|(binding, rel_id)| format!("r{rel_id} \"{binding}\""))
            .collect();
        sql.push_str(&tables.join(", "));

        sql.push_str(" WHERE ");
        let predicates: Vec<String> = self.predicates.iter().map(|p| p.dump_sql()).collect();
        let filters: Vec<String> = self.filters.iter().map(|f| f.dump_sql()).collect();
        sql.push_str(&predicates.join(" and "));
        if !predicates.is_empty() && !filters.is_empty() {
            sql.push_str(" and ");
        }
        sql.push_str(&filters.join(" and "));

        sql.push(';');
        sql
    }
}

impl fmt::Display for QueryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump_text())
    }
}
