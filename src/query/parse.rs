//! Parser for the compact query-text format.

use super::error::ParseError;
use super::info::{Comparison, FilterInfo, PredicateInfo, QueryInfo, SelectInfo};
use crate::relation::RelationId;

impl QueryInfo {
    /// Parses one query line, `RELATIONS|PREDICATES|SELECTIONS`, and
    /// resolves every column reference against the binding table.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let parts: Vec<&str> = line.split('|').collect();
        if parts.len() != 3 {
            return Err(ParseError::MissingPart { found: parts.len() });
        }

        let relation_ids = parse_relation_ids(parts[0])?;
        let (predicates, filters) = parse_predicates(parts[1])?;
        let selections = parse_selections(parts[2])?;

        let mut query = QueryInfo {
            relation_ids,
            predicates,
            filters,
            selections,
        };
        query.resolve_relation_ids()?;
        Ok(query)
    }

    /// Fills in the `rel_id` of every column reference from the binding
    /// table, rejecting bindings outside the FROM list.
    fn resolve_relation_ids(&mut self) -> Result<(), ParseError> {
        let bindings = &self.relation_ids;
        for selection in &mut self.selections {
            resolve(bindings, selection)?;
        }
        for predicate in &mut self.predicates {
            resolve(bindings, &mut predicate.left)?;
            resolve(bindings, &mut predicate.right)?;
        }
        for filter in &mut self.filters {
            resolve(bindings, &mut filter.column)?;
        }
        Ok(())
    }
}

fn resolve(relation_ids: &[RelationId], info: &mut SelectInfo) -> Result<(), ParseError> {
    match relation_ids.get(info.binding) {
        Some(&rel_id) => {
            info.rel_id = Some(rel_id);
            Ok(())
        }
        None => Err(ParseError::BindingOutOfRange {
            binding: info.binding,
            bindings: relation_ids.len(),
        }),
    }
}

/// Parses the space-separated relation-id list; position = binding.
pub fn parse_relation_ids(input: &str) -> Result<Vec<RelationId>, ParseError> {
    input
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(parse_number)
        .collect()
}

/// Parses the `&`-separated predicate list, splitting it into join
/// predicates and constant filters. A token is a filter exactly when its
/// right-hand side contains no `.`.
pub fn parse_predicates(
    input: &str,
) -> Result<(Vec<PredicateInfo>, Vec<FilterInfo>), ParseError> {
    let mut predicates = Vec::new();
    let mut filters = Vec::new();

    for token in input.split('&').filter(|token| !token.is_empty()) {
        let (comparison, position) = find_comparison(token)?;
        let left = &token[..position];
        let right = &token[position + 1..];

        if is_constant(left) {
            return Err(ParseError::InvalidColumnRef {
                token: left.to_string(),
            });
        }
        let left = parse_column_ref(left)?;

        if is_constant(right) {
            filters.push(FilterInfo {
                column: left,
                constant: parse_number(right)?,
                comparison,
            });
        } else {
            predicates.push(PredicateInfo::new(left, parse_column_ref(right)?));
        }
    }

    Ok((predicates, filters))
}

/// Parses the space-separated output-column list.
pub fn parse_selections(input: &str) -> Result<Vec<SelectInfo>, ParseError> {
    input
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(parse_column_ref)
        .collect()
}

/// Locates the comparison operator of a predicate token, probing the
/// operators in the fixed `<`, `>`, `=` order.
fn find_comparison(token: &str) -> Result<(Comparison, usize), ParseError> {
    Comparison::ALL
        .iter()
        .find_map(|&comparison| {
            token
                .find(comparison.as_char())
                .map(|position| (comparison, position))
        })
        .ok_or_else(|| ParseError::InvalidPredicate {
            token: token.to_string(),
        })
}

/// A side of a predicate is a constant exactly when it has no `.`.
fn is_constant(token: &str) -> bool {
    !token.contains('.')
}

/// Parses a `binding.column` reference.
fn parse_column_ref(token: &str) -> Result<SelectInfo, ParseError> {
    let mut ids = token.split('.');
    let (Some(binding), Some(col_id), None) = (ids.next(), ids.next(), ids.next()) else {
        return Err(ParseError::InvalidColumnRef {
            token: token.to_string(),
        });
    };
    Ok(SelectInfo::new(
        parse_number(binding)?,
        parse_number(col_id)?,
    ))
}

fn parse_number<T: std::str::FromStr>(token: &str) -> Result<T, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidNumber {
        token: token.to_string(),
    })
}
