//! Query model and compact-text parser.
//!
//! A query line has the form `RELATIONS|PREDICATES|SELECTIONS`:
//!
//! - `RELATIONS` is a space-separated list of relation ids; the position of
//!   each id is its *binding*, the alias used everywhere else in the query.
//!   The same relation may appear under several bindings.
//! - `PREDICATES` is an `&`-separated mix of join predicates (`b1.c1=b2.c2`)
//!   and constant filters (`b.c<K`, `b.c>K`, `b.c=K`). A token is a filter
//!   exactly when its right-hand side contains no `.`.
//! - `SELECTIONS` is a space-separated list of output columns `b.c`.
//!
//! Parsing resolves every column reference against the binding table, so a
//! successfully parsed [`QueryInfo`] always carries relation ids alongside
//! bindings.

mod error;
mod info;
mod parse;

pub use error::ParseError;
pub use info::{Comparison, FilterInfo, PredicateInfo, QueryInfo, SelectInfo};
pub use parse::{parse_predicates, parse_relation_ids, parse_selections};
