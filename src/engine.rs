//! Engine orchestrator: owns the loaded relations and executes queries.

use std::fmt;
use std::path::Path;

use crate::executor::{plan_query, PlanError};
use crate::query::{ParseError, QueryInfo};
use crate::relation::{Relation, RelationError, RelationId};

/// The join engine: a registry of loaded relations plus one-shot query
/// execution over them.
///
/// Relations are immutable once added and shared read-only by every query;
/// queries run serially, each building and consuming its own operator tree.
#[derive(Default)]
pub struct Engine {
    relations: Vec<Relation>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory-maps a relation file and registers it under the next id.
    pub fn load_relation(&mut self, path: impl AsRef<Path>) -> Result<RelationId, EngineError> {
        let relation = Relation::open(path)?;
        Ok(self.add_relation(relation))
    }

    /// Registers an in-memory relation under the next id.
    pub fn add_relation(&mut self, relation: Relation) -> RelationId {
        self.relations.push(relation);
        self.relations.len() - 1
    }

    /// The loaded relations, indexed by [`RelationId`].
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Parses and executes one query line, returning the newline-terminated
    /// response.
    pub fn execute(&self, line: &str) -> Result<String, EngineError> {
        let query = QueryInfo::parse(line)?;
        self.execute_query(&query)
    }

    /// Executes a parsed query: plan, run, format.
    ///
    /// The response carries one decimal sum per selected column, space
    /// separated — or `NULL` per column when the join result is empty.
    pub fn execute_query(&self, query: &QueryInfo) -> Result<String, EngineError> {
        let mut checksum = plan_query(&self.relations, query)?;
        checksum.run();

        let mut response = String::new();
        for (i, sum) in checksum.check_sums().iter().enumerate() {
            if i > 0 {
                response.push(' ');
            }
            if checksum.result_size() == 0 {
                response.push_str("NULL");
            } else {
                response.push_str(&sum.to_string());
            }
        }
        response.push('\n');
        Ok(response)
    }
}

/// Errors that can occur while loading relations or executing a query.
#[derive(Debug)]
pub enum EngineError {
    /// Query text could not be parsed.
    Parse(ParseError),
    /// A relation file could not be loaded.
    Relation(RelationError),
    /// The query references relations that are not loaded.
    Plan(PlanError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Parse(e) => write!(f, "parse error: {e}"),
            EngineError::Relation(e) => write!(f, "relation error: {e}"),
            EngineError::Plan(e) => write!(f, "plan error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Parse(e) => Some(e),
            EngineError::Relation(e) => Some(e),
            EngineError::Plan(e) => Some(e),
        }
    }
}

impl From<ParseError> for EngineError {
    fn from(e: ParseError) -> Self {
        EngineError::Parse(e)
    }
}

impl From<RelationError> for EngineError {
    fn from(e: RelationError) -> Self {
        EngineError::Relation(e)
    }
}

impl From<PlanError> for EngineError {
    fn from(e: PlanError) -> Self {
        EngineError::Plan(e)
    }
}
