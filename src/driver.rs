//! The batched workload protocol.
//!
//! The driver speaks a two-phase line protocol:
//!
//! 1. **Load phase.** Each input line is a relation file path; the literal
//!    line `Done` ends the phase. Paths are loaded in order, so line
//!    position determines [`RelationId`].
//! 2. **Query phase.** Each line is a query; the engine answers every query
//!    with exactly one response line. Lines containing only `F` separate
//!    batches — the driver flushes its output there so the harness can
//!    collect a batch's responses before sending the next.
//!
//! Any failure (I/O, malformed query, missing relation) aborts the loop;
//! no partial response is written for a failed query.
//!
//! [`RelationId`]: crate::relation::RelationId

use std::fmt;
use std::io::{self, BufRead, Write};

use tracing::{debug, info};

use crate::engine::{Engine, EngineError};

/// Runs the batch protocol over a pair of byte streams.
pub struct Driver<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Driver<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Drives both protocol phases to completion.
    pub fn run(mut self, engine: &mut Engine) -> Result<(), DriverError> {
        self.load_phase(engine)?;
        self.query_phase(engine)
    }

    /// Reads relation file paths until the `Done` line.
    fn load_phase(&mut self, engine: &mut Engine) -> Result<(), DriverError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                // Input ended before `Done`; there is nothing to serve.
                return Ok(());
            }
            let path = line.trim_end_matches(['\r', '\n']);
            if path == "Done" {
                break;
            }
            let id = engine.load_relation(path)?;
            debug!(id, path, "loaded relation");
        }
        info!(relations = engine.relations().len(), "relation load complete");
        Ok(())
    }

    /// Answers queries until end of input, flushing at batch boundaries.
    fn query_phase(&mut self, engine: &mut Engine) -> Result<(), DriverError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                break;
            }
            let query = line.trim_end_matches(['\r', '\n']);
            if query == "F" {
                // End of batch.
                self.output.flush()?;
                debug!("batch complete");
                continue;
            }
            let response = engine.execute(query)?;
            self.output.write_all(response.as_bytes())?;
        }
        self.output.flush()?;
        Ok(())
    }
}

/// Errors that abort the protocol loop.
#[derive(Debug)]
pub enum DriverError {
    Io(io::Error),
    Engine(EngineError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Io(e) => write!(f, "i/o error: {e}"),
            DriverError::Engine(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::Io(e) => Some(e),
            DriverError::Engine(e) => Some(e),
        }
    }
}

impl From<io::Error> for DriverError {
    fn from(e: io::Error) -> Self {
        DriverError::Io(e)
    }
}

impl From<EngineError> for DriverError {
    fn from(e: EngineError) -> Self {
        DriverError::Engine(e)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::relation::Relation;

    fn run_driver(engine: &mut Engine, input: &str) -> String {
        let mut output = Vec::new();
        Driver::new(Cursor::new(input), &mut output)
            .run(engine)
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_query_phase_batches() {
        let mut engine = Engine::new();
        for _ in 0..3 {
            engine.add_relation(Relation::sequential(10, 3));
        }

        // Relations are pre-registered, so the load phase is just `Done`.
        let input = "Done\n\
                     1 2|0.0=1.1|1.2\n\
                     F\n\
                     0 1|0.0=1.1&0.0>1&0.0<3|1.0\n\
                     0 1|0.0=1.1&0.0<3&1.0>3|1.0\n\
                     F\n";
        assert_eq!(run_driver(&mut engine, input), "45\n2\nNULL\n");
    }

    #[test]
    fn test_load_phase_loads_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let small = dir.path().join("small");
        let large = dir.path().join("large");
        Relation::sequential(4, 2).store(&small).unwrap();
        Relation::sequential(10, 3).store(&large).unwrap();

        let mut engine = Engine::new();
        let input = format!(
            "{}\n{}\nDone\n0 1|0.0=1.1|1.0\nF\n",
            small.display(),
            large.display()
        );
        // Join keys 0..3 match once each; sum of 0..3 is 6.
        assert_eq!(run_driver(&mut engine, &input), "6\n");
        assert_eq!(engine.relations().len(), 2);
        assert_eq!(engine.relations()[0].row_count(), 4);
        assert_eq!(engine.relations()[1].row_count(), 10);
    }

    #[test]
    fn test_input_ending_before_done() {
        let mut engine = Engine::new();
        assert_eq!(run_driver(&mut engine, ""), "");
    }

    #[test]
    fn test_missing_relation_file_aborts() {
        let mut engine = Engine::new();
        let result = Driver::new(Cursor::new("/nonexistent/r0\nDone\n"), Vec::new())
            .run(&mut engine);
        assert!(matches!(result, Err(DriverError::Engine(_))));
    }

    #[test]
    fn test_malformed_query_aborts() {
        let mut engine = Engine::new();
        engine.add_relation(Relation::sequential(10, 3));
        let result =
            Driver::new(Cursor::new("Done\nbogus\n"), Vec::new()).run(&mut engine);
        assert!(matches!(result, Err(DriverError::Engine(_))));
    }
}
