use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use tally::driver::Driver;
use tally::engine::Engine;
use tally::query::QueryInfo;
use tally::relation::Relation;

/// Columnar equi-join engine speaking the batched workload protocol.
///
/// Without a subcommand, reads relation file paths (terminated by `Done`)
/// and then query batches from stdin, writing one response line per query
/// to stdout. Logs go to stderr; stdout carries protocol output only.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Translate a workload file into SQL statements.
    Sql {
        /// Workload file, one query per line (`F` separator lines are skipped).
        workload: PathBuf,
    },
    /// Generate sequential test relations in binary, CSV, and SQL form.
    Gen {
        /// Rows per relation.
        #[arg(long, default_value_t = 10)]
        rows: u64,
        /// Columns per relation.
        #[arg(long, default_value_t = 3)]
        cols: usize,
        /// Number of relations to generate.
        #[arg(long, default_value_t = 5)]
        count: usize,
        /// Directory the relation files are written into.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let result = match Args::parse().command {
        None => serve(),
        Some(Command::Sql { workload }) => translate(&workload),
        Some(Command::Gen {
            rows,
            cols,
            count,
            out,
        }) => generate(rows, cols, count, &out),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Runs the batch protocol over stdin/stdout.
fn serve() -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut engine = Engine::new();
    Driver::new(stdin.lock(), BufWriter::new(stdout.lock())).run(&mut engine)?;
    Ok(())
}

/// Prints the SQL rendering of every query in a workload file.
fn translate(workload: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let reader = BufReader::new(File::open(workload)?);
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() || line == "F" {
            continue;
        }
        let query = QueryInfo::parse(&line)?;
        println!("{}", query.dump_sql());
    }
    Ok(())
}

/// Writes `count` sequential relations named `r0..` under `out` and prints
/// each base path, one per line.
fn generate(
    rows: u64,
    cols: usize,
    count: usize,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(out)?;
    for id in 0..count {
        let relation = Relation::sequential(rows, cols);
        let base = out.join(format!("r{id}"));
        relation.store(&base)?;
        relation.store_csv(base.with_extension("tbl"))?;
        std::fs::write(base.with_extension("sql"), relation.sql_schema(id))?;
        println!("{}", base.display());
    }
    Ok(())
}
