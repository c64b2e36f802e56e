//! Full batch-protocol runs: relation paths, `Done`, query batches.

use std::io::Cursor;

use tally::driver::Driver;
use tally::engine::Engine;
use tally::relation::Relation;

/// Writes the five standard fixtures and returns the full load-phase
/// preamble (paths followed by `Done`).
fn preamble(dir: &std::path::Path) -> String {
    let mut input = String::new();
    for i in 0..5 {
        let path = dir.join(format!("r{i}"));
        Relation::sequential(10, 3).store(&path).unwrap();
        input.push_str(&format!("{}\n", path.display()));
    }
    input.push_str("Done\n");
    input
}

fn run(input: &str) -> String {
    let mut engine = Engine::new();
    let mut output = Vec::new();
    Driver::new(Cursor::new(input), &mut output)
        .run(&mut engine)
        .unwrap();
    String::from_utf8(output).unwrap()
}

#[test]
fn test_single_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut input = preamble(dir.path());
    input.push_str("1 2|0.0=1.1|1.2\n");
    input.push_str("0 1 4|0.0=1.1&1.2=2.0&1.1=4|1.0 2.2\n");
    input.push_str("F\n");

    assert_eq!(run(&input), "45\n4 4\n");
}

#[test]
fn test_multiple_batches_one_response_per_query() {
    let dir = tempfile::tempdir().unwrap();
    let mut input = preamble(dir.path());
    input.push_str("1 2|0.0=1.1|1.2\n");
    input.push_str("F\n");
    input.push_str("0 1 2|0.0=1.1&1.2=2.0&1.1=100|1.0 2.2\n");
    input.push_str("0 1|0.0=1.1&0.0>1&0.0<3|1.0\n");
    input.push_str("F\n");
    input.push_str("0 0|0.0=1.1|1.0\n");
    input.push_str("F\n");

    let output = run(&input);
    assert_eq!(output, "45\nNULL NULL\n2\n45\n");
    assert_eq!(output.lines().count(), 4);
}

#[test]
fn test_workload_without_trailing_separator() {
    let dir = tempfile::tempdir().unwrap();
    let mut input = preamble(dir.path());
    input.push_str("1 2|0.0=1.1|1.2\n");

    // Output is still flushed at end of input.
    assert_eq!(run(&input), "45\n");
}
