mod common;
use common::*;

use std::path::Path;

fn run_example(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("examples")
        .join(name);
    let source = std::fs::read_to_string(&path).expect("example should be readable");
    run(&source)
}

#[test]
fn examples_run() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("examples");
    let mut count = 0;
    for entry in std::fs::read_dir(&root).expect("examples dir should exist") {
        let path = entry.expect("dir entry").path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("tl") {
            continue;
        }
        let source = std::fs::read_to_string(&path).expect("example should be readable");
        let mut interpreter = interpreter();
        if let Err(err) = interpreter.run_source(&source) {
            panic!("{} failed:\n{}", path.display(), render_error(&source, &err));
        }
        count += 1;
    }
    assert!(count >= 4, "expected the bundled examples, found {count}");
}

#[test]
fn counter_example() {
    assert_eq!(run_example("counter.tl"), "4 \n");
}

#[test]
fn functions_example() {
    assert_eq!(run_example("functions.tl"), "55 12 \n");
}

#[test]
fn fizzbuzz_example() {
    let expected: String = [
        "1", "2", "Fizz", "4", "Buzz", "Fizz", "7", "8", "Fizz", "Buzz", "11", "Fizz", "13", "14",
        "FizzBuzz",
    ]
    .iter()
    .map(|line| format!("{line} \n"))
    .collect();
    assert_eq!(run_example("fizzbuzz.tl"), expected);
}

#[test]
fn average_example() {
    assert_eq!(run_example("average.tl"), "mean 2.166667 true \n");
}
