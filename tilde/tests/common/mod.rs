#![allow(dead_code, unused_imports)]

use std::io::Cursor;

pub use tilde::{
    Error, Interpreter, ModuleRegistry, NativeFunction, ParseError, RuntimeError, ScalarType,
    Value, parse, render_error, tokenize,
};

pub type TestInterpreter = Interpreter<Vec<u8>, Cursor<Vec<u8>>>;

pub fn interpreter() -> TestInterpreter {
    interpreter_with_input("")
}

pub fn interpreter_with_input(input: &str) -> TestInterpreter {
    Interpreter::with_io(Vec::new(), Cursor::new(input.as_bytes().to_vec()))
}

pub fn stdout(interpreter: &TestInterpreter) -> String {
    String::from_utf8_lossy(interpreter.output()).into_owned()
}

/// Runs `source` and returns everything it wrote.
pub fn run(source: &str) -> String {
    let mut interpreter = interpreter();
    interpreter
        .run_source(source)
        .unwrap_or_else(|err| panic!("program should run, got: {err}"));
    stdout(&interpreter)
}

pub fn run_with_input(source: &str, input: &str) -> String {
    let mut interpreter = interpreter_with_input(input);
    interpreter
        .run_source(source)
        .unwrap_or_else(|err| panic!("program should run, got: {err}"));
    stdout(&interpreter)
}

/// Runs `source`, expecting failure. Returns the error and the output
/// produced before it.
pub fn run_err(source: &str) -> (Error, String) {
    let mut interpreter = interpreter();
    let err = interpreter
        .run_source(source)
        .expect_err("program should fail");
    (err, stdout(&interpreter))
}

pub fn runtime_error(source: &str) -> (usize, RuntimeError) {
    match run_err(source).0 {
        Error::Runtime { line, error } => (line, error),
        other => panic!("expected runtime error, got: {other}"),
    }
}

pub struct Counter {
    pub calls: i64,
}

impl NativeFunction for Counter {
    fn call(&mut self, _args: &[Value]) -> Result<Value, String> {
        self.calls += 1;
        Ok(Value::Int(self.calls))
    }
}

pub fn static_double(args: &[Value]) -> Result<Value, String> {
    match args {
        [Value::Int(value)] => Ok(Value::Int(value * 2)),
        _ => Err("expected one int".to_string()),
    }
}

pub fn static_join(args: &[Value]) -> Result<Value, String> {
    let parts: Vec<String> = args.iter().map(ToString::to_string).collect();
    Ok(Value::String(parts.join("-")))
}

pub fn util_modules() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register_static("util", "double", static_double);
    registry.register_static("util", "join", static_join);
    registry.register("util", "counter", || Box::new(Counter { calls: 0 }));
    registry
}
