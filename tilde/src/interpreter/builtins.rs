use std::io::{BufRead, Write};
use std::sync::LazyLock;

use regex::Regex;

use super::Interpreter;
use crate::ast::Expr;
use crate::error::{RuntimeError, RuntimeResult};
use crate::scope::ScopeId;
use crate::value::Value;

type Pattern = LazyLock<Result<Regex, regex::Error>>;

static INT_PREFIX: Pattern = LazyLock::new(|| Regex::new(r"^\s*[+-]?[0-9]+"));
static FLOAT_PREFIX: Pattern =
    LazyLock::new(|| Regex::new(r"^\s*[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?"));

/// Functions resolved by name before the user function table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    Write,
    Read,
    Int,
    Float,
    String,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "write" => Some(Builtin::Write),
            "read" => Some(Builtin::Read),
            "int" => Some(Builtin::Int),
            "float" => Some(Builtin::Float),
            "string" => Some(Builtin::String),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Write => "write",
            Builtin::Read => "read",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::String => "string",
        }
    }
}

// Builtins receive their arguments unevaluated: arity is checked before any
// argument runs and `write` prints each value as soon as it is evaluated.
impl<W: Write, R: BufRead> Interpreter<W, R> {
    pub(super) fn call_builtin(
        &mut self,
        builtin: Builtin,
        args: &[Expr],
        scope: ScopeId,
    ) -> RuntimeResult<Value> {
        match builtin {
            Builtin::Write => self.builtin_write(args, scope),
            Builtin::Read => self.builtin_read(args, scope),
            Builtin::Int => to_int(self.single_arg(builtin, args, scope)?),
            Builtin::Float => to_float(self.single_arg(builtin, args, scope)?),
            Builtin::String => to_string(self.single_arg(builtin, args, scope)?),
        }
    }

    fn builtin_write(&mut self, args: &[Expr], scope: ScopeId) -> RuntimeResult<Value> {
        let printed = self.write_args(args, scope);
        if printed.is_ok() {
            writeln!(self.output)?;
        }
        self.output.flush()?;
        printed.map(|()| Value::Unit)
    }

    fn write_args(&mut self, args: &[Expr], scope: ScopeId) -> RuntimeResult<()> {
        for (index, arg) in args.iter().enumerate() {
            let value = self.eval(arg, scope)?;
            if value.is_unit() {
                return Err(RuntimeError::InvalidArgument {
                    function: "write",
                    index,
                    found: value.type_name(),
                });
            }
            write!(self.output, "{value} ")?;
        }
        Ok(())
    }

    fn builtin_read(&mut self, args: &[Expr], scope: ScopeId) -> RuntimeResult<Value> {
        match args {
            [] => {}
            [arg] => match self.eval(arg, scope)? {
                Value::String(prompt) => {
                    write!(self.output, "{prompt}")?;
                    self.output.flush()?;
                }
                other => {
                    return Err(RuntimeError::InvalidArgument {
                        function: "read",
                        index: 0,
                        found: other.type_name(),
                    });
                }
            },
            _ => {
                return Err(RuntimeError::BuiltinArity {
                    function: "read",
                    expected: "expected at most 1 arg",
                    got: args.len(),
                });
            }
        }

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Value::String(line))
    }

    fn single_arg(&mut self, builtin: Builtin, args: &[Expr], scope: ScopeId) -> RuntimeResult<Value> {
        let [arg] = args else {
            return Err(arity_error(builtin, args.len()));
        };
        self.eval(arg, scope)
    }
}

fn arity_error(builtin: Builtin, got: usize) -> RuntimeError {
    RuntimeError::BuiltinArity {
        function: builtin.name(),
        expected: "expected exactly 1 arg",
        got,
    }
}

fn noop_argument(builtin: Builtin) -> RuntimeError {
    RuntimeError::InvalidArgument {
        function: builtin.name(),
        index: 0,
        found: Value::Unit.type_name(),
    }
}

fn to_int(value: Value) -> RuntimeResult<Value> {
    let result = match value {
        Value::Int(v) => v,
        Value::Float(v) => v as i64,
        Value::Bool(v) => i64::from(v),
        Value::String(text) => parse_prefix(&INT_PREFIX, &text)?.unwrap_or(0),
        Value::Unit => return Err(noop_argument(Builtin::Int)),
    };
    Ok(Value::Int(result))
}

fn to_float(value: Value) -> RuntimeResult<Value> {
    let result = match value {
        Value::Int(v) => v as f64,
        Value::Float(v) => v,
        Value::Bool(v) => f64::from(u8::from(v)),
        Value::String(text) => parse_prefix(&FLOAT_PREFIX, &text)?.unwrap_or(0.0),
        Value::Unit => return Err(noop_argument(Builtin::Float)),
    };
    Ok(Value::Float(result))
}

fn to_string(value: Value) -> RuntimeResult<Value> {
    match value {
        Value::String(text) => Ok(Value::String(text)),
        Value::Bool(v) => Ok(Value::String(v.to_string())),
        Value::Unit => Err(noop_argument(Builtin::String)),
        other => Err(RuntimeError::UnsupportedConversion {
            function: "string",
            from: other.type_name(),
        }),
    }
}

/// Parses the longest numeric prefix of `text`, like C's `atoi`/`atof`.
fn parse_prefix<T: std::str::FromStr>(pattern: &Pattern, text: &str) -> RuntimeResult<Option<T>> {
    let regex = LazyLock::force(pattern)
        .as_ref()
        .map_err(|err| RuntimeError::Internal(format!("numeric prefix pattern: {err}")))?;
    Ok(regex
        .find(text)
        .and_then(|found| found.as_str().trim_start().parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_to_number_uses_leading_prefix() {
        assert_eq!(to_int(Value::from("  42abc")), Ok(Value::Int(42)));
        assert_eq!(to_int(Value::from("-7")), Ok(Value::Int(-7)));
        assert_eq!(to_int(Value::from("abc")), Ok(Value::Int(0)));
        assert_eq!(to_float(Value::from("2.5kg")), Ok(Value::Float(2.5)));
        assert_eq!(to_float(Value::from("1e2")), Ok(Value::Float(100.0)));
        assert_eq!(to_float(Value::from("")), Ok(Value::Float(0.0)));
    }

    #[test]
    fn numeric_and_bool_conversions() {
        assert_eq!(to_int(Value::Float(-3.9)), Ok(Value::Int(-3)));
        assert_eq!(to_int(Value::Bool(true)), Ok(Value::Int(1)));
        assert_eq!(to_float(Value::Int(2)), Ok(Value::Float(2.0)));
        assert_eq!(to_float(Value::Bool(false)), Ok(Value::Float(0.0)));
        assert_eq!(to_string(Value::Bool(true)), Ok(Value::from("true")));
    }

    #[test]
    fn string_of_number_is_unsupported() {
        let err = to_string(Value::Int(1)).expect_err("string(int) should fail");
        assert_eq!(
            err.to_string(),
            "function string: conversion from int is not supported"
        );
    }

    #[test]
    fn prefix_patterns_compile() {
        assert!(INT_PREFIX.is_ok());
        assert!(FLOAT_PREFIX.is_ok());
    }

    #[test]
    fn noop_cannot_be_converted() {
        let err = to_int(Value::Unit).expect_err("noop should fail");
        assert_eq!(err.to_string(), "unexpected 0 indexed arg at function int: 'noop'");
        let err = to_string(Value::Unit).expect_err("noop should fail");
        assert_eq!(err, noop_argument(Builtin::String));
    }

    #[test]
    fn conversion_arity_message() {
        assert_eq!(
            arity_error(Builtin::Float, 2).to_string(),
            "function float: expected exactly 1 arg, got 2"
        );
    }
}
