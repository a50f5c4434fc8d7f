use std::io;
use std::process::ExitCode;

use rustyline::error::ReadlineError;
use rustyline::{Cmd, DefaultEditor, KeyCode, KeyEvent, Modifiers};
use tilde::{Interpreter, ModuleRegistry, Value, logging, render_error};
use tracing::debug;

const EXIT_LANGUAGE_ERROR: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CliConfig {
    source: Option<String>,
    repl: bool,
    log_level: Option<String>,
    help: bool,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_cli_args(&args) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            return ExitCode::from(EXIT_USAGE);
        }
    };
    if cli.help {
        print_usage();
        return ExitCode::SUCCESS;
    }
    if let Err(err) = logging::init(cli.log_level.as_deref()) {
        eprintln!("invalid log filter: {err}");
        return ExitCode::from(EXIT_USAGE);
    }

    if cli.repl {
        return match run_repl() {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("{} {err}", logging::category_error());
                ExitCode::from(EXIT_LANGUAGE_ERROR)
            }
        };
    }
    match cli.source.as_deref() {
        Some(path) => run_file(path),
        None => {
            print_usage();
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn parse_cli_args(args: &[String]) -> Result<CliConfig, String> {
    let mut cfg = CliConfig::default();
    if args.is_empty() {
        cfg.repl = true;
        return Ok(cfg);
    }
    let mut index = 0usize;

    if let Some(first) = args.first()
        && first == "repl"
    {
        cfg.repl = true;
        index = 1;
    }

    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => {
                cfg.help = true;
                index += 1;
            }
            "--repl" => {
                cfg.repl = true;
                index += 1;
            }
            "--log-level" => {
                let level = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --log-level".to_string())?;
                cfg.log_level = Some(level.clone());
                index += 2;
            }
            value if value.starts_with('-') => {
                return Err(format!("unknown flag '{value}'"));
            }
            path => {
                if cfg.source.is_some() {
                    return Err("multiple source paths provided".to_string());
                }
                cfg.source = Some(path.to_string());
                index += 1;
            }
        }
    }

    if cfg.repl && cfg.source.is_some() {
        return Err("repl mode does not accept a source path".to_string());
    }
    if !cfg.repl && !cfg.help && cfg.source.is_none() {
        cfg.repl = true;
    }
    Ok(cfg)
}

fn print_usage() {
    println!("Usage:");
    println!("  tilde                        (defaults to REPL)");
    println!("  tilde [--log-level <filter>] <source.tl>");
    println!("  tilde --repl");
    println!("  tilde repl");
}

fn run_file(path: &str) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            debug!(path, error = %err, "failed to read source");
            eprintln!("No file found named \"{path}\"");
            return ExitCode::from(EXIT_USAGE);
        }
    };
    debug!(path, bytes = source.len(), "loaded source");

    let mut interpreter = Interpreter::new().with_loader(native_modules());
    match interpreter.run_source(&source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", logging::category_error(), render_error(&source, &err));
            ExitCode::from(EXIT_LANGUAGE_ERROR)
        }
    }
}

fn run_repl() -> Result<(), Box<dyn std::error::Error>> {
    println!("tilde REPL");
    println!("blocks end with an empty line, commands: .help, .quit");
    println!("state: globals and functions persist across entries");
    let mut editor = DefaultEditor::new()?;
    // indentation is made of tabs, so the tab key must not trigger completion
    editor.bind_sequence(
        KeyEvent(KeyCode::Tab, Modifiers::NONE),
        Cmd::Insert(1, "\t".to_string()),
    );
    let mut interpreter = Interpreter::new().with_loader(native_modules());
    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "tilde> " } else { "  ... " };
        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if buffer.is_empty() {
                    if trimmed.is_empty() {
                        continue;
                    }
                    if let Some(action) = handle_repl_command(trimmed) {
                        if action == ReplAction::Break {
                            break;
                        }
                        continue;
                    }
                    let _ = editor.add_history_entry(line.as_str());
                    if !opens_block(trimmed) {
                        eval_snippet(&mut interpreter, &line);
                        continue;
                    }
                } else if trimmed.is_empty() {
                    let snippet = std::mem::take(&mut buffer);
                    eval_snippet(&mut interpreter, &snippet);
                    continue;
                } else {
                    let _ = editor.add_history_entry(line.as_str());
                }
                buffer.push_str(&line);
                buffer.push('\n');
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("bye");
                break;
            }
            Err(err) => {
                return Err(Box::new(io::Error::other(err.to_string())));
            }
        }
    }
    Ok(())
}

fn eval_snippet(interpreter: &mut Interpreter, snippet: &str) {
    if let Err(err) = interpreter.run_source(snippet) {
        eprintln!("{} {}", logging::category_error(), render_error(snippet, &err));
    }
}

/// Lines that start a block keep the REPL reading until an empty line.
fn opens_block(line: &str) -> bool {
    let first = line.split_whitespace().next().unwrap_or_default();
    matches!(first, "if" | "else" | "while" | "for" | "function") || line.ends_with('\\')
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReplAction {
    Continue,
    Break,
}

fn handle_repl_command(line: &str) -> Option<ReplAction> {
    match line {
        ".quit" | ".exit" => Some(ReplAction::Break),
        ".help" => {
            println!("commands:");
            println!("  .help      show commands");
            println!("  .quit      quit repl");
            println!("  .exit      quit repl");
            println!("modules: include math  (abs, min, max, sqrt, pow)");
            Some(ReplAction::Continue)
        }
        _ if line.starts_with('.') => {
            println!("unknown command: {line}");
            Some(ReplAction::Continue)
        }
        _ => None,
    }
}

fn native_modules() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register_static("math", "abs", math_abs);
    registry.register_static("math", "min", math_min);
    registry.register_static("math", "max", math_max);
    registry.register_static("math", "sqrt", math_sqrt);
    registry.register_static("math", "pow", math_pow);
    registry
}

fn math_abs(args: &[Value]) -> Result<Value, String> {
    match args {
        [Value::Int(value)] => Ok(Value::Int(value.wrapping_abs())),
        [Value::Float(value)] => Ok(Value::Float(value.abs())),
        _ => Err(bad_args("one number", args)),
    }
}

fn math_min(args: &[Value]) -> Result<Value, String> {
    match args {
        [Value::Int(a), Value::Int(b)] => Ok(Value::Int(*a.min(b))),
        [a, b] => match (as_number(a), as_number(b)) {
            (Some(a), Some(b)) => Ok(Value::Float(a.min(b))),
            _ => Err(bad_args("two numbers", args)),
        },
        _ => Err(bad_args("two numbers", args)),
    }
}

fn math_max(args: &[Value]) -> Result<Value, String> {
    match args {
        [Value::Int(a), Value::Int(b)] => Ok(Value::Int(*a.max(b))),
        [a, b] => match (as_number(a), as_number(b)) {
            (Some(a), Some(b)) => Ok(Value::Float(a.max(b))),
            _ => Err(bad_args("two numbers", args)),
        },
        _ => Err(bad_args("two numbers", args)),
    }
}

fn math_sqrt(args: &[Value]) -> Result<Value, String> {
    match args {
        [value] => as_number(value)
            .map(|value| Value::Float(value.sqrt()))
            .ok_or_else(|| bad_args("one number", args)),
        _ => Err(bad_args("one number", args)),
    }
}

fn math_pow(args: &[Value]) -> Result<Value, String> {
    match args {
        [Value::Int(base), Value::Int(exp)] if *exp >= 0 => {
            let exp = u32::try_from(*exp).map_err(|_| format!("exponent {exp} is too large"))?;
            Ok(Value::Int(base.wrapping_pow(exp)))
        }
        [base, exp] => match (as_number(base), as_number(exp)) {
            (Some(base), Some(exp)) => Ok(Value::Float(base.powf(exp))),
            _ => Err(bad_args("two numbers", args)),
        },
        _ => Err(bad_args("two numbers", args)),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Int(value) => Some(*value as f64),
        Value::Float(value) => Some(*value),
        _ => None,
    }
}

fn bad_args(expected: &str, args: &[Value]) -> String {
    let found: Vec<&str> = args.iter().map(Value::type_name).collect();
    format!("expected {expected}, got ({})", found.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: &str) -> String {
        value.to_string()
    }

    #[test]
    fn parse_cli_defaults() {
        let cfg = parse_cli_args(&[]).expect("parse should succeed");
        assert!(cfg.repl);
        assert!(cfg.source.is_none());
        assert!(cfg.log_level.is_none());
        assert!(!cfg.help);
    }

    #[test]
    fn parse_cli_source_with_log_level() {
        let cfg = parse_cli_args(&[s("--log-level"), s("tilde=debug"), s("examples/counter.tl")])
            .expect("parse should succeed");
        assert!(!cfg.repl);
        assert_eq!(cfg.log_level.as_deref(), Some("tilde=debug"));
        assert_eq!(cfg.source.as_deref(), Some("examples/counter.tl"));
    }

    #[test]
    fn parse_cli_legacy_repl_command() {
        let cfg = parse_cli_args(&[s("repl")]).expect("parse should succeed");
        assert!(cfg.repl);
        let cfg = parse_cli_args(&[s("--repl"), s("--log-level"), s("debug")])
            .expect("parse should succeed");
        assert!(cfg.repl);
    }

    #[test]
    fn parse_cli_log_level_alone_starts_repl() {
        let cfg = parse_cli_args(&[s("--log-level"), s("trace")]).expect("parse should succeed");
        assert!(cfg.repl);
    }

    #[test]
    fn parse_cli_rejects_bad_input() {
        let err = parse_cli_args(&[s("a.tl"), s("b.tl")]).expect_err("parse should fail");
        assert!(err.contains("multiple source paths"));
        let err = parse_cli_args(&[s("repl"), s("a.tl")]).expect_err("parse should fail");
        assert!(err.contains("does not accept a source path"));
        let err = parse_cli_args(&[s("--log-level")]).expect_err("parse should fail");
        assert_eq!(err, "missing value for --log-level");
        let err = parse_cli_args(&[s("--jit")]).expect_err("parse should fail");
        assert_eq!(err, "unknown flag '--jit'");
    }

    #[test]
    fn parse_cli_help() {
        let cfg = parse_cli_args(&[s("-h")]).expect("parse should succeed");
        assert!(cfg.help);
        assert!(!cfg.repl);
    }

    #[test]
    fn block_openers_keep_reading() {
        assert!(opens_block("while x < 3"));
        assert!(opens_block("function int f(int a)"));
        assert!(opens_block("int x = 1 + \\"));
        assert!(!opens_block("write(x)"));
        assert!(!opens_block("iffy = 2"));
    }

    #[test]
    fn repl_commands() {
        assert_eq!(handle_repl_command(".quit"), Some(ReplAction::Break));
        assert_eq!(handle_repl_command(".nope"), Some(ReplAction::Continue));
        assert_eq!(handle_repl_command("write(1)"), None);
    }

    #[test]
    fn math_module_functions() {
        assert_eq!(math_abs(&[Value::Int(-3)]), Ok(Value::Int(3)));
        assert_eq!(
            math_min(&[Value::Int(2), Value::Float(1.5)]),
            Ok(Value::Float(1.5))
        );
        assert_eq!(math_max(&[Value::Int(2), Value::Int(7)]), Ok(Value::Int(7)));
        assert_eq!(math_sqrt(&[Value::Int(9)]), Ok(Value::Float(3.0)));
        assert_eq!(math_pow(&[Value::Int(2), Value::Int(10)]), Ok(Value::Int(1024)));
        assert_eq!(
            math_pow(&[Value::Int(2), Value::Int(-1)]),
            Ok(Value::Float(0.5))
        );
        assert_eq!(
            math_abs(&[Value::from("x")]),
            Err("expected one number, got (string)".to_string())
        );
    }

    #[test]
    fn math_module_runs_through_interpreter() {
        let mut interpreter =
            Interpreter::with_io(Vec::new(), io::empty()).with_loader(native_modules());
        interpreter
            .run_source("include math as m\nwrite(m.max(3, 4), m.abs(-2.5))")
            .expect("program should run");
        assert_eq!(
            String::from_utf8_lossy(interpreter.output()),
            "4 2.500000 \n"
        );
    }
}
