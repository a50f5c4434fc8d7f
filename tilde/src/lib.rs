pub mod ast;
pub mod diagnostics;
pub mod error;
pub mod interpreter;
pub mod lexer;
#[cfg(feature = "cli")]
pub mod logging;
pub mod module;
pub mod parser;
pub mod scope;
pub mod token;
pub mod value;

pub use ast::{Block, BlockKind, Expr, FunctionDecl, Program, Stmt, StmtKind};
pub use diagnostics::render_error;
pub use error::{Error, LexError, ParseError, RuntimeError, RuntimeResult};
pub use interpreter::{Builtin, Flow, Interpreter};
pub use lexer::{Lexer, tokenize};
pub use module::{ModuleLoader, ModuleRegistry, NativeFunction, NativeModule, StaticNativeFunction};
pub use parser::{Parser, parse};
pub use scope::{Binding, ScopeId, ScopeLink, Scopes};
pub use token::{Token, TokenKind};
pub use value::{ScalarType, Value};

/// Tokenizes, parses and runs `source` on stdin/stdout with no native modules.
pub fn run_source(source: &str) -> Result<(), Error> {
    Interpreter::new().run_source(source)
}
