use crate::value::ScalarType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lexer-> Error at line: {}, {}", self.line, self.message)
    }
}

impl std::error::Error for LexError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parser-> Error at line: {}, {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    UndeclaredVariable(String),
    UndefinedVariable(String),
    Redeclaration(String),
    CompoundOnUndefined {
        op: &'static str,
        name: String,
    },
    TypeMismatch {
        name: String,
        expected: ScalarType,
        found: &'static str,
    },
    AssignOnly(ScalarType),
    FloatModulo,
    DivisionByZero,
    InvalidOperator {
        op: &'static str,
        operand: &'static str,
    },
    InvalidOperands {
        left: &'static str,
        right: &'static str,
    },
    InvalidUnary {
        op: &'static str,
        operand: &'static str,
    },
    ConditionNotBool {
        construct: &'static str,
        found: &'static str,
    },
    ArityMismatch {
        function: String,
        expected: usize,
        got: usize,
    },
    BuiltinArity {
        function: &'static str,
        expected: &'static str,
        got: usize,
    },
    InvalidArgument {
        function: &'static str,
        index: usize,
        found: &'static str,
    },
    UnsupportedConversion {
        function: &'static str,
        from: &'static str,
    },
    ReturnTypeMismatch {
        function: String,
        expected: Option<ScalarType>,
        found: &'static str,
    },
    UndeclaredFunction(String),
    UndeclaredModule(String),
    DuplicateInclude(String),
    ModuleNotFound(String),
    UnresolvedNativeFunction {
        module: String,
        function: String,
    },
    Native {
        module: String,
        function: String,
        message: String,
    },
    Io(String),
    Internal(String),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::UndeclaredVariable(name) => {
                write!(f, "use of undeclared variable: '{name}'")
            }
            RuntimeError::UndefinedVariable(name) => {
                write!(f, "use of value of undefined variable: '{name}'")
            }
            RuntimeError::Redeclaration(name) => {
                write!(f, "variable '{name}' has already been declared")
            }
            RuntimeError::CompoundOnUndefined { op, name } => {
                write!(f, "invalid '{op}' operator for undefined '{name}' variable")
            }
            RuntimeError::TypeMismatch {
                name,
                expected,
                found,
            } => write!(f, "variable '{name}' type error: '{expected}', '{found}'"),
            RuntimeError::AssignOnly(ty) => write!(f, "{ty}s can only get = operator"),
            RuntimeError::FloatModulo => {
                write!(f, "'%' operator cannot be applied to floating values")
            }
            RuntimeError::DivisionByZero => write!(f, "division by zero"),
            RuntimeError::InvalidOperator { op, operand } => {
                write!(f, "'{op}' operator cannot be applied to {operand}")
            }
            RuntimeError::InvalidOperands { left, right } => {
                write!(f, "unexpected types in binary: left: {left}, right: {right}")
            }
            RuntimeError::InvalidUnary { op, operand } => {
                write!(f, "'{op}' unary operator cannot be applied to {operand}")
            }
            RuntimeError::ConditionNotBool { construct, found } => {
                write!(f, "{construct} requires bool but got: '{found}'")
            }
            RuntimeError::ArityMismatch {
                function,
                expected,
                got,
            } => write!(
                f,
                "function {function}: expected {expected} arg(s), but got {got}"
            ),
            RuntimeError::BuiltinArity {
                function,
                expected,
                got,
            } => write!(f, "function {function}: {expected}, got {got}"),
            RuntimeError::InvalidArgument {
                function,
                index,
                found,
            } => write!(
                f,
                "unexpected {index} indexed arg at function {function}: '{found}'"
            ),
            RuntimeError::UnsupportedConversion { function, from } => {
                write!(f, "function {function}: conversion from {from} is not supported")
            }
            RuntimeError::ReturnTypeMismatch {
                function,
                expected: Some(expected),
                found,
            } => write!(
                f,
                "'{function}' function return error: expected: {expected}, got: {found}"
            ),
            RuntimeError::ReturnTypeMismatch {
                function,
                expected: None,
                found,
            } => write!(
                f,
                "'{function}' function return error: expected no type, got: {found}"
            ),
            RuntimeError::UndeclaredFunction(name) => {
                write!(f, "call to undeclared function named: '{name}'")
            }
            RuntimeError::UndeclaredModule(name) => write!(f, "undeclared module: '{name}'"),
            RuntimeError::DuplicateInclude(name) => {
                write!(f, "module '{name}' has already been included")
            }
            RuntimeError::ModuleNotFound(name) => {
                write!(f, "module '{name}' could not be loaded")
            }
            RuntimeError::UnresolvedNativeFunction { module, function } => {
                write!(f, "module '{module}' has no function '{function}'")
            }
            RuntimeError::Native {
                module,
                function,
                message,
            } => write!(f, "{module}.{function}: {message}"),
            RuntimeError::Io(message) => write!(f, "i/o error: {message}"),
            RuntimeError::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<std::io::Error> for RuntimeError {
    fn from(value: std::io::Error) -> Self {
        RuntimeError::Io(value.to_string())
    }
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Any failure of the lexer -> parser -> interpreter pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Lex(LexError),
    Parse(ParseError),
    Runtime { line: usize, error: RuntimeError },
}

impl Error {
    pub fn line(&self) -> usize {
        match self {
            Error::Lex(err) => err.line,
            Error::Parse(err) => err.line,
            Error::Runtime { line, .. } => *line,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Lex(err) => write!(f, "{err}"),
            Error::Parse(err) => write!(f, "{err}"),
            Error::Runtime { line, error } => {
                write!(f, "Runtime-> Error at line: {line}, {error}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<LexError> for Error {
    fn from(value: LexError) -> Self {
        Error::Lex(value)
    }
}

impl From<ParseError> for Error {
    fn from(value: ParseError) -> Self {
        Error::Parse(value)
    }
}
