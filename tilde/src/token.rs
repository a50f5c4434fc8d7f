use crate::value::ScalarType;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Type(ScalarType),
    Int(i64),
    Float(f64),
    String(String),
    True,
    False,
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    EqualEqual,
    BangEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    And,
    Or,
    Not,
    Function,
    If,
    Else,
    While,
    For,
    Return,
    Skip,
    Stop,
    Include,
    LParen,
    RParen,
    Comma,
    Dot,
    Semicolon,
    Newline,
    BlockStart,
    BlockEnd,
    Eof,
}

impl TokenKind {
    pub fn keyword(word: &str) -> Option<Self> {
        let kind = match word {
            "int" => TokenKind::Type(ScalarType::Int),
            "float" => TokenKind::Type(ScalarType::Float),
            "string" => TokenKind::Type(ScalarType::String),
            "bool" => TokenKind::Type(ScalarType::Bool),
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "return" => TokenKind::Return,
            "skip" => TokenKind::Skip,
            "stop" => TokenKind::Stop,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "include" => TokenKind::Include,
            _ => return None,
        };
        Some(kind)
    }

    /// True for the markers the off-side rule synthesizes or that end a line.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            TokenKind::Newline | TokenKind::BlockStart | TokenKind::BlockEnd
        )
    }

    pub fn describe(&self) -> String {
        match self {
            TokenKind::Type(ty) => format!("type '{}'", ty.name()),
            TokenKind::Int(value) => format!("int literal {value}"),
            TokenKind::Float(value) => format!("float literal {value}"),
            TokenKind::String(value) => format!("string literal \"{value}\""),
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::Newline => "newline".to_string(),
            TokenKind::BlockStart => "block start".to_string(),
            TokenKind::BlockEnd => "block end".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Assign => "=",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::StarAssign => "*=",
            TokenKind::SlashAssign => "/=",
            TokenKind::PercentAssign => "%=",
            TokenKind::EqualEqual => "==",
            TokenKind::BangEqual => "!=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::Function => "function",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::For => "for",
            TokenKind::Return => "return",
            TokenKind::Skip => "skip",
            TokenKind::Stop => "stop",
            TokenKind::Include => "include",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Semicolon => ";",
            TokenKind::Type(_)
            | TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::String(_)
            | TokenKind::Ident(_)
            | TokenKind::Newline
            | TokenKind::BlockStart
            | TokenKind::BlockEnd
            | TokenKind::Eof => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize) -> Self {
        Self { kind, line }
    }
}
