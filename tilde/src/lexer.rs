use tracing::debug;

use crate::error::LexError;
use crate::token::{Token, TokenKind};

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

/// Single-pass tokenizer. Leading tabs are counted per line and turned into
/// block start/end markers when the first real token of the line is pushed.
pub struct Lexer<'a> {
    chars: std::str::Chars<'a>,
    current: Option<char>,
    line: usize,
    tokens: Vec<Token>,
    // set once a non-structural token was pushed on the current line
    line_has_token: bool,
    indent: usize,
    prev_indent: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            chars,
            current,
            line: 1,
            tokens: Vec::with_capacity(source.len() / 4),
            line_has_token: false,
            indent: 0,
            prev_indent: 0,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(ch) = self.current {
            self.lex_char(ch)?;
        }
        self.close_open_blocks();
        self.tokens.push(Token::new(TokenKind::Eof, self.line));
        debug!(tokens = self.tokens.len(), lines = self.line, "tokenized source");
        Ok(self.tokens)
    }

    fn lex_char(&mut self, ch: char) -> Result<(), LexError> {
        match ch {
            '\n' => {
                if self.line_has_token {
                    self.push(TokenKind::Newline);
                } else {
                    self.indent = 0;
                }
                self.advance();
            }
            '\t' => {
                if !self.line_has_token {
                    self.indent += 1;
                }
                self.advance();
            }
            ' ' | '\r' => self.advance(),
            '~' => {
                self.advance();
                if self.current == Some('~') {
                    self.advance();
                    self.skip_block_comment()?;
                } else {
                    self.skip_line_comment();
                }
            }
            '\\' => {
                self.advance();
                self.skip_line_continuation()?;
            }
            '"' => {
                let value = self.consume_string()?;
                self.push(TokenKind::String(value));
            }
            '(' => {
                self.advance();
                self.demote_type_before_call();
                self.push(TokenKind::LParen);
            }
            ')' => self.single(TokenKind::RParen),
            ',' => self.single(TokenKind::Comma),
            '.' => self.single(TokenKind::Dot),
            ';' => self.single(TokenKind::Semicolon),
            '+' => self.with_assign(TokenKind::Plus, TokenKind::PlusAssign),
            '-' => self.with_assign(TokenKind::Minus, TokenKind::MinusAssign),
            '*' => self.with_assign(TokenKind::Star, TokenKind::StarAssign),
            '/' => self.with_assign(TokenKind::Slash, TokenKind::SlashAssign),
            '%' => self.with_assign(TokenKind::Percent, TokenKind::PercentAssign),
            '=' => self.with_assign(TokenKind::Assign, TokenKind::EqualEqual),
            '>' => self.with_assign(TokenKind::Greater, TokenKind::GreaterEqual),
            '<' => self.with_assign(TokenKind::Less, TokenKind::LessEqual),
            '!' => {
                self.advance();
                if self.current != Some('=') {
                    return Err(self.error("expected '=' after '!'"));
                }
                self.advance();
                self.push(TokenKind::BangEqual);
            }
            c if c.is_ascii_digit() => {
                let kind = self.consume_number()?;
                self.push(kind);
            }
            c if is_ident_start(c) => {
                let ident = self.consume_ident();
                let kind = TokenKind::keyword(&ident).unwrap_or(TokenKind::Ident(ident));
                self.push(kind);
            }
            other => {
                return Err(self.error(format!("unrecognized character: '{other}'")));
            }
        }
        Ok(())
    }

    fn advance(&mut self) {
        if self.current == Some('\n') {
            self.line += 1;
        }
        self.current = self.chars.next();
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            line: self.line,
            message: message.into(),
        }
    }

    fn single(&mut self, kind: TokenKind) {
        self.advance();
        self.push(kind);
    }

    /// Emits `compound` when the operator character is followed by `=`.
    fn with_assign(&mut self, plain: TokenKind, compound: TokenKind) {
        self.advance();
        if self.current == Some('=') {
            self.advance();
            self.push(compound);
        } else {
            self.push(plain);
        }
    }

    fn push(&mut self, kind: TokenKind) {
        if !self.line_has_token && !kind.is_structural() {
            if self.indent > self.prev_indent {
                for _ in 0..self.indent - self.prev_indent {
                    self.push_raw(TokenKind::BlockStart);
                }
            } else if self.indent < self.prev_indent {
                for _ in 0..self.prev_indent - self.indent {
                    self.push_raw(TokenKind::BlockEnd);
                    self.push_raw(TokenKind::Newline);
                }
            }
            self.line_has_token = true;
        } else if self.line_has_token && kind == TokenKind::Newline {
            self.line_has_token = false;
            self.prev_indent = self.indent;
            self.indent = 0;
        }
        self.push_raw(kind);
    }

    fn push_raw(&mut self, kind: TokenKind) {
        self.tokens.push(Token::new(kind, self.line));
    }

    fn close_open_blocks(&mut self) {
        let open = if self.line_has_token {
            self.indent
        } else {
            self.prev_indent
        };
        for _ in 0..open {
            self.push_raw(TokenKind::BlockEnd);
            self.push_raw(TokenKind::Newline);
        }
    }

    // `int(x)` calls a function named `int`, so the type keyword turns into a
    // plain identifier once a `(` follows it.
    fn demote_type_before_call(&mut self) {
        if let Some(last) = self.tokens.last_mut()
            && let TokenKind::Type(ty) = last.kind
        {
            last.kind = TokenKind::Ident(ty.name().to_string());
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.current {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        loop {
            match self.current {
                None => return Err(self.error("unclosed comment block (~~)")),
                Some('~') if self.peek() == Some('~') => {
                    self.advance();
                    self.advance();
                    return Ok(());
                }
                Some(_) => self.advance(),
            }
        }
    }

    fn skip_line_continuation(&mut self) -> Result<(), LexError> {
        while let Some(ch) = self.current {
            match ch {
                '\n' => {
                    self.advance();
                    break;
                }
                ' ' | '\t' | '\r' => self.advance(),
                '~' => self.skip_line_comment(),
                _ => return Err(self.error("nothing must come after '\\'")),
            }
        }
        Ok(())
    }

    fn consume_string(&mut self) -> Result<String, LexError> {
        self.advance();
        let mut out = String::new();
        loop {
            match self.current {
                Some('"') => {
                    self.advance();
                    return Ok(out);
                }
                Some('\n') | None => {
                    return Err(self.error(format!("unterminated string '{out}'")));
                }
                Some(ch) => {
                    out.push(ch);
                    self.advance();
                }
            }
        }
    }

    fn consume_number(&mut self) -> Result<TokenKind, LexError> {
        let mut text = self.consume_digits();
        if self.current != Some('.') {
            return text
                .parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| self.error(format!("integer literal '{text}' is out of range")));
        }

        text.push('.');
        self.advance();
        if !matches!(self.current, Some(c) if c.is_ascii_digit()) {
            return Err(self.error("expected digit after '.'"));
        }
        text.push_str(&self.consume_digits());
        text.parse::<f64>()
            .map(TokenKind::Float)
            .map_err(|_| self.error(format!("invalid float literal '{text}'")))
    }

    fn consume_digits(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.current {
            if !ch.is_ascii_digit() {
                break;
            }
            text.push(ch);
            self.advance();
        }
        text
    }

    fn consume_ident(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.current {
            if !is_ident_continue(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }
        text
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
