use std::collections::HashSet;

use tracing::debug;

use crate::ast::{
    AssignOp, BinaryOp, Block, BlockKind, ElseBranch, Expr, FunctionDecl, Param, Program, Stmt,
    StmtKind, UnaryOp, VarEntry,
};
use crate::error::ParseError;
use crate::token::{Token, TokenKind};

pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseError> {
    Parser::new(tokens).parse_program()
}

/// Where a statement sits. `return` needs a function body, `skip`/`stop` need
/// a loop body.
#[derive(Clone, Copy, Debug, Default)]
struct Context {
    top_level: bool,
    in_function: bool,
    in_loop: bool,
}

impl Context {
    fn top_level() -> Self {
        Self {
            top_level: true,
            ..Self::default()
        }
    }

    fn nested(self) -> Self {
        Self {
            top_level: false,
            ..self
        }
    }

    fn looping(self) -> Self {
        Self {
            top_level: false,
            in_loop: true,
            ..self
        }
    }

    fn function_body() -> Self {
        Self {
            top_level: false,
            in_function: true,
            in_loop: false,
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    functions: Vec<FunctionDecl>,
    function_names: HashSet<String>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(token) if token.kind == TokenKind::Eof) {
            let line = tokens.last().map(|token| token.line).unwrap_or(1);
            tokens.push(Token::new(TokenKind::Eof, line));
        }
        Self {
            tokens,
            pos: 0,
            functions: Vec::new(),
            function_names: HashSet::new(),
        }
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let ctx = Context::top_level();
        let mut stmts = Vec::new();
        loop {
            self.push_stmt(&mut stmts, ctx)?;
            if !self.match_kind(&TokenKind::Newline) {
                break;
            }
        }
        if !self.check(&TokenKind::Eof) {
            return Err(self.error(format!(
                "syntax error: encountered {}",
                self.peek_kind().describe()
            )));
        }
        debug!(
            statements = stmts.len(),
            functions = self.functions.len(),
            "parsed program"
        );
        Ok(Program {
            body: Block {
                kind: BlockKind::Plain,
                stmts,
            },
            functions: self.functions,
        })
    }

    fn push_stmt(&mut self, stmts: &mut Vec<Stmt>, ctx: Context) -> Result<(), ParseError> {
        let stmt = self.parse_stmt(ctx)?;
        if stmt.kind != StmtKind::Noop {
            stmts.push(stmt);
        }
        Ok(())
    }

    fn parse_stmt(&mut self, ctx: Context) -> Result<Stmt, ParseError> {
        let line = self.current_line();
        let kind = match self.peek_kind().clone() {
            TokenKind::Type(_) => self.parse_var_decl()?,
            TokenKind::If => self.parse_if(ctx)?,
            TokenKind::While => self.parse_while(ctx)?,
            TokenKind::For => self.parse_for(ctx)?,
            TokenKind::Return => self.parse_return(ctx)?,
            TokenKind::Skip | TokenKind::Stop => self.parse_loop_control(ctx)?,
            TokenKind::Function if ctx.top_level => self.parse_function_decl()?,
            TokenKind::Include if ctx.top_level => self.parse_include()?,
            TokenKind::Eof if ctx.top_level => StmtKind::Noop,
            TokenKind::BlockEnd if !ctx.top_level => StmtKind::Noop,
            kind if starts_expr(&kind) => StmtKind::Expr(self.parse_expr()?),
            other => {
                let place = if ctx.top_level { "" } else { " in block" };
                return Err(self.error(format!(
                    "unexpected token at parse statement{place}: {}",
                    other.describe()
                )));
            }
        };
        Ok(Stmt::new(kind, line))
    }

    /// Parses `NEWLINE BLOCK-START stmt (NEWLINE stmt)* BLOCK-END`.
    fn parse_block(&mut self, kind: BlockKind, ctx: Context) -> Result<Block, ParseError> {
        self.expect(&TokenKind::Newline, "newline")?;
        self.expect(&TokenKind::BlockStart, "block start")?;
        let mut stmts = Vec::new();
        loop {
            self.push_stmt(&mut stmts, ctx)?;
            if !self.match_kind(&TokenKind::Newline) {
                break;
            }
        }
        self.expect(&TokenKind::BlockEnd, "block end")?;
        Ok(Block { kind, stmts })
    }

    fn parse_var_decl(&mut self) -> Result<StmtKind, ParseError> {
        let TokenKind::Type(ty) = self.advance().kind else {
            return Err(self.error("expected a type name"));
        };
        let mut entries = Vec::new();
        loop {
            let name = self.expect_ident()?;
            let init = if self.match_kind(&TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            entries.push(VarEntry { name, init });
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        Ok(StmtKind::VarDecl { ty, entries })
    }

    fn parse_function_decl(&mut self) -> Result<StmtKind, ParseError> {
        let line = self.current_line();
        self.advance();
        let return_type = if let TokenKind::Type(ty) = *self.peek_kind() {
            self.advance();
            Some(ty)
        } else {
            None
        };
        let name = self.expect_ident()?;
        if !self.function_names.insert(name.clone()) {
            return Err(self.error(format!("function '{name}' has already been declared")));
        }

        self.expect(&TokenKind::LParen, "'('")?;
        let mut params: Vec<Param> = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let TokenKind::Type(ty) = *self.peek_kind() else {
                    return Err(
                        self.error("unexpected token at parse function declaration arguments")
                    );
                };
                self.advance();
                let param = self.expect_ident()?;
                if params.iter().any(|existing| existing.name == param) {
                    return Err(self.error(format!("duplicate function parameter '{param}'")));
                }
                params.push(Param { ty, name: param });
                if !self.match_kind(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;

        let body = self.parse_block(BlockKind::Function, Context::function_body())?;
        debug!(function = %name, params = params.len(), line, "hoisted function");
        self.functions.push(FunctionDecl {
            name,
            return_type,
            params,
            body,
            line,
        });
        Ok(StmtKind::Noop)
    }

    fn parse_if(&mut self, ctx: Context) -> Result<StmtKind, ParseError> {
        self.advance();
        let condition = self.parse_expr()?;
        let then_block = self.parse_block(BlockKind::If, ctx.nested())?;

        // the if block closes with BLOCK-END, the else sits after the NEWLINE
        let else_branch = if self.check(&TokenKind::Newline)
            && self.peek_kind_at(1) == &TokenKind::Else
        {
            self.advance();
            self.advance();
            if self.check(&TokenKind::If) {
                let line = self.current_line();
                let nested = self.parse_if(ctx)?;
                Some(ElseBranch::If(Box::new(Stmt::new(nested, line))))
            } else {
                Some(ElseBranch::Block(
                    self.parse_block(BlockKind::If, ctx.nested())?,
                ))
            }
        } else {
            None
        };

        Ok(StmtKind::If {
            condition,
            then_block,
            else_branch,
        })
    }

    fn parse_while(&mut self, ctx: Context) -> Result<StmtKind, ParseError> {
        self.advance();
        let condition = self.parse_expr()?;
        let body = self.parse_block(BlockKind::While, ctx.looping())?;
        Ok(StmtKind::While { condition, body })
    }

    fn parse_for(&mut self, ctx: Context) -> Result<StmtKind, ParseError> {
        self.advance();

        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            let line = self.current_line();
            let kind = if matches!(self.peek_kind(), TokenKind::Type(_)) {
                self.parse_var_decl()?
            } else {
                StmtKind::Expr(self.parse_expr()?)
            };
            Some(Box::new(Stmt::new(kind, line)))
        };
        self.expect(&TokenKind::Semicolon, "';'")?;

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&TokenKind::Semicolon, "';'")?;

        let post = if self.check(&TokenKind::Newline) {
            None
        } else {
            Some(self.parse_expr()?)
        };

        let body = self.parse_block(BlockKind::For, ctx.looping())?;
        Ok(StmtKind::For {
            init,
            condition,
            post,
            body,
        })
    }

    fn parse_return(&mut self, ctx: Context) -> Result<StmtKind, ParseError> {
        if !ctx.in_function {
            return Err(self.error("return not used in function"));
        }
        self.advance();
        let value = match self.peek_kind() {
            TokenKind::Newline | TokenKind::BlockEnd | TokenKind::Eof => None,
            _ => Some(self.parse_expr()?),
        };
        Ok(StmtKind::Return(value))
    }

    fn parse_loop_control(&mut self, ctx: Context) -> Result<StmtKind, ParseError> {
        let kind = if self.check(&TokenKind::Skip) {
            StmtKind::Skip
        } else {
            StmtKind::Stop
        };
        if !ctx.in_loop {
            let word = if kind == StmtKind::Skip { "skip" } else { "stop" };
            return Err(self.error(format!("{word} not used in loop")));
        }
        self.advance();
        Ok(kind)
    }

    fn parse_include(&mut self) -> Result<StmtKind, ParseError> {
        self.advance();
        let module = self.expect_ident()?;
        let alias = if matches!(self.peek_kind(), TokenKind::Ident(word) if word == "as") {
            self.advance();
            Some(self.expect_ident()?)
        } else {
            None
        };
        Ok(StmtKind::Include { module, alias })
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_logical()
    }

    fn parse_logical(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_equality()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::And => BinaryOp::And,
                TokenKind::Or => BinaryOp::Or,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_equality()?;
            expr = binary(op, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_relational()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqualEqual => BinaryOp::Eq,
                TokenKind::BangEqual => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_relational()?;
            expr = binary(op, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEq,
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            expr = binary(op, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            expr = binary(op, expr, rhs);
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            expr = binary(op, expr, rhs);
        }
        Ok(expr)
    }

    // Unary operators bind to a single primary: `- -x` is rejected.
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        self.advance();
        let operand = self.parse_primary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let expr = match self.peek_kind().clone() {
            TokenKind::Int(value) => Expr::Int(value),
            TokenKind::Float(value) => Expr::Float(value),
            TokenKind::String(value) => Expr::String(value),
            TokenKind::True => Expr::Bool(true),
            TokenKind::False => Expr::Bool(false),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen, "')'")?;
                return Ok(inner);
            }
            TokenKind::Ident(name) => {
                self.advance();
                return self.parse_ident_tail(name);
            }
            other => {
                return Err(self.error(format!(
                    "unexpected token at parse primary: {}",
                    other.describe()
                )));
            }
        };
        self.advance();
        Ok(expr)
    }

    /// Decides between call, module call, assignment and plain reference once
    /// an identifier has been consumed.
    fn parse_ident_tail(&mut self, name: String) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::LParen) {
            let args = self.parse_call_args()?;
            return Ok(Expr::Call { name, args });
        }
        if self.match_kind(&TokenKind::Dot) {
            let function = self.expect_ident()?;
            let args = self.parse_call_args()?;
            return Ok(Expr::ModuleCall {
                module: name,
                function,
                args,
            });
        }
        if let Some(op) = assign_op(self.peek_kind()) {
            self.advance();
            let value = self.parse_expr()?;
            return Ok(Expr::Assign {
                name,
                op,
                value: Box::new(value),
            });
        }
        Ok(Expr::Var(name))
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.match_kind(&TokenKind::Comma) {
                    continue;
                }
                break;
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(args)
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<(), ParseError> {
        if self.match_kind(kind) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {expected} instead of {}",
                self.peek_kind().describe()
            )))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Ident(name) = self.peek_kind() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(format!(
                "expected identifier instead of {}",
                self.peek_kind().describe()
            )))
        }
    }

    fn match_kind(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn peek_kind(&self) -> &TokenKind {
        self.peek_kind_at(0)
    }

    fn peek_kind_at(&self, offset: usize) -> &TokenKind {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn current_line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|token| token.line)
            .unwrap_or(1)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.current_line(),
            message: message.into(),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn assign_op(kind: &TokenKind) -> Option<AssignOp> {
    match kind {
        TokenKind::Assign => Some(AssignOp::Assign),
        TokenKind::PlusAssign => Some(AssignOp::Add),
        TokenKind::MinusAssign => Some(AssignOp::Sub),
        TokenKind::StarAssign => Some(AssignOp::Mul),
        TokenKind::SlashAssign => Some(AssignOp::Div),
        TokenKind::PercentAssign => Some(AssignOp::Mod),
        _ => None,
    }
}

fn starts_expr(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::String(_)
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Ident(_)
            | TokenKind::LParen
            | TokenKind::Minus
            | TokenKind::Not
    )
}
