use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::{self, BufRead, Stdout, StdinLock, Write};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::{AssignOp, Block, ElseBranch, Expr, FunctionDecl, Program, Stmt, StmtKind};
use crate::error::{Error, ParseError, RuntimeError, RuntimeResult};
use crate::lexer::tokenize;
use crate::module::{ModuleLoader, ModuleRegistry, NativeFunction, NativeModule};
use crate::parser::parse;
use crate::scope::{ScopeId, Scopes};
use crate::value::Value;

mod builtins;
mod ops;

pub use builtins::Builtin;

/// Outcome of executing one statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Flow {
    Normal(Value),
    Return(Value),
    Skip,
    Stop,
}

struct IncludedModule {
    name: String,
    module: Box<dyn NativeModule>,
    functions: HashMap<String, Box<dyn NativeFunction>>,
}

/// Tree-walking evaluator. One interpreter is one session: globals, hoisted
/// functions and included modules persist across calls to [`Interpreter::run`].
pub struct Interpreter<W = Stdout, R = StdinLock<'static>> {
    scopes: Scopes,
    functions: HashMap<String, Rc<FunctionDecl>>,
    modules: HashMap<String, IncludedModule>,
    loader: Box<dyn ModuleLoader>,
    output: W,
    input: R,
    // line of the statement being executed, reported with runtime errors
    line: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_io(io::stdout(), io::stdin().lock())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write, R: BufRead> Interpreter<W, R> {
    pub fn with_io(output: W, input: R) -> Self {
        Self {
            scopes: Scopes::new(),
            functions: HashMap::new(),
            modules: HashMap::new(),
            loader: Box::new(ModuleRegistry::new()),
            output,
            input,
            line: 1,
        }
    }

    pub fn with_loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Current value of a global binding, if it exists and was assigned.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.scopes
            .get(ScopeId::GLOBAL, name)
            .ok()
            .and_then(|binding| binding.value.clone())
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn run_source(&mut self, source: &str) -> Result<(), Error> {
        let tokens = tokenize(source)?;
        let program = parse(tokens)?;
        self.run(program)
    }

    /// Registers the program's functions and executes its body in the global
    /// scope. Nested scopes are dropped when execution fails.
    pub fn run(&mut self, program: Program) -> Result<(), Error> {
        if let Some(decl) = program
            .functions
            .iter()
            .find(|decl| self.functions.contains_key(&decl.name))
        {
            return Err(Error::Parse(ParseError {
                line: decl.line,
                message: format!("function '{}' has already been declared", decl.name),
            }));
        }
        for decl in program.functions {
            self.functions.insert(decl.name.clone(), Rc::new(decl));
        }

        match self.exec_block(&program.body, ScopeId::GLOBAL) {
            Ok(_) => Ok(()),
            Err(error) => {
                self.scopes.unwind();
                Err(Error::Runtime {
                    line: self.line,
                    error,
                })
            }
        }
    }

    fn exec_block(&mut self, block: &Block, scope: ScopeId) -> RuntimeResult<Flow> {
        trace!(
            kind = block.kind.name(),
            statements = block.stmts.len(),
            depth = self.scopes.depth(),
            "enter block"
        );
        for stmt in &block.stmts {
            match self.exec_stmt(stmt, scope)? {
                Flow::Normal(_) => {}
                signal => return Ok(signal),
            }
        }
        Ok(Flow::Normal(Value::Unit))
    }

    /// Runs `block` in a fresh child scope of `scope`.
    fn exec_nested(&mut self, block: &Block, scope: ScopeId) -> RuntimeResult<Flow> {
        let child = self.scopes.push_block(scope);
        let flow = self.exec_block(block, child);
        self.scopes.release(child);
        flow
    }

    fn exec_stmt(&mut self, stmt: &Stmt, scope: ScopeId) -> RuntimeResult<Flow> {
        self.line = stmt.line;
        match &stmt.kind {
            StmtKind::Noop => Ok(Flow::Normal(Value::Unit)),
            StmtKind::Expr(expr) => self.eval(expr, scope).map(Flow::Normal),
            StmtKind::VarDecl { ty, entries } => {
                for entry in entries {
                    if self.scopes.declared_in(scope, &entry.name) {
                        return Err(RuntimeError::Redeclaration(entry.name.clone()));
                    }
                    let value = match &entry.init {
                        Some(init) => {
                            let value = self.eval(init, scope)?;
                            Some(ops::coerce(&entry.name, *ty, value)?)
                        }
                        None => None,
                    };
                    self.scopes.declare(scope, &entry.name, *ty, value)?;
                }
                Ok(Flow::Normal(Value::Unit))
            }
            StmtKind::If {
                condition,
                then_block,
                else_branch,
            } => {
                if self.condition(condition, scope, "if")? {
                    return self.exec_nested(then_block, scope);
                }
                match else_branch {
                    Some(ElseBranch::If(nested)) => self.exec_stmt(nested, scope),
                    Some(ElseBranch::Block(block)) => self.exec_nested(block, scope),
                    None => Ok(Flow::Normal(Value::Unit)),
                }
            }
            StmtKind::While { condition, body } => {
                loop {
                    self.line = stmt.line;
                    if !self.condition(condition, scope, "while")? {
                        break;
                    }
                    match self.exec_nested(body, scope)? {
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Stop => break,
                        Flow::Normal(_) | Flow::Skip => {}
                    }
                }
                Ok(Flow::Normal(Value::Unit))
            }
            StmtKind::For {
                init,
                condition,
                post,
                body,
            } => {
                let for_scope = self.scopes.push_block(scope);
                let flow = self.exec_for(
                    stmt.line,
                    init.as_deref(),
                    condition.as_ref(),
                    post.as_ref(),
                    body,
                    for_scope,
                );
                self.scopes.release(for_scope);
                flow
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Unit,
                };
                Ok(Flow::Return(value))
            }
            StmtKind::Skip => Ok(Flow::Skip),
            StmtKind::Stop => Ok(Flow::Stop),
            StmtKind::Include { module, alias } => {
                self.include(module, alias.as_deref())?;
                Ok(Flow::Normal(Value::Unit))
            }
        }
    }

    fn exec_for(
        &mut self,
        line: usize,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        post: Option<&Expr>,
        body: &Block,
        for_scope: ScopeId,
    ) -> RuntimeResult<Flow> {
        if let Some(init) = init {
            self.exec_stmt(init, for_scope)?;
        }
        loop {
            self.line = line;
            if let Some(condition) = condition
                && !self.condition(condition, for_scope, "for condition body")?
            {
                break;
            }
            match self.exec_nested(body, for_scope)? {
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Stop => break,
                Flow::Normal(_) | Flow::Skip => {}
            }
            if let Some(post) = post {
                self.line = line;
                self.eval(post, for_scope)?;
            }
        }
        Ok(Flow::Normal(Value::Unit))
    }

    fn condition(
        &mut self,
        expr: &Expr,
        scope: ScopeId,
        construct: &'static str,
    ) -> RuntimeResult<bool> {
        match self.eval(expr, scope)? {
            Value::Bool(value) => Ok(value),
            other => Err(RuntimeError::ConditionNotBool {
                construct,
                found: other.type_name(),
            }),
        }
    }

    fn eval(&mut self, expr: &Expr, scope: ScopeId) -> RuntimeResult<Value> {
        match expr {
            Expr::Int(value) => Ok(Value::Int(*value)),
            Expr::Float(value) => Ok(Value::Float(*value)),
            Expr::String(value) => Ok(Value::String(value.clone())),
            Expr::Bool(value) => Ok(Value::Bool(*value)),
            Expr::Var(name) => self.scopes.value(scope, name),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, scope)?;
                ops::unary(*op, value)
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                ops::binary(*op, &left, &right)
            }
            Expr::Assign { name, op, value } => self.assign(scope, name, *op, value),
            Expr::Call { name, args } => self.call(scope, name, args),
            Expr::ModuleCall {
                module,
                function,
                args,
            } => self.call_native(scope, module, function, args),
        }
    }

    fn assign(
        &mut self,
        scope: ScopeId,
        name: &str,
        op: AssignOp,
        value: &Expr,
    ) -> RuntimeResult<Value> {
        // an undeclared target fails before its value expression runs
        self.scopes.get(scope, name)?;
        let value = self.eval(value, scope)?;
        let binding = self.scopes.get_mut(scope, name)?;
        let updated = ops::assign(name, binding.ty, binding.value.as_ref(), op, value)?;
        binding.value = Some(updated.clone());
        Ok(updated)
    }

    fn eval_args(&mut self, args: &[Expr], scope: ScopeId) -> RuntimeResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg, scope)).collect()
    }

    fn call(&mut self, scope: ScopeId, name: &str, args: &[Expr]) -> RuntimeResult<Value> {
        if let Some(builtin) = Builtin::from_name(name) {
            return self.call_builtin(builtin, args, scope);
        }

        let decl = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndeclaredFunction(name.to_string()))?;
        if args.len() != decl.params.len() {
            return Err(RuntimeError::ArityMismatch {
                function: name.to_string(),
                expected: decl.params.len(),
                got: args.len(),
            });
        }

        let call_line = self.line;
        debug!(function = name, args = args.len(), line = call_line, "call function");
        let call_scope = self.scopes.push(None);
        let result = self.invoke(&decl, args, scope, call_scope);
        self.scopes.release(call_scope);
        let value = result?;
        self.line = call_line;

        match (decl.return_type, &value) {
            (None, Value::Unit) => Ok(Value::Unit),
            (Some(ty), value) if value.scalar_type() == Some(ty) => Ok(value.clone()),
            (expected, value) => Err(RuntimeError::ReturnTypeMismatch {
                function: name.to_string(),
                expected,
                found: value.type_name(),
            }),
        }
    }

    /// Binds each argument as soon as it is evaluated in `caller`, then runs
    /// the body in `call_scope`. Scopes opened while evaluating an argument
    /// sit above `call_scope` and are released before the next one.
    fn invoke(
        &mut self,
        decl: &FunctionDecl,
        args: &[Expr],
        caller: ScopeId,
        call_scope: ScopeId,
    ) -> RuntimeResult<Value> {
        for (param, arg) in decl.params.iter().zip(args) {
            let value = self.eval(arg, caller)?;
            let value = ops::coerce(&param.name, param.ty, value)?;
            self.scopes
                .declare(call_scope, &param.name, param.ty, Some(value))?;
        }
        match self.exec_block(&decl.body, call_scope)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal(_) | Flow::Skip | Flow::Stop => Ok(Value::Unit),
        }
    }

    fn include(&mut self, module: &str, alias: Option<&str>) -> RuntimeResult<()> {
        let visible = alias.unwrap_or(module);
        if self.modules.contains_key(visible)
            || self.modules.values().any(|included| included.name == module)
        {
            return Err(RuntimeError::DuplicateInclude(module.to_string()));
        }
        let loaded = self
            .loader
            .load(module)
            .ok_or_else(|| RuntimeError::ModuleNotFound(module.to_string()))?;
        debug!(module, alias = visible, "included module");
        self.modules.insert(
            visible.to_string(),
            IncludedModule {
                name: module.to_string(),
                module: loaded,
                functions: HashMap::new(),
            },
        );
        Ok(())
    }

    fn call_native(
        &mut self,
        scope: ScopeId,
        module: &str,
        function: &str,
        args: &[Expr],
    ) -> RuntimeResult<Value> {
        if !self.modules.contains_key(module) {
            return Err(RuntimeError::UndeclaredModule(module.to_string()));
        }
        let values = self.eval_args(args, scope)?;
        let included = self
            .modules
            .get_mut(module)
            .ok_or_else(|| RuntimeError::UndeclaredModule(module.to_string()))?;

        let callable = match included.functions.entry(function.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let resolved = included.module.resolve(function).ok_or_else(|| {
                    RuntimeError::UnresolvedNativeFunction {
                        module: included.name.clone(),
                        function: function.to_string(),
                    }
                })?;
                debug!(module = %included.name, function, "resolved native function");
                entry.insert(resolved)
            }
        };
        callable
            .call(&values)
            .map_err(|message| RuntimeError::Native {
                module: included.name.clone(),
                function: function.to_string(),
                message,
            })
    }
}
